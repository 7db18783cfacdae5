use std::{fmt, io};

use itertools::Itertools;

use crate::{
    catalog::CatalogInfo,
    error::Result,
    model::{CourseIdentifier, ExportRow, MeetingOccurrence, SectionDetail},
};

/// Section labels starting with this letter are lectures.
const LECTURE_PREFIX: char = 'A';

/// Write rows as CSV with a header line.
pub fn write_csv<W: io::Write>(rows: &[ExportRow], writer: W) -> Result<()> {
    let mut writer = csv::Writer::from_writer(writer);
    if rows.is_empty() {
        writer.write_record(HEADER)?;
    }
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

const HEADER: [&str; 20] = [
    "Subject",
    "CourseNumber",
    "Title",
    "Term",
    "CRN",
    "Section",
    "ScheduleType",
    "InstructionalMethod",
    "Days",
    "Time",
    "StartDate",
    "EndDate",
    "Location",
    "Instructor",
    "Enrolled",
    "Capacity",
    "WaitCount",
    "WaitCapacity",
    "Open",
    "Available",
];

/// Stable order for files meant to be diffed between runs.
pub fn sort_rows(rows: &mut [ExportRow]) {
    rows.sort_by(|a, b| {
        (&a.subject, &a.course_number, &a.section, &a.crn, &a.days, &a.time).cmp(&(
            &b.subject,
            &b.course_number,
            &b.section,
            &b.crn,
            &b.days,
            &b.time,
        ))
    });
}

/// Human-readable report of one course's sections.
pub struct CourseReport<'a> {
    pub course: &'a CourseIdentifier,
    pub term: &'a str,
    pub sections: &'a [SectionDetail],
    pub catalog: Option<&'a CatalogInfo>,
}

impl fmt::Display for CourseReport<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = if self.course.title.is_empty() {
            self.sections
                .first()
                .map(|detail| detail.section.course_title.as_str())
                .unwrap_or_default()
        } else {
            self.course.title.as_str()
        };
        if title.is_empty() {
            writeln!(f, "{}", self.course)?;
        } else {
            writeln!(f, "{} - {}", self.course, title)?;
        }

        if let Some(catalog) = self.catalog {
            write_catalog(f, catalog)?;
        }

        if self.sections.is_empty() {
            return writeln!(f, "\nNo sections offered in {}.", self.term);
        }

        let (lectures, others): (Vec<&SectionDetail>, Vec<&SectionDetail>) = self
            .sections
            .iter()
            .partition(|detail| detail.section.label.starts_with(LECTURE_PREFIX));

        for (heading, group) in [("Lectures", lectures), ("Labs & Tutorials", others)] {
            if group.is_empty() {
                continue;
            }
            writeln!(f, "\n{heading}")?;
            for detail in group {
                write_section(f, detail)?;
            }
        }
        Ok(())
    }
}

fn write_catalog(f: &mut fmt::Formatter<'_>, catalog: &CatalogInfo) -> fmt::Result {
    let credits = catalog.credits.display();
    if !credits.is_empty() {
        writeln!(f, "Credits: {credits}")?;
    }
    for (label, text) in [
        ("Description", catalog.description_text()),
        ("Prerequisites", catalog.prerequisites_text()),
        ("Notes", catalog.notes_text()),
    ] {
        if !text.is_empty() {
            writeln!(f, "\n{label}:\n{text}")?;
        }
    }
    Ok(())
}

fn write_section(f: &mut fmt::Formatter<'_>, detail: &SectionDetail) -> fmt::Result {
    let section = &detail.section;

    write!(f, "  {} (CRN {})", section.label, section.crn)?;
    if !section.schedule_type.is_empty() {
        write!(f, " - {}", section.schedule_type)?;
    }
    if !section.open {
        write!(f, " [closed]")?;
    }
    writeln!(f)?;

    for meeting in &detail.meetings {
        write_meeting(f, meeting)?;
    }

    write!(f, "    Enrollment: {}/{}", section.enrollment, section.capacity)?;
    if section.wait_count > 0 {
        write!(f, " (waitlist {}/{})", section.wait_count, section.wait_capacity)?;
    }
    writeln!(f)?;

    let dates = detail
        .meetings
        .iter()
        .filter_map(|meeting| meeting.start_date.zip(meeting.end_date))
        .map(|(start, end)| format!("{} - {}", start.format("%b %d, %Y"), end.format("%b %d, %Y")))
        .unique()
        .join(", ");
    if !dates.is_empty() {
        writeln!(f, "    Dates: {dates}")?;
    }
    Ok(())
}

fn write_meeting(f: &mut fmt::Formatter<'_>, meeting: &MeetingOccurrence) -> fmt::Result {
    let schedule = format!("{} {}", meeting.days, meeting.time_range());
    let schedule = schedule.trim();
    if !schedule.is_empty() {
        writeln!(f, "    Schedule: {schedule}")?;
    }

    let location = meeting.location();
    if !location.is_empty() {
        writeln!(f, "    Location: {location}")?;
    }

    let instructors = meeting
        .instructors
        .iter()
        .sorted_by_key(|instructor| !instructor.primary)
        .map(|instructor| match &instructor.email {
            Some(email) => format!("{} ({email})", instructor.name),
            None => instructor.name.clone(),
        })
        .join("; ");
    if !instructors.is_empty() {
        writeln!(f, "    Instructor: {instructors}")?;
    }
    Ok(())
}
