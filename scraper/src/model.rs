use std::fmt;

use chrono::{NaiveDate, NaiveTime, Weekday};
use itertools::Itertools;
use serde::{Deserialize, Deserializer, Serialize};

/// A course as listed in the catalog, before any term is involved.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct CourseIdentifier {
    pub subject: String,
    pub number: String,
    pub title: String,
    /// Catalog entry id, when the course list provides one.
    pub pid: Option<String>,
}

impl CourseIdentifier {
    pub fn new(subject: impl Into<String>, number: impl Into<String>) -> Self {
        Self {
            subject: subject.into().to_uppercase(),
            number: number.into(),
            title: String::new(),
            pid: None,
        }
    }
}

impl fmt::Display for CourseIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.subject, self.number)
    }
}

/// One offering of a course in a term, as returned by the section search.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSection {
    #[serde(rename = "courseReferenceNumber", deserialize_with = "nullable")]
    pub crn: String,
    #[serde(rename = "sequenceNumber", default, deserialize_with = "nullable")]
    pub label: String,
    #[serde(default, deserialize_with = "nullable")]
    pub term: String,
    #[serde(default, deserialize_with = "nullable")]
    pub subject: String,
    #[serde(default, deserialize_with = "nullable")]
    pub course_number: String,
    #[serde(default, deserialize_with = "nullable")]
    pub course_title: String,
    #[serde(rename = "scheduleTypeDescription", default, deserialize_with = "nullable")]
    pub schedule_type: String,
    #[serde(
        rename = "instructionalMethodDescription",
        default,
        deserialize_with = "nullable"
    )]
    pub instructional_method: String,
    #[serde(rename = "maximumEnrollment", default, deserialize_with = "nullable")]
    pub capacity: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub enrollment: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub seats_available: i32,
    #[serde(default, deserialize_with = "nullable")]
    pub wait_capacity: u32,
    #[serde(default, deserialize_with = "nullable")]
    pub wait_count: u32,
    #[serde(rename = "openSection", default, deserialize_with = "nullable")]
    pub open: bool,
    #[serde(default)]
    pub credit_hours: Option<f64>,
}

/// The registration system sends `null` for absent values as often as it omits them.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Set of weekdays a meeting occurs on.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Days(u8);

impl Days {
    const WEEK: [Weekday; 7] = [
        Weekday::Mon,
        Weekday::Tue,
        Weekday::Wed,
        Weekday::Thu,
        Weekday::Fri,
        Weekday::Sat,
        Weekday::Sun,
    ];

    pub fn insert(&mut self, day: Weekday) {
        self.0 |= 1 << day.num_days_from_monday();
    }

    pub fn contains(self, day: Weekday) -> bool {
        self.0 & (1 << day.num_days_from_monday()) != 0
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Weekday> {
        Self::WEEK.into_iter().filter(move |&day| self.contains(day))
    }
}

impl FromIterator<Weekday> for Days {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        let mut days = Days::default();
        for day in iter {
            days.insert(day);
        }
        days
    }
}

// registrar convention: R is Thursday, U is Sunday
impl fmt::Display for Days {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for day in self.iter() {
            let letter = match day {
                Weekday::Mon => 'M',
                Weekday::Tue => 'T',
                Weekday::Wed => 'W',
                Weekday::Thu => 'R',
                Weekday::Fri => 'F',
                Weekday::Sat => 'S',
                Weekday::Sun => 'U',
            };
            write!(f, "{letter}")?;
        }
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct InstructorAssignment {
    pub name: String,
    pub email: Option<String>,
    pub primary: bool,
}

/// A scheduled meeting pattern of a section.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MeetingOccurrence {
    pub days: Days,
    pub begin: Option<NaiveTime>,
    pub end: Option<NaiveTime>,
    pub building: String,
    pub building_description: String,
    pub room: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub meeting_type: String,
    pub meeting_type_description: String,
    pub instructors: Vec<InstructorAssignment>,
}

impl MeetingOccurrence {
    /// `HH:MM-HH:MM`, or empty when the meeting has no fixed time.
    pub fn time_range(&self) -> String {
        match (self.begin, self.end) {
            (Some(begin), Some(end)) => {
                format!("{}-{}", begin.format("%H:%M"), end.format("%H:%M"))
            }
            _ => String::new(),
        }
    }

    pub fn location(&self) -> String {
        format!("{} {}", self.building, self.room).trim().to_owned()
    }

    /// Instructor names, primary instructors first.
    pub fn instructor_names(&self) -> String {
        self.instructors
            .iter()
            .sorted_by_key(|instructor| !instructor.primary)
            .map(|instructor| instructor.name.as_str())
            .join("; ")
    }
}

/// A section together with its meeting times.
#[derive(Clone, Debug)]
pub struct SectionDetail {
    pub section: CourseSection,
    pub meetings: Vec<MeetingOccurrence>,
}

/// One flattened (course, section, meeting) record of the export.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ExportRow {
    pub subject: String,
    pub course_number: String,
    pub title: String,
    pub term: String,
    #[serde(rename = "CRN")]
    pub crn: String,
    pub section: String,
    pub schedule_type: String,
    pub instructional_method: String,
    pub days: String,
    pub time: String,
    pub start_date: String,
    pub end_date: String,
    pub location: String,
    pub instructor: String,
    pub enrolled: Option<u32>,
    pub capacity: Option<u32>,
    pub wait_count: Option<u32>,
    pub wait_capacity: Option<u32>,
    pub open: Option<bool>,
    pub available: bool,
}

impl ExportRow {
    /// Placeholder row for a course with nothing offered (or nothing fetched) this term.
    pub fn unavailable(course: &CourseIdentifier, term: &str) -> Self {
        Self {
            subject: course.subject.clone(),
            course_number: course.number.clone(),
            title: course.title.clone(),
            term: term.to_owned(),
            crn: String::new(),
            section: String::new(),
            schedule_type: String::new(),
            instructional_method: String::new(),
            days: String::new(),
            time: String::new(),
            start_date: String::new(),
            end_date: String::new(),
            location: String::new(),
            instructor: String::new(),
            enrolled: None,
            capacity: None,
            wait_count: None,
            wait_capacity: None,
            open: None,
            available: false,
        }
    }

    pub fn scheduled(
        course: &CourseIdentifier,
        section: &CourseSection,
        meeting: Option<&MeetingOccurrence>,
    ) -> Self {
        let title = if course.title.is_empty() {
            section.course_title.clone()
        } else {
            course.title.clone()
        };
        let date = |date: Option<NaiveDate>| {
            date.map(|date| date.format("%Y-%m-%d").to_string())
                .unwrap_or_default()
        };

        Self {
            subject: course.subject.clone(),
            course_number: course.number.clone(),
            title,
            term: section.term.clone(),
            crn: section.crn.clone(),
            section: section.label.clone(),
            schedule_type: section.schedule_type.clone(),
            instructional_method: section.instructional_method.clone(),
            days: meeting.map(|m| m.days.to_string()).unwrap_or_default(),
            time: meeting.map(MeetingOccurrence::time_range).unwrap_or_default(),
            start_date: date(meeting.and_then(|m| m.start_date)),
            end_date: date(meeting.and_then(|m| m.end_date)),
            location: meeting.map(MeetingOccurrence::location).unwrap_or_default(),
            instructor: meeting
                .map(MeetingOccurrence::instructor_names)
                .unwrap_or_default(),
            enrolled: Some(section.enrollment),
            capacity: Some(section.capacity),
            wait_count: Some(section.wait_count),
            wait_capacity: Some(section.wait_capacity),
            open: Some(section.open),
            available: true,
        }
    }

    /// One row per meeting, or a single schedule-less row if the section has none.
    pub fn from_detail(course: &CourseIdentifier, detail: &SectionDetail) -> Vec<Self> {
        if detail.meetings.is_empty() {
            return vec![Self::scheduled(course, &detail.section, None)];
        }
        detail
            .meetings
            .iter()
            .map(|meeting| Self::scheduled(course, &detail.section, Some(meeting)))
            .collect()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn section(crn: &str, label: &str) -> CourseSection {
        serde_json::from_value(serde_json::json!({
            "courseReferenceNumber": crn,
            "sequenceNumber": label,
            "term": "202501",
            "subject": "CSC",
            "courseNumber": "110",
            "courseTitle": "Fundamentals of Programming I",
            "scheduleTypeDescription": "Lecture",
            "instructionalMethodDescription": "In Person",
            "maximumEnrollment": 60,
            "enrollment": 45,
            "seatsAvailable": 15,
            "waitCapacity": 10,
            "waitCount": 0,
            "openSection": true,
        }))
        .unwrap()
    }

    pub(crate) fn mwf_meeting() -> MeetingOccurrence {
        MeetingOccurrence {
            days: [Weekday::Mon, Weekday::Wed, Weekday::Fri].into_iter().collect(),
            begin: NaiveTime::from_hms_opt(13, 30, 0),
            end: NaiveTime::from_hms_opt(14, 20, 0),
            building: "ECS".into(),
            building_description: "Engineering & Computer Science Building".into(),
            room: "123".into(),
            start_date: NaiveDate::from_ymd_opt(2025, 1, 6),
            end_date: NaiveDate::from_ymd_opt(2025, 4, 4),
            meeting_type: "CLAS".into(),
            meeting_type_description: "Class".into(),
            instructors: vec![
                InstructorAssignment {
                    name: "Lee, Sam".into(),
                    email: None,
                    primary: false,
                },
                InstructorAssignment {
                    name: "Doe, Jane".into(),
                    email: Some("jdoe@example.edu".into()),
                    primary: true,
                },
            ],
        }
    }

    #[test]
    fn days_render_in_week_order() {
        let days: Days = [Weekday::Fri, Weekday::Thu, Weekday::Mon].into_iter().collect();
        assert_eq!(days.to_string(), "MRF");
        assert!(Days::default().is_empty());
        assert_eq!(Days::default().to_string(), "");
    }

    #[test]
    fn weekend_days_have_their_own_letters() {
        let days: Days = [Weekday::Sat, Weekday::Sun].into_iter().collect();
        assert_eq!(days.to_string(), "SU");
    }

    #[test]
    fn meeting_fields_flatten_into_row() {
        let course = CourseIdentifier {
            title: "Fundamentals I".into(),
            ..CourseIdentifier::new("CSC", "110")
        };
        let row = ExportRow::scheduled(&course, &section("12345", "A01"), Some(&mwf_meeting()));

        assert_eq!(row.days, "MWF");
        assert_eq!(row.time, "13:30-14:20");
        assert_eq!(row.location, "ECS 123");
        assert_eq!(row.instructor, "Doe, Jane; Lee, Sam");
        assert_eq!(row.start_date, "2025-01-06");
        assert_eq!(row.title, "Fundamentals I");
        assert_eq!(row.enrolled, Some(45));
        assert!(row.available);
    }

    #[test]
    fn section_without_meetings_still_yields_a_row() {
        let course = CourseIdentifier::new("CSC", "110");
        let detail = SectionDetail {
            section: section("12345", "A01"),
            meetings: Vec::new(),
        };
        let rows = ExportRow::from_detail(&course, &detail);

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].crn, "12345");
        assert_eq!(rows[0].time, "");
        assert_eq!(rows[0].title, "Fundamentals of Programming I");
        assert!(rows[0].available);
    }

    #[test]
    fn null_fields_in_section_default() {
        let section: CourseSection = serde_json::from_value(serde_json::json!({
            "courseReferenceNumber": "20001",
            "sequenceNumber": null,
            "term": "202501",
            "instructionalMethodDescription": null,
            "waitCount": null,
        }))
        .unwrap();

        assert_eq!(section.label, "");
        assert_eq!(section.instructional_method, "");
        assert_eq!(section.wait_count, 0);
        assert!(!section.open);
    }
}
