use std::{fs, path::Path};

use serde::Deserialize;

use crate::{
    error::{Error, Result},
    model::CourseIdentifier,
};

#[derive(Deserialize)]
struct CourseRecord {
    #[serde(rename = "__catalogCourseId")]
    catalog_id: String,
    #[serde(rename = "subjectCode")]
    subject_code: SubjectCode,
    #[serde(default)]
    title: String,
    #[serde(default)]
    pid: Option<String>,
}

#[derive(Deserialize)]
struct SubjectCode {
    name: String,
}

impl TryFrom<CourseRecord> for CourseIdentifier {
    type Error = String;

    fn try_from(record: CourseRecord) -> std::result::Result<Self, String> {
        let subject = record.subject_code.name.trim().to_uppercase();
        let catalog_id = record.catalog_id.trim();

        let number = match catalog_id.strip_prefix(subject.as_str()) {
            Some(number) if !number.is_empty() => number,
            _ => catalog_id
                .find(|c: char| c.is_ascii_digit())
                .map(|start| &catalog_id[start..])
                .ok_or_else(|| {
                    format!("catalog id {catalog_id:?} has no course number for subject {subject}")
                })?,
        };

        Ok(CourseIdentifier {
            number: number.trim().to_owned(),
            subject,
            title: record.title,
            pid: record.pid.filter(|pid| !pid.is_empty()),
        })
    }
}

/// Parse a course list in the catalog's JSON export format.
pub fn parse_courses(contents: &str) -> Result<Vec<CourseIdentifier>> {
    let records: Vec<CourseRecord> =
        serde_json::from_str(contents).map_err(Error::parse("course list"))?;

    records
        .into_iter()
        .map(|record| CourseIdentifier::try_from(record).map_err(Error::Input))
        .collect()
}

pub fn load_courses(path: &Path) -> Result<Vec<CourseIdentifier>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| Error::Input(format!("cannot read {}: {e}", path.display())))?;

    parse_courses(&contents)
        .map_err(|e| Error::Input(format!("{} is not a valid course list: {e}", path.display())))
}

pub fn find_course<'a>(
    courses: &'a [CourseIdentifier],
    subject: &str,
    number: &str,
) -> Option<&'a CourseIdentifier> {
    courses
        .iter()
        .find(|course| course.subject.eq_ignore_ascii_case(subject) && course.number == number)
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    const COURSES: &str = r#"[
        {"__catalogCourseId": "CSC110", "subjectCode": {"name": "CSC", "id": "x"}, "title": "Fundamentals I", "pid": "ByxA8Ta2V"},
        {"__catalogCourseId": "MATH100", "subjectCode": {"name": "MATH"}, "title": "Calculus I"}
    ]"#;

    #[test]
    fn course_number_is_catalog_id_without_subject() {
        let courses = parse_courses(COURSES).unwrap();

        assert_eq!(courses.len(), 2);
        assert_eq!(courses[0].subject, "CSC");
        assert_eq!(courses[0].number, "110");
        assert_eq!(courses[0].pid.as_deref(), Some("ByxA8Ta2V"));
        assert_eq!(courses[1].number, "100");
        assert_eq!(courses[1].pid, None);
    }

    #[test]
    fn mismatched_prefix_falls_back_to_first_digit() {
        let courses = parse_courses(
            r#"[{"__catalogCourseId": "ENGR 141", "subjectCode": {"name": "ENGL"}, "title": ""}]"#,
        )
        .unwrap();

        assert_eq!(courses[0].number, "141");
    }

    #[test]
    fn catalog_id_without_number_is_rejected() {
        let err = parse_courses(
            r#"[{"__catalogCourseId": "CSC", "subjectCode": {"name": "CSC"}, "title": ""}]"#,
        )
        .unwrap_err();

        assert!(matches!(err, Error::Input(_)));
    }

    #[test]
    fn find_ignores_subject_case() {
        let courses = parse_courses(COURSES).unwrap();

        assert_eq!(find_course(&courses, "math", "100").unwrap().title, "Calculus I");
        assert!(find_course(&courses, "MATH", "101").is_none());
    }

    #[test]
    fn load_reports_path_of_malformed_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{ not json").unwrap();

        let err = load_courses(file.path()).unwrap_err();

        assert!(matches!(err, Error::Input(_)));
        assert!(err.to_string().contains(&file.path().display().to_string()));
    }

    #[test]
    fn load_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_courses(&dir.path().join("courses.json")).unwrap_err();

        assert!(err.to_string().starts_with("cannot read"));
    }
}
