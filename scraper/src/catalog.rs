use std::time::Duration;

use log::debug;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use crate::{
    error::{Error, Result},
    html::html_to_text,
    model::nullable,
    settings::Settings,
};

/// Descriptive catalog entry of a course. Text fields hold the catalog's HTML.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CatalogInfo {
    #[serde(deserialize_with = "nullable")]
    pub pid: String,
    #[serde(deserialize_with = "nullable")]
    pub title: String,
    #[serde(rename = "__catalogCourseId", deserialize_with = "nullable")]
    pub catalog_course_id: String,
    #[serde(deserialize_with = "nullable")]
    pub description: String,
    #[serde(rename = "preAndCorequisites", deserialize_with = "nullable")]
    pub prerequisites: String,
    #[serde(deserialize_with = "nullable")]
    pub supplemental_notes: String,
    #[serde(deserialize_with = "nullable")]
    pub hours_catalog_text: String,
    #[serde(deserialize_with = "nullable")]
    pub credits: Credits,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Credits {
    #[serde(deserialize_with = "nullable")]
    pub credits: CreditRange,
    #[serde(deserialize_with = "nullable")]
    pub value: String,
    #[serde(deserialize_with = "nullable")]
    pub chosen: String,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct CreditRange {
    #[serde(deserialize_with = "nullable")]
    pub min: String,
    #[serde(deserialize_with = "nullable")]
    pub max: String,
}

impl Credits {
    /// `1.5`, or `1.5-3` for variable-credit courses.
    pub fn display(&self) -> String {
        let range = &self.credits;
        if self.chosen == "range" && !range.min.is_empty() && !range.max.is_empty() {
            format!("{}-{}", range.min, range.max)
        } else if !self.value.is_empty() {
            self.value.clone()
        } else {
            range.min.clone()
        }
    }
}

impl CatalogInfo {
    pub fn description_text(&self) -> String {
        html_to_text(&self.description)
    }

    pub fn prerequisites_text(&self) -> String {
        html_to_text(&self.prerequisites)
    }

    pub fn notes_text(&self) -> String {
        html_to_text(&self.supplemental_notes)
    }
}

/// Decode a catalog response, which is either the entry itself or an array
/// wrapping it.
pub fn parse_catalog_info(contents: &str) -> Result<CatalogInfo> {
    let value: Value = serde_json::from_str(contents).map_err(Error::parse("catalog entry"))?;

    let entry = match value {
        Value::Array(entries) => entries
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmptyResult("catalog lookup".to_owned()))?,
        entry => entry,
    };

    serde_json::from_value(entry).map_err(Error::parse("catalog entry"))
}

pub struct Catalog {
    client: Client,
    base_url: String,
}

impl Catalog {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
        })
    }

    pub fn from_settings(settings: &Settings) -> Result<Self> {
        Self::new(settings.catalog_url.as_str(), settings.request_timeout())
    }

    pub async fn fetch(&self, pid: &str) -> Result<CatalogInfo> {
        let url = format!("{}/{}", self.base_url, pid);
        let response = self.client.get(&url).send().await?;
        debug!("{} -> {}", url, response.status());

        match response.status() {
            StatusCode::NOT_FOUND => return Err(Error::NotFound(format!("catalog entry {pid}"))),
            status if !status.is_success() => return Err(Error::Status { url, status }),
            _ => {}
        }

        parse_catalog_info(&response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ENTRY: &str = r#"{
        "pid": "ByxA8Ta2V",
        "title": "Fundamentals of Programming I",
        "__catalogCourseId": "CSC110",
        "description": "<p>Introduction to programming.</p>",
        "preAndCorequisites": "<ul><li>MATH 100</li></ul>",
        "supplementalNotes": null,
        "credits": {"credits": {"min": "1.5", "max": "1.5"}, "value": "1.5", "chosen": "fixed"}
    }"#;

    #[test]
    fn single_object_is_the_entry() {
        let info = parse_catalog_info(ENTRY).unwrap();

        assert_eq!(info.catalog_course_id, "CSC110");
        assert_eq!(info.description_text(), "Introduction to programming.");
        assert_eq!(info.prerequisites_text(), "• MATH 100");
        assert_eq!(info.supplemental_notes, "");
        assert_eq!(info.credits.display(), "1.5");
    }

    #[test]
    fn array_yields_first_element() {
        let info = parse_catalog_info(&format!("[{ENTRY}, {{\"pid\": \"other\"}}]")).unwrap();

        assert_eq!(info.pid, "ByxA8Ta2V");
    }

    #[test]
    fn empty_array_is_empty_result() {
        assert!(matches!(
            parse_catalog_info("[]"),
            Err(Error::EmptyResult(_))
        ));
    }

    #[test]
    fn garbage_is_parse_error() {
        assert!(matches!(
            parse_catalog_info("<html>maintenance</html>"),
            Err(Error::Parse { .. })
        ));
        assert!(matches!(
            parse_catalog_info("\"just a string\""),
            Err(Error::Parse { .. })
        ));
    }

    #[test]
    fn variable_credits_render_as_range() {
        let credits = Credits {
            credits: CreditRange {
                min: "1.5".into(),
                max: "3".into(),
            },
            value: String::new(),
            chosen: "range".into(),
        };

        assert_eq!(credits.display(), "1.5-3");
    }
}
