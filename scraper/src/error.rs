use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("{url} returned {status}")]
    Status {
        url: String,
        status: reqwest::StatusCode,
    },

    #[error("could not decode {what}: {source}")]
    Parse {
        what: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("{0} returned no results")]
    EmptyResult(String),

    #[error("{0}")]
    Input(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl Error {
    pub(crate) fn parse(what: &'static str) -> impl FnOnce(serde_json::Error) -> Self {
        move |source| Self::Parse { what, source }
    }
}

/// A failure tied to the course (and section, if any) it happened on.
#[derive(Debug, Error)]
#[error("{subject} {number}{}: {error}", crn_suffix(.crn))]
pub struct CourseError {
    pub subject: String,
    pub number: String,
    pub crn: Option<String>,
    #[source]
    pub error: Error,
}

fn crn_suffix(crn: &Option<String>) -> String {
    crn.as_ref()
        .map(|crn| format!(" (CRN {crn})"))
        .unwrap_or_default()
}
