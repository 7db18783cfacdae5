use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime, Weekday};
use log::{debug, warn};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CACHE_CONTROL},
    Client, RequestBuilder,
};
use serde::{de::DeserializeOwned, Deserialize};

use crate::{
    error::{Error, Result},
    model::{nullable, CourseSection, Days, InstructorAssignment, MeetingOccurrence},
    settings::{PrimePolicy, Settings},
};

const USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
                          (KHTML, like Gecko) Chrome/132.0.0.0 Safari/537.36";

/// Section search and meeting-time lookups against a primed session.
#[async_trait]
pub trait FetchSession: Send + Sync {
    async fn search(&self, subject: &str, number: &str) -> Result<Vec<CourseSection>>;

    async fn meeting_times(&self, crn: &str) -> Result<Vec<MeetingOccurrence>>;
}

/// Opens independent sessions, each with its own cookie state.
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self, term: &str) -> Result<Box<dyn FetchSession>>;
}

/// Connection settings for the registration backend.
#[derive(Clone, Debug)]
pub struct Banner {
    base_url: String,
    prime_policy: PrimePolicy,
    timeout: Duration,
    page_size: u32,
}

impl Banner {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            prime_policy: PrimePolicy::Strict,
            timeout: Duration::from_secs(30),
            page_size: 50,
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        Self::new(settings.banner_url.as_str())
            .prime_policy(settings.prime_policy)
            .timeout(settings.request_timeout())
            .page_size(settings.page_size)
    }

    pub fn prime_policy(mut self, prime_policy: PrimePolicy) -> Self {
        self.prime_policy = prime_policy;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }
}

#[async_trait]
impl SessionFactory for Banner {
    async fn open(&self, term: &str) -> Result<Box<dyn FetchSession>> {
        Ok(Box::new(BannerSession::new(self, term).await?))
    }
}

// the backend only answers queries for a term that was selected earlier
// in the same cookie session, so priming happens in the constructor and
// a BannerSession value always stands for a primed session

pub struct BannerSession {
    client: Client,
    base_url: String,
    term: String,
    page_size: u32,
}

impl BannerSession {
    pub async fn new(banner: &Banner, term: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));
        headers.insert(CACHE_CONTROL, HeaderValue::from_static("max-age=0"));

        let client = Client::builder()
            .cookie_store(true)
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .timeout(banner.timeout)
            .build()?;

        let session = Self {
            client,
            base_url: banner.base_url.clone(),
            term: term.to_owned(),
            page_size: banner.page_size,
        };

        let steps = [
            session
                .client
                .get(session.url("/term/termSelection"))
                .query(&[("mode", "search")]),
            session
                .client
                .post(session.url("/term/search"))
                .query(&[("mode", "search")])
                .header("X-Requested-With", "XMLHttpRequest")
                .form(&[
                    ("term", term),
                    ("studyPath", ""),
                    ("studyPathText", ""),
                    ("startDatepicker", ""),
                    ("endDatepicker", ""),
                ]),
        ];

        for step in steps {
            match session.send(step).await {
                Ok(_) => {}
                Err(e) if banner.prime_policy == PrimePolicy::Lenient => {
                    warn!("priming term {term} failed, continuing: {e}");
                }
                Err(e) => return Err(e),
            }
        }

        Ok(session)
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn send(&self, request: RequestBuilder) -> Result<reqwest::Response> {
        let response = request.send().await?;
        debug!("{} -> {}", response.url(), response.status());

        if !response.status().is_success() {
            return Err(Error::Status {
                url: response.url().to_string(),
                status: response.status(),
            });
        }

        Ok(response)
    }

    async fn fetch_json<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        what: &'static str,
    ) -> Result<T> {
        let contents = self.send(request).await?.text().await?;
        serde_json::from_str(&contents).map_err(Error::parse(what))
    }
}

#[async_trait]
impl FetchSession for BannerSession {
    async fn search(&self, subject: &str, number: &str) -> Result<Vec<CourseSection>> {
        let page_size = self.page_size.to_string();
        let request = self
            .client
            .get(self.url("/searchResults/searchResults"))
            .query(&[
                ("txt_term", self.term.as_str()),
                ("txt_subject", subject),
                ("txt_courseNumber", number),
                ("pageOffset", "0"),
                ("pageMaxSize", page_size.as_str()),
                ("sortColumn", "subjectDescription"),
                ("sortDirection", "asc"),
            ]);

        let results: SearchResults = self.fetch_json(request, "section search").await?;
        Ok(results.data.unwrap_or_default())
    }

    async fn meeting_times(&self, crn: &str) -> Result<Vec<MeetingOccurrence>> {
        let request = self
            .client
            .get(self.url("/searchResults/getFacultyMeetingTimes"))
            .query(&[("term", self.term.as_str()), ("courseReferenceNumber", crn)]);

        let detail: MeetingTimes = self.fetch_json(request, "meeting times").await?;
        Ok(detail
            .fmt
            .into_iter()
            .map(MeetingFaculty::into_occurrence)
            .collect())
    }
}

#[derive(Deserialize)]
struct SearchResults {
    #[serde(default)]
    data: Option<Vec<CourseSection>>,
}

#[derive(Deserialize)]
struct MeetingTimes {
    #[serde(default, deserialize_with = "nullable")]
    fmt: Vec<MeetingFaculty>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct MeetingFaculty {
    #[serde(default, deserialize_with = "nullable")]
    faculty: Vec<Faculty>,
    meeting_time: MeetingTime,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Faculty {
    #[serde(default, deserialize_with = "nullable")]
    display_name: String,
    #[serde(default)]
    email_address: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    primary_indicator: bool,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct MeetingTime {
    #[serde(deserialize_with = "nullable")]
    begin_time: String,
    #[serde(deserialize_with = "nullable")]
    end_time: String,
    #[serde(deserialize_with = "nullable")]
    building: String,
    #[serde(deserialize_with = "nullable")]
    building_description: String,
    #[serde(deserialize_with = "nullable")]
    room: String,
    #[serde(deserialize_with = "nullable")]
    start_date: String,
    #[serde(deserialize_with = "nullable")]
    end_date: String,
    #[serde(deserialize_with = "nullable")]
    meeting_type: String,
    #[serde(deserialize_with = "nullable")]
    meeting_type_description: String,
    #[serde(deserialize_with = "nullable")]
    monday: bool,
    #[serde(deserialize_with = "nullable")]
    tuesday: bool,
    #[serde(deserialize_with = "nullable")]
    wednesday: bool,
    #[serde(deserialize_with = "nullable")]
    thursday: bool,
    #[serde(deserialize_with = "nullable")]
    friday: bool,
    #[serde(deserialize_with = "nullable")]
    saturday: bool,
    #[serde(deserialize_with = "nullable")]
    sunday: bool,
}

impl MeetingFaculty {
    fn into_occurrence(self) -> MeetingOccurrence {
        let time = self.meeting_time;
        let flags = [
            (time.monday, Weekday::Mon),
            (time.tuesday, Weekday::Tue),
            (time.wednesday, Weekday::Wed),
            (time.thursday, Weekday::Thu),
            (time.friday, Weekday::Fri),
            (time.saturday, Weekday::Sat),
            (time.sunday, Weekday::Sun),
        ];
        let days: Days = flags
            .into_iter()
            .filter_map(|(set, day)| set.then_some(day))
            .collect();

        let instructors = self
            .faculty
            .into_iter()
            .map(|faculty| InstructorAssignment {
                name: faculty.display_name,
                email: faculty.email_address.filter(|email| !email.is_empty()),
                primary: faculty.primary_indicator,
            })
            .collect();

        MeetingOccurrence {
            days,
            begin: clock_time(&time.begin_time),
            end: clock_time(&time.end_time),
            building: time.building,
            building_description: time.building_description,
            room: time.room,
            start_date: calendar_date(&time.start_date),
            end_date: calendar_date(&time.end_date),
            meeting_type: time.meeting_type,
            meeting_type_description: time.meeting_type_description,
            instructors,
        }
    }
}

fn clock_time(hhmm: &str) -> Option<NaiveTime> {
    NaiveTime::parse_from_str(hhmm.trim(), "%H%M").ok()
}

fn calendar_date(mmddyyyy: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(mmddyyyy.trim(), "%m/%d/%Y").ok()
}
