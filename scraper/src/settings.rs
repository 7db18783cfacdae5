use std::time::Duration;

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError, Environment, File};
use serde::Deserialize;

use crate::retry::RetryPolicy;

/// What to do when one of the session priming requests fails.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PrimePolicy {
    /// Abort the fetch with the priming error.
    #[default]
    Strict,
    /// Log the failure and issue the query anyway.
    Lenient,
}

#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    pub term: String,
    pub banner_url: String,
    pub catalog_url: String,
    pub concurrency: usize,
    pub attempts: u32,
    pub retry_delay_ms: u64,
    pub request_timeout_secs: u64,
    pub prime_policy: PrimePolicy,
    pub page_size: u32,
    pub dry_run_limit: usize,
}

impl Settings {
    /// Defaults, overridden by `coursescrape.toml` if present, overridden by
    /// `COURSESCRAPE_*` environment variables.
    pub fn load() -> Result<Self, ConfigError> {
        Self::builder()?
            .add_source(File::with_name("coursescrape").required(false))
            .add_source(Environment::with_prefix("COURSESCRAPE").try_parsing(true))
            .build()?
            .try_deserialize()
    }

    fn builder() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        Config::builder()
            .set_default("term", "202501")?
            .set_default(
                "banner_url",
                "https://banner.uvic.ca/StudentRegistrationSsb/ssb",
            )?
            .set_default(
                "catalog_url",
                "https://uvic.kuali.co/api/v1/catalog/course/65eb47906641d7001c157bc4",
            )?
            .set_default("concurrency", 10_i64)?
            .set_default("attempts", 3_i64)?
            .set_default("retry_delay_ms", 1000_i64)?
            .set_default("request_timeout_secs", 30_i64)?
            .set_default("prime_policy", "strict")?
            .set_default("page_size", 50_i64)?
            .set_default("dry_run_limit", 10_i64)
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            attempts: self.attempts,
            delay: Duration::from_millis(self.retry_delay_ms),
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}
