use std::time::Duration;

use fraud_review_client::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT_MS, ReviewApiClientConfig};
use fraud_review_core::DEFAULT_POLL_INTERVAL;
use tracing::warn;

pub const ENV_API_BASE_URL: &str = "FRAUD_REVIEW_API_BASE_URL";
pub const ENV_TIMEOUT_MS: &str = "FRAUD_REVIEW_TIMEOUT_MS";
pub const ENV_ANALYST: &str = "FRAUD_REVIEW_ANALYST";
pub const ENV_POLL_INTERVAL_MS: &str = "FRAUD_REVIEW_POLL_INTERVAL_MS";

pub const BASE_URL_SOURCE_FLAG: &str = "flag";
pub const BASE_URL_SOURCE_DEFAULT_LOCAL: &str = "default_local";
pub const DEFAULT_ANALYST: &str = "andre";

/// Values given on the command line; they win over the environment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
    pub analyst: Option<String>,
    pub poll_interval_ms: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkstationConfig {
    pub base_url: String,
    pub base_url_source: String,
    pub timeout_ms: u64,
    pub analyst: String,
    pub poll_interval: Duration,
}

impl WorkstationConfig {
    pub fn resolve(overrides: &ConfigOverrides) -> Self {
        let (base_url, base_url_source) = resolve_base_url(overrides.base_url.as_deref());
        let timeout_ms = overrides
            .timeout_ms
            .or_else(|| env_u64(ENV_TIMEOUT_MS))
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let analyst = overrides
            .analyst
            .as_deref()
            .map(str::trim)
            .filter(|analyst| !analyst.is_empty())
            .map(str::to_string)
            .or_else(|| env_non_empty(ENV_ANALYST))
            .unwrap_or_else(|| DEFAULT_ANALYST.to_string());
        let poll_interval = overrides
            .poll_interval_ms
            .or_else(|| env_u64(ENV_POLL_INTERVAL_MS))
            .map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis);

        Self {
            base_url,
            base_url_source,
            timeout_ms,
            analyst,
            poll_interval,
        }
    }

    pub fn client_config(&self) -> ReviewApiClientConfig {
        ReviewApiClientConfig {
            base_url: self.base_url.clone(),
            timeout_ms: self.timeout_ms,
        }
    }
}

fn resolve_base_url(flag: Option<&str>) -> (String, String) {
    if let Some(base_url) = flag
        .map(|value| value.trim().trim_end_matches('/'))
        .filter(|value| !value.is_empty())
    {
        return (base_url.to_string(), BASE_URL_SOURCE_FLAG.to_string());
    }
    if let Some(base_url) = env_non_empty(ENV_API_BASE_URL) {
        return (
            base_url.trim_end_matches('/').to_string(),
            ENV_API_BASE_URL.to_string(),
        );
    }
    (
        DEFAULT_BASE_URL.to_string(),
        BASE_URL_SOURCE_DEFAULT_LOCAL.to_string(),
    )
}

fn env_u64(key: &str) -> Option<u64> {
    let raw = env_non_empty(key)?;
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(error) => {
            warn!(key, value = %raw, %error, "ignoring non-numeric environment value");
            None
        }
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
