#![cfg_attr(test, allow(clippy::expect_used))]

use std::time::Duration;

use reqwest::StatusCode;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

mod types;

pub use types::{
    Assessment, CaseDetail, DEFAULT_QUEUE_PAGE_SIZE, DEFAULT_TOP_MERCHANTS_LIMIT, Decision,
    MonitoringSnapshot, MonitoringSummary, QueueEntry, QueuePage, ReasonEntry, Reasons,
    ReviewAction, ReviewActionKind, ReviewActionReceipt, ReviewActionRequest, ScoreBucket,
    Timestamp, TopMerchant, TransactionRecord,
};

pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;
const MIN_TIMEOUT_MS: u64 = 250;

#[derive(Debug, Clone)]
pub struct ReviewApiClientConfig {
    pub base_url: String,
    pub timeout_ms: u64,
}

impl ReviewApiClientConfig {
    #[must_use]
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }
}

impl Default for ReviewApiClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

/// Typed boundary to the scoring/decision backend. Requests are attempted once;
/// retry policy belongs to callers.
#[derive(Debug, Clone)]
pub struct ReviewApiClient {
    base_url: String,
    timeout: Duration,
    http: reqwest::Client,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReviewApiError {
    #[error("review_api_base_url_missing")]
    BaseUrlMissing,
    #[error("review_api_invalid_base_url:{base_url}")]
    InvalidBaseUrl { base_url: String },
    #[error("review_api_invalid_path")]
    InvalidPath,
    #[error("review_api_request_failed:{message}")]
    Transport { message: String },
    #[error("review_api_http_{status}:{message}")]
    Http { status: StatusCode, message: String },
    #[error("review_api_json_decode_failed:{detail}")]
    Decode { raw: String, detail: String },
}

impl ReviewApiError {
    /// Human-readable text for the error banner.
    #[must_use]
    pub fn message(&self) -> String {
        match self {
            Self::Transport { message } | Self::Http { message, .. } => message.clone(),
            Self::Decode { raw, detail } => {
                if raw.trim().is_empty() {
                    detail.clone()
                } else {
                    raw.clone()
                }
            }
            Self::BaseUrlMissing | Self::InvalidBaseUrl { .. } | Self::InvalidPath => {
                self.to_string()
            }
        }
    }

    #[must_use]
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Http { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl ReviewApiClient {
    pub fn new(config: ReviewApiClientConfig) -> Result<Self, ReviewApiError> {
        let base_url = normalize_base_url(&config.base_url)?;
        Ok(Self {
            base_url,
            timeout: Duration::from_millis(config.timeout_ms.max(MIN_TIMEOUT_MS)),
            http: reqwest::Client::new(),
        })
    }

    #[must_use]
    pub fn base_url(&self) -> &str {
        self.base_url.as_str()
    }

    #[must_use]
    pub fn endpoint(&self, path: &str) -> Option<String> {
        let trimmed = path.trim();
        if trimmed.is_empty() {
            return None;
        }
        if trimmed.starts_with('/') {
            Some(format!("{}{}", self.base_url, trimmed))
        } else {
            Some(format!("{}/{}", self.base_url, trimmed))
        }
    }

    #[must_use]
    pub fn review_queue_path(page: QueuePage) -> String {
        format!("/review/queue?limit={}&offset={}", page.limit, page.offset)
    }

    #[must_use]
    pub fn review_case_path(transaction_id: &str) -> String {
        format!("/review/case/{}", urlencoding::encode(transaction_id.trim()))
    }

    #[must_use]
    pub fn review_action_path(transaction_id: &str) -> String {
        format!(
            "/review/case/{}/action",
            urlencoding::encode(transaction_id.trim())
        )
    }

    #[must_use]
    pub fn monitoring_summary_path() -> &'static str {
        "/monitoring/summary"
    }

    #[must_use]
    pub fn monitoring_score_buckets_path() -> &'static str {
        "/monitoring/score_buckets"
    }

    #[must_use]
    pub fn monitoring_top_merchants_path(limit: u32) -> String {
        format!("/monitoring/top_merchants?limit={limit}")
    }

    pub async fn review_queue(&self, page: QueuePage) -> Result<Vec<QueueEntry>, ReviewApiError> {
        self.get_json(Self::review_queue_path(page).as_str()).await
    }

    pub async fn review_case(&self, transaction_id: &str) -> Result<CaseDetail, ReviewApiError> {
        self.get_json(Self::review_case_path(transaction_id).as_str())
            .await
    }

    /// Not idempotent: every call appends a history entry server-side.
    pub async fn record_review_action(
        &self,
        transaction_id: &str,
        request: &ReviewActionRequest,
    ) -> Result<ReviewActionReceipt, ReviewApiError> {
        let receipt: Option<ReviewActionReceipt> = self
            .post_json(Self::review_action_path(transaction_id).as_str(), request)
            .await?;
        Ok(receipt.unwrap_or_default())
    }

    pub async fn monitoring_summary(&self) -> Result<MonitoringSummary, ReviewApiError> {
        self.get_json(Self::monitoring_summary_path()).await
    }

    pub async fn monitoring_score_buckets(&self) -> Result<Vec<ScoreBucket>, ReviewApiError> {
        self.get_json(Self::monitoring_score_buckets_path()).await
    }

    pub async fn monitoring_top_merchants(
        &self,
        limit: u32,
    ) -> Result<Vec<TopMerchant>, ReviewApiError> {
        self.get_json(Self::monitoring_top_merchants_path(limit).as_str())
            .await
    }

    pub async fn get_json<T>(&self, path: &str) -> Result<T, ReviewApiError>
    where
        T: for<'de> serde::Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ReviewApiError::InvalidPath)?;
        let response = self.send(self.http.get(url.as_str()), "GET", path).await?;
        decode_json_response(response).await
    }

    pub async fn post_json<Req, Res>(
        &self,
        path: &str,
        payload: &Req,
    ) -> Result<Res, ReviewApiError>
    where
        Req: Serialize + ?Sized,
        Res: for<'de> serde::Deserialize<'de>,
    {
        let url = self.endpoint(path).ok_or(ReviewApiError::InvalidPath)?;
        let response = self
            .send(self.http.post(url.as_str()).json(payload), "POST", path)
            .await?;
        decode_json_response(response).await
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        method: &'static str,
        path: &str,
    ) -> Result<reqwest::Response, ReviewApiError> {
        let request_id = format!("req_{}", Uuid::new_v4().simple());
        debug!(%request_id, method, path, "review api request");
        request
            .header("x-request-id", request_id.as_str())
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| ReviewApiError::Transport {
                message: error.to_string(),
            })
    }
}

/// Non-success bodies become the error message: JSON is re-serialized compactly
/// (a JSON string is used as-is), anything else is kept as raw text.
pub fn format_http_error(status: StatusCode, body: &[u8]) -> ReviewApiError {
    let text = String::from_utf8_lossy(body);
    let trimmed = text.trim();
    let message = if trimmed.is_empty() {
        status.to_string()
    } else {
        match serde_json::from_str::<Value>(trimmed) {
            Ok(Value::String(message)) => message,
            Ok(structured) => structured.to_string(),
            Err(_) => trimmed.to_string(),
        }
    };
    ReviewApiError::Http { status, message }
}

/// An empty success body decodes as JSON `null`.
pub fn decode_body<T>(body: &[u8]) -> Result<T, ReviewApiError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let text = String::from_utf8_lossy(body);
    let decoded = if text.trim().is_empty() {
        serde_json::from_value::<T>(Value::Null)
    } else {
        serde_json::from_slice::<T>(body)
    };
    decoded.map_err(|error| ReviewApiError::Decode {
        raw: text.trim().to_string(),
        detail: error.to_string(),
    })
}

fn normalize_base_url(base_url: &str) -> Result<String, ReviewApiError> {
    let trimmed = base_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(ReviewApiError::BaseUrlMissing);
    }
    let host = trimmed
        .strip_prefix("http://")
        .or_else(|| trimmed.strip_prefix("https://"));
    match host {
        Some(host) if !host.is_empty() => Ok(trimmed.to_string()),
        _ => Err(ReviewApiError::InvalidBaseUrl {
            base_url: trimmed.to_string(),
        }),
    }
}

async fn decode_json_response<T>(response: reqwest::Response) -> Result<T, ReviewApiError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let status = response.status();
    let bytes = response
        .bytes()
        .await
        .map_err(|error| ReviewApiError::Transport {
            message: error.to_string(),
        })?;

    if !status.is_success() {
        return Err(format_http_error(status, &bytes));
    }

    decode_body(&bytes)
}
