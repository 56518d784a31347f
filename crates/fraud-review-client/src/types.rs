use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};
use tracing::debug;

pub const DEFAULT_QUEUE_PAGE_SIZE: u32 = 100;
pub const DEFAULT_TOP_MERCHANTS_LIMIT: u32 = 10;

/// Feature keys that identify the row rather than describe the transaction.
const NON_DESCRIPTIVE_FEATURE_KEYS: [&str; 2] = ["transaction_id", "created_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Approve,
    ManualReview,
    Block,
    #[serde(other)]
    Unknown,
}

impl Decision {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::ManualReview => "manual_review",
            Self::Block => "block",
            Self::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewActionKind {
    Approve,
    Reject,
}

impl ReviewActionKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Approve => "approve",
            Self::Reject => "reject",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "approve" | "approved" => Some(Self::Approve),
            "reject" | "rejected" => Some(Self::Reject),
            _ => None,
        }
    }
}

/// Backend timestamps arrive either as RFC 3339 or as naive ISO-8601 (UTC).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        if let Ok(parsed) = DateTime::parse_from_rfc3339(trimmed) {
            return Some(Self(parsed.with_timezone(&Utc)));
        }
        ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
            .iter()
            .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
            .map(|naive| Self(naive.and_utc()))
    }

    #[must_use]
    pub fn as_datetime(&self) -> DateTime<Utc> {
        self.0
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(value: DateTime<Utc>) -> Self {
        Self(value)
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.to_rfc3339())
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0.to_rfc3339())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw)
            .ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuePage {
    pub limit: u32,
    pub offset: u32,
}

impl Default for QueuePage {
    fn default() -> Self {
        Self {
            limit: DEFAULT_QUEUE_PAGE_SIZE,
            offset: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub transaction_id: String,
    pub risk_score: u32,
    pub fraud_probability: f64,
    pub amount: f64,
    pub country: String,
    pub merchant: String,
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decision: Option<Decision>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub transaction_id: String,
    pub user_id: String,
    #[serde(default)]
    pub card_id: String,
    #[serde(default)]
    pub device_id: String,
    pub amount: f64,
    #[serde(default)]
    pub currency: String,
    pub merchant: String,
    #[serde(default)]
    pub merchant_category: String,
    pub country: String,
    #[serde(default)]
    pub timestamp: Option<Timestamp>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_fraud: bool,
    #[serde(default)]
    pub fraud_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReasonEntry {
    pub feature: String,
    #[serde(default)]
    pub value: Option<f64>,
    pub contribution: f64,
}

/// Explanation terms as stored by the backend: either a JSON array, or the same
/// array encoded into a string column.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Reasons {
    #[default]
    Absent,
    Entries(Vec<ReasonEntry>),
    Encoded(String),
}

impl Reasons {
    #[must_use]
    pub fn from_value(value: Value) -> Self {
        match value {
            Value::Null => Self::Absent,
            Value::String(raw) => Self::Encoded(raw),
            Value::Array(items) => Self::Entries(decode_reason_items(items)),
            other => {
                debug!(kind = json_kind(&other), "ignoring non-sequence reasons value");
                Self::Absent
            }
        }
    }

    /// Best-effort: anything that does not decode yields an empty sequence.
    #[must_use]
    pub fn entries(&self) -> Vec<ReasonEntry> {
        match self {
            Self::Absent => Vec::new(),
            Self::Entries(entries) => entries.clone(),
            Self::Encoded(raw) => decode_encoded_reasons(raw),
        }
    }
}

impl Serialize for Reasons {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Absent => serializer.serialize_none(),
            Self::Entries(entries) => entries.serialize(serializer),
            Self::Encoded(raw) => serializer.serialize_str(raw),
        }
    }
}

impl<'de> Deserialize<'de> for Reasons {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from_value)
    }
}

fn decode_reason_items(items: Vec<Value>) -> Vec<ReasonEntry> {
    items
        .into_iter()
        .map(serde_json::from_value::<ReasonEntry>)
        .collect::<Result<Vec<_>, _>>()
        .unwrap_or_else(|error| {
            debug!(%error, "discarding malformed reasons sequence");
            Vec::new()
        })
}

fn decode_encoded_reasons(raw: &str) -> Vec<ReasonEntry> {
    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => decode_reason_items(items),
        Ok(other) => {
            debug!(kind = json_kind(&other), "encoded reasons are not a sequence");
            Vec::new()
        }
        Err(error) => {
            debug!(%error, "encoded reasons failed to decode");
            Vec::new()
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Assessment {
    pub decision: Decision,
    pub risk_score: u32,
    pub fraud_probability: f64,
    #[serde(default)]
    pub reasons: Reasons,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewAction {
    pub id: i64,
    pub action: String,
    pub analyst: String,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CaseDetail {
    pub transaction: TransactionRecord,
    #[serde(default)]
    pub assessment: Option<Assessment>,
    #[serde(default)]
    pub features: Option<Map<String, Value>>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub review_history: Vec<ReviewAction>,
}

impl CaseDetail {
    #[must_use]
    pub fn transaction_id(&self) -> &str {
        self.transaction.transaction_id.as_str()
    }

    #[must_use]
    pub fn reasons(&self) -> Vec<ReasonEntry> {
        self.assessment
            .as_ref()
            .map(|assessment| assessment.reasons.entries())
            .unwrap_or_default()
    }

    /// Descriptive features in backend order, capped at `limit`.
    #[must_use]
    pub fn key_features(&self, limit: usize) -> Vec<(&str, &Value)> {
        self.features
            .iter()
            .flat_map(|features| features.iter())
            .filter(|(key, _)| !NON_DESCRIPTIVE_FEATURE_KEYS.contains(&key.as_str()))
            .take(limit)
            .map(|(key, value)| (key.as_str(), value))
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewActionRequest {
    pub action: ReviewActionKind,
    pub analyst: String,
    pub notes: Option<String>,
}

impl ReviewActionRequest {
    #[must_use]
    pub fn new(action: ReviewActionKind, analyst: &str, notes: Option<&str>) -> Self {
        Self {
            action,
            analyst: analyst.trim().to_string(),
            notes: notes
                .map(str::trim)
                .filter(|value| !value.is_empty())
                .map(ToString::to_string),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReviewActionReceipt {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub transaction_id: Option<String>,
    #[serde(default)]
    pub action: Option<String>,
    #[serde(default)]
    pub analyst: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub created_at: Option<Timestamp>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MonitoringSummary {
    #[serde(default, deserialize_with = "null_as_default")]
    pub total: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub approve: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub manual_review: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub block: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreBucket {
    pub bucket: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub count: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopMerchant {
    pub merchant: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tx_count: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub avg_risk: f64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub reviews: u64,
    #[serde(default, deserialize_with = "null_as_default")]
    pub blocks: u64,
}

/// Trailing 24h aggregates, fetched together and replaced together.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MonitoringSnapshot {
    pub summary: MonitoringSummary,
    pub score_buckets: Vec<ScoreBucket>,
    pub top_merchants: Vec<TopMerchant>,
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
