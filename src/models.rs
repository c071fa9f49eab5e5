use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A civic issue report as stored by the mobile app and the dashboard.
///
/// Field names follow the camelCase JSON the browser client writes. Every field
/// falls back to its default when missing or `null` so that records written by
/// other producers still parse. This is a read view: the slot itself keeps
/// stored records exactly as their producer wrote them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Report {
    #[serde(deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(deserialize_with = "null_as_default")]
    pub title: String,
    #[serde(deserialize_with = "null_as_default")]
    pub description: String,
    #[serde(deserialize_with = "null_as_default")]
    pub category: String,
    #[serde(deserialize_with = "null_as_default")]
    pub priority: String,
    #[serde(deserialize_with = "null_as_default")]
    pub status: String,
    #[serde(deserialize_with = "null_as_default")]
    pub location: String,
    #[serde(deserialize_with = "null_as_default")]
    pub coordinates: Coordinates,
    #[serde(deserialize_with = "null_as_default")]
    pub user: ReportUser,
    #[serde(deserialize_with = "timestamp_string")]
    pub timestamp: String,
    #[serde(deserialize_with = "timestamp_string")]
    pub created_at: String,
    #[serde(deserialize_with = "null_as_default")]
    pub ai_analysis: AiAnalysis,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Coordinates {
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportUser {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AiAnalysis {
    pub confidence: f64,
    pub tags: Vec<String>,
    pub estimated_resolution_time: String,
    pub urgency: i32,
}

pub const STATUS_PENDING: &str = "pending";

impl Report {
    /// Creation instant in epoch milliseconds, `None` when `timestamp` is not
    /// an RFC 3339 instant.
    pub fn timestamp_millis(&self) -> Option<i64> {
        DateTime::parse_from_rfc3339(&self.timestamp)
            .ok()
            .map(|ts| ts.timestamp_millis())
    }

    pub fn is_newer_than(&self, watermark: DateTime<Utc>) -> bool {
        self.timestamp_millis()
            .is_some_and(|ts| ts > watermark.timestamp_millis())
    }
}

/// Parses the slot's JSON array one record at a time.
///
/// Only a value that is not a JSON array is an error. Records that still fail
/// to parse are dropped from the view and never count as new.
pub fn parse_reports(raw: &str) -> Result<Vec<Report>, serde_json::Error> {
    let records: Vec<Value> = serde_json::from_str(raw)?;
    Ok(records
        .into_iter()
        .enumerate()
        .filter_map(|(index, record)| match serde_json::from_value(record) {
            Ok(report) => Some(report),
            Err(e) => {
                tracing::debug!("skipping unreadable report at index {}: {}", index, e);
                None
            }
        })
        .collect())
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Accepts an ISO string or epoch milliseconds, like `new Date(x)` does.
fn timestamp_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|ms| ms as i64))
            .and_then(DateTime::<Utc>::from_timestamp_millis)
            .map(iso_timestamp)
            .unwrap_or_default(),
        _ => String::new(),
    })
}

/// Formats an instant the way the browser client does (`toISOString`).
pub fn iso_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
