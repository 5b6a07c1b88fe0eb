/// Crowd-report ingestion
///
/// Readers for the sources the estimates are mined from: Telegram chat
/// exports and archived subreddit threads. Everything is normalized into
/// `RawMessage` records; the extraction/aggregation core only ever sees
/// those.
pub mod reddit;
pub mod telegram;

pub use reddit::RedditDumpReader;
pub use telegram::TelegramExportReader;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where a crowd report was captured
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageSource {
    Telegram,
    Reddit,
}

/// One crowd report, immutable once captured. Only `text` and `timestamp`
/// feed the estimation pipeline; `sender` is kept for traceability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessage {
    pub sender: String,
    pub text: String,
    /// Local club time, offset-aware
    pub timestamp: DateTime<FixedOffset>,
    pub source: MessageSource,
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("unrecognized timestamp format: {0}")]
    Timestamp(String),

    #[error("malformed export file {path}: {reason}")]
    MalformedExport { path: String, reason: String },
}

/// A source of crowd reports for a date range. File readers implement this
/// today; a live feed can slot in behind the same seam.
#[async_trait]
pub trait MessageFeed {
    async fn fetch(&self) -> anyhow::Result<Vec<RawMessage>>;
}

/// Telegram exports carry timestamps like "22.01.2023 23:45:12 UTC+01:00";
/// older exports omit the offset, which is then assumed to be CET.
pub fn parse_export_timestamp(raw: &str) -> Result<DateTime<FixedOffset>, IngestError> {
    let raw = raw.trim();

    if let Ok(ts) = DateTime::parse_from_str(raw, "%d.%m.%Y %H:%M:%S UTC%:z") {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts);
    }
    if let Ok(ts) = DateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S%:z") {
        return Ok(ts);
    }
    if let Ok(naive) = chrono::NaiveDateTime::parse_from_str(raw, "%d.%m.%Y %H:%M:%S") {
        let cet = FixedOffset::east_opt(3600).ok_or_else(|| IngestError::Timestamp(raw.into()))?;
        return naive
            .and_local_timezone(cet)
            .single()
            .ok_or_else(|| IngestError::Timestamp(raw.into()));
    }

    Err(IngestError::Timestamp(raw.to_string()))
}

/// Merge records from several sources into one timestamp-ordered stream
pub fn merge_sorted(batches: Vec<Vec<RawMessage>>) -> Vec<RawMessage> {
    let mut merged: Vec<RawMessage> = batches.into_iter().flatten().collect();
    merged.sort_by_key(|m| m.timestamp);
    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_telegram_export_timestamp() {
        let ts = parse_export_timestamp("22.01.2023 23:45:12 UTC+01:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-01-22T23:45:12+01:00");
    }

    #[test]
    fn test_parse_naive_timestamp_assumes_cet() {
        let ts = parse_export_timestamp("22.01.2023 23:45:12").unwrap();
        assert_eq!(ts.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_parse_rfc3339_timestamp() {
        let ts = parse_export_timestamp("2023-08-26T23:14:05+02:00").unwrap();
        assert_eq!(ts.to_rfc3339(), "2023-08-26T23:14:05+02:00");
    }

    #[test]
    fn test_unparseable_timestamp_is_error() {
        assert!(parse_export_timestamp("last saturday-ish").is_err());
    }

    #[test]
    fn test_merge_sorted_orders_across_sources() {
        let a = RawMessage {
            sender: "a".into(),
            text: "2 hours".into(),
            timestamp: DateTime::parse_from_rfc3339("2024-03-02T23:00:00+01:00").unwrap(),
            source: MessageSource::Telegram,
        };
        let b = RawMessage {
            sender: "b".into(),
            text: "30 mins".into(),
            timestamp: DateTime::parse_from_rfc3339("2024-03-02T22:00:00+01:00").unwrap(),
            source: MessageSource::Reddit,
        };

        let merged = merge_sorted(vec![vec![a], vec![b]]);
        assert_eq!(merged[0].sender, "b");
        assert_eq!(merged[1].sender, "a");
    }
}
