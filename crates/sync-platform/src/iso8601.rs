//! ISO-8601 UTC parsing/formatting used by every JSON state file's
//! `last_updated` field.

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;

#[derive(Debug, Error)]
#[error("invalid ISO-8601 timestamp {raw:?}: {source}")]
pub struct Iso8601Error {
    raw: String,
    #[source]
    source: chrono::ParseError,
}

pub fn now_iso8601() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn format_iso8601(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Secs, true)
}

pub fn parse_iso8601(raw: &str) -> Result<DateTime<Utc>, Iso8601Error> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|source| Iso8601Error {
            raw: raw.to_string(),
            source,
        })
}

/// A parsed timestamp is rejected if it lies more than `skew` seconds
/// in the future relative to now — used by state recovery (§4.8) and
/// the testable-property "non-future `last_updated`".
pub fn is_not_future(ts: DateTime<Utc>, skew_seconds: i64) -> bool {
    let now = Utc::now();
    ts <= now + chrono::Duration::seconds(skew_seconds)
}
