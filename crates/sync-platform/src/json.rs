//! JSON state-file validation helpers: every state file must parse and
//! carry a `state_file_version` and a non-future `last_updated`
//! (spec.md §8 invariants).

use chrono::{DateTime, Utc};
use serde_json::Value;
use thiserror::Error;

use crate::iso8601::{is_not_future, parse_iso8601};

#[derive(Debug, Error)]
pub enum JsonStateError {
    #[error("invalid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("missing required field `{0}`")]
    MissingField(&'static str),
    #[error("field `{0}` has the wrong type")]
    WrongType(&'static str),
    #[error("last_updated is too far in the future: {0}")]
    FutureTimestamp(DateTime<Utc>),
}

/// Validate the generic envelope shared by every state file: parses as
/// JSON, has an integer `state_file_version`, and a `last_updated`
/// that parses as ISO-8601 and is not more than `skew_seconds` in the
/// future.
pub fn validate_state_envelope(raw: &str, skew_seconds: i64) -> Result<Value, JsonStateError> {
    let value: Value = serde_json::from_str(raw)?;

    value
        .get("state_file_version")
        .and_then(Value::as_u64)
        .ok_or(JsonStateError::MissingField("state_file_version"))?;

    let last_updated = value
        .get("last_updated")
        .and_then(Value::as_str)
        .ok_or(JsonStateError::MissingField("last_updated"))?;

    let parsed = parse_iso8601(last_updated).map_err(|_| JsonStateError::WrongType("last_updated"))?;

    if !is_not_future(parsed, skew_seconds) {
        return Err(JsonStateError::FutureTimestamp(parsed));
    }

    Ok(value)
}
