//! Timestamp normalization.
//!
//! Every timestamp entering the crate is reduced to whole seconds since the
//! Unix epoch. Numeric inputs are always seconds, never milliseconds.

use crate::core::error::{Result, RustleError};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::time::SystemTime;

/// A timestamp in one of the accepted representations.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeInput {
    /// Whole seconds since the epoch
    Seconds(i64),
    /// Seconds since the epoch with a fractional part, floored
    Fractional(f64),
    /// An ISO-8601 style string
    Text(String),
    /// A calendar instant
    Instant(DateTime<Utc>),
}

impl TimeInput {
    /// Resolves this input to epoch seconds.
    #[allow(clippy::cast_possible_truncation)]
    pub fn to_epoch_seconds(&self) -> Result<i64> {
        match self {
            TimeInput::Seconds(secs) => Ok(*secs),
            TimeInput::Fractional(secs) => {
                if !secs.is_finite() || secs.abs() > i64::MAX as f64 {
                    return Err(RustleError::timestamp(format!("non-representable number {secs}")));
                }
                Ok(secs.floor() as i64)
            },
            TimeInput::Text(text) => parse_text(text),
            TimeInput::Instant(instant) => Ok(instant.timestamp()),
        }
    }
}

/// Converts any accepted representation to epoch seconds.
pub fn to_epoch_seconds(input: impl Into<TimeInput>) -> Result<i64> {
    input.into().to_epoch_seconds()
}

/// Resolves an optional bound, leaving `None` untouched.
pub fn resolve_optional(input: Option<&TimeInput>) -> Result<Option<i64>> {
    input.map(TimeInput::to_epoch_seconds).transpose()
}

/// Current wall-clock time in epoch seconds.
pub fn now_epoch_seconds() -> i64 {
    Utc::now().timestamp()
}

fn parse_text(text: &str) -> Result<i64> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(RustleError::timestamp("empty string"));
    }

    let digits = trimmed.strip_prefix('-').unwrap_or(trimmed);
    if !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()) {
        return trimmed
            .parse::<i64>()
            .map_err(|e| RustleError::timestamp(format!("{trimmed:?}: {e}")));
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.timestamp());
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(trimmed) {
        return Ok(dt.timestamp());
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Ok(naive.and_utc().timestamp());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc().timestamp());
        }
    }

    Err(RustleError::timestamp(format!("unparseable string {trimmed:?}")))
}

impl From<i64> for TimeInput {
    fn from(secs: i64) -> Self {
        TimeInput::Seconds(secs)
    }
}

impl From<u32> for TimeInput {
    fn from(secs: u32) -> Self {
        TimeInput::Seconds(i64::from(secs))
    }
}

impl From<f64> for TimeInput {
    fn from(secs: f64) -> Self {
        TimeInput::Fractional(secs)
    }
}

impl From<&str> for TimeInput {
    fn from(text: &str) -> Self {
        TimeInput::Text(text.to_string())
    }
}

impl From<String> for TimeInput {
    fn from(text: String) -> Self {
        TimeInput::Text(text)
    }
}

impl From<DateTime<Utc>> for TimeInput {
    fn from(instant: DateTime<Utc>) -> Self {
        TimeInput::Instant(instant)
    }
}

impl From<SystemTime> for TimeInput {
    fn from(time: SystemTime) -> Self {
        TimeInput::Instant(DateTime::<Utc>::from(time))
    }
}

impl TryFrom<&serde_json::Value> for TimeInput {
    type Error = RustleError;

    fn try_from(value: &serde_json::Value) -> Result<Self> {
        match value {
            serde_json::Value::Number(n) => {
                if let Some(secs) = n.as_i64() {
                    Ok(TimeInput::Seconds(secs))
                } else if let Some(secs) = n.as_f64() {
                    Ok(TimeInput::Fractional(secs))
                } else {
                    Err(RustleError::timestamp(format!("number {n}")))
                }
            },
            serde_json::Value::String(s) => Ok(TimeInput::Text(s.clone())),
            serde_json::Value::Null => Err(RustleError::timestamp("null")),
            serde_json::Value::Bool(_) => Err(RustleError::timestamp("boolean")),
            serde_json::Value::Array(_) => Err(RustleError::timestamp("array")),
            serde_json::Value::Object(_) => Err(RustleError::timestamp("object")),
        }
    }
}
