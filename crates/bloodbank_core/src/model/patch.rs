//! Allow-listed partial-update support shared by entity patches.
//!
//! Patches arrive as JSON objects. Each entity patch walks the object, picks
//! the keys it knows, and converts every value with one of the typed readers
//! below before anything is assigned. Unknown keys are skipped.

use chrono::{DateTime, SubsecRound, Utc};
use serde_json::{Map, Value};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// JSON object shape accepted by every `*Patch::from_json`.
pub type JsonObject = Map<String, Value>;

/// Rejection raised while converting a JSON payload into a typed patch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// Payload is not a JSON object.
    NotAnObject,
    /// A known field carries a value of the wrong type or out of range.
    InvalidField {
        field: &'static str,
        message: String,
    },
}

impl PatchError {
    pub(crate) fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidField {
            field,
            message: message.into(),
        }
    }
}

impl Display for PatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotAnObject => write!(f, "patch payload must be a JSON object"),
            Self::InvalidField { field, message } => {
                write!(f, "invalid value for `{field}`: {message}")
            }
        }
    }
}

impl Error for PatchError {}

/// Returns the payload as an object or rejects it.
pub fn as_object(payload: &Value) -> Result<&JsonObject, PatchError> {
    payload.as_object().ok_or(PatchError::NotAnObject)
}

/// Reads a required, non-empty string no longer than `max_chars`.
pub fn read_text(field: &'static str, value: &Value, max_chars: usize) -> Result<String, PatchError> {
    let text = value
        .as_str()
        .ok_or_else(|| PatchError::invalid(field, "expected a string"))?;
    if text.is_empty() {
        return Err(PatchError::invalid(field, "must not be empty"));
    }
    check_length(field, text, max_chars)?;
    Ok(text.to_string())
}

/// Reads a nullable string; `null` clears the attribute.
pub fn read_optional_text(
    field: &'static str,
    value: &Value,
    max_chars: usize,
) -> Result<Option<String>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    read_text(field, value, max_chars).map(Some)
}

pub fn read_bool(field: &'static str, value: &Value) -> Result<bool, PatchError> {
    value
        .as_bool()
        .ok_or_else(|| PatchError::invalid(field, "expected a boolean"))
}

pub fn read_optional_bool(field: &'static str, value: &Value) -> Result<Option<bool>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    read_bool(field, value).map(Some)
}

/// Reads an RFC 3339 timestamp, normalized to UTC at millisecond precision.
pub fn read_timestamp(field: &'static str, value: &Value) -> Result<DateTime<Utc>, PatchError> {
    let text = value
        .as_str()
        .ok_or_else(|| PatchError::invalid(field, "expected an RFC 3339 timestamp string"))?;
    DateTime::parse_from_rfc3339(text)
        .map(|parsed| parsed.with_timezone(&Utc).trunc_subsecs(3))
        .map_err(|err| PatchError::invalid(field, format!("unparseable timestamp `{text}`: {err}")))
}

pub fn read_optional_timestamp(
    field: &'static str,
    value: &Value,
) -> Result<Option<DateTime<Utc>>, PatchError> {
    if value.is_null() {
        return Ok(None);
    }
    read_timestamp(field, value).map(Some)
}

fn check_length(field: &'static str, text: &str, max_chars: usize) -> Result<(), PatchError> {
    let count = text.chars().count();
    if count > max_chars {
        return Err(PatchError::invalid(
            field,
            format!("{count} characters exceeds the limit of {max_chars}"),
        ));
    }
    Ok(())
}
