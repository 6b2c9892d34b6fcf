//! Versioned record envelope.
//!
//! Stored layout: `{"schema_version": <u32>, "data": <value>}`. Values written
//! before the envelope existed are plain JSON and decode as `Legacy`.

use serde::Serialize;
use serde_json::Value;

/// Envelope version written by this build.
pub const CURRENT_SCHEMA_VERSION: u32 = 1;

const VERSION_FIELD: &str = "schema_version";
const DATA_FIELD: &str = "data";

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    schema_version: u32,
    data: &'a Value,
}

/// Decoded state of one stored slot.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordState {
    Absent,
    Current(Value),
    /// Pre-envelope JSON (or an older envelope); payload is still usable.
    Legacy(Value),
    Malformed(String),
    /// Written by a newer build.
    UnsupportedVersion(u32),
}

impl RecordState {
    /// Returns the usable payload, if any.
    pub fn into_value(self) -> Option<Value> {
        match self {
            Self::Current(value) | Self::Legacy(value) => Some(value),
            Self::Absent | Self::Malformed(_) | Self::UnsupportedVersion(_) => None,
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

pub(crate) fn encode(value: &Value) -> Result<String, serde_json::Error> {
    serde_json::to_string(&EnvelopeRef {
        schema_version: CURRENT_SCHEMA_VERSION,
        data: value,
    })
}

pub(crate) fn decode(raw: Option<&str>) -> RecordState {
    let Some(raw) = raw.filter(|raw| !raw.trim().is_empty()) else {
        return RecordState::Absent;
    };

    let mut parsed: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(err) => return RecordState::Malformed(err.to_string()),
    };

    let Some(version) = parsed.get(VERSION_FIELD).map(Value::as_u64) else {
        return match parsed {
            Value::Null => RecordState::Absent,
            other => RecordState::Legacy(other),
        };
    };

    let Some(version) = version.and_then(|value| u32::try_from(value).ok()) else {
        return RecordState::Malformed(format!("`{VERSION_FIELD}` is not a valid version"));
    };
    if version > CURRENT_SCHEMA_VERSION {
        return RecordState::UnsupportedVersion(version);
    }

    let Some(data) = parsed.get_mut(DATA_FIELD).map(Value::take) else {
        return RecordState::Malformed(format!("envelope is missing `{DATA_FIELD}`"));
    };
    if version == CURRENT_SCHEMA_VERSION {
        RecordState::Current(data)
    } else {
        RecordState::Legacy(data)
    }
}
