//! Domain model for contacts, lost items, tasks and emergency sessions.
//!
//! # Responsibility
//! - Define the canonical records persisted in the key-value store.
//! - Keep the emergency session event log append-only.
//!
//! # Invariants
//! - Every collection record is identified by a stable `RecordId`.
//! - Records are replaced whole; there is no partial field patching.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use uuid::Uuid;

pub mod contact;
pub mod lost_item;
pub mod position;
pub mod session;
pub mod todo;

/// Stable identifier for contacts, lost items and tasks.
///
/// New records get a random UUID. Numeric ids written by earlier releases
/// are kept as numbers so their data stays readable and round-trips unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Number(i64),
    Uuid(Uuid),
}

impl RecordId {
    /// Fresh random id.
    pub fn new() -> Self {
        Self::Uuid(Uuid::new_v4())
    }
}

impl Default for RecordId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(value) => write!(f, "{value}"),
            Self::Uuid(value) => write!(f, "{value}"),
        }
    }
}

impl From<Uuid> for RecordId {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Number(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRecordIdError(String);

impl Display for ParseRecordIdError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "`{}` is neither a number nor a UUID", self.0)
    }
}

impl Error for ParseRecordIdError {}

impl FromStr for RecordId {
    type Err = ParseRecordIdError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let raw = raw.trim();
        if let Ok(number) = raw.parse::<i64>() {
            return Ok(Self::Number(number));
        }
        Uuid::parse_str(raw)
            .map(Self::Uuid)
            .map_err(|_| ParseRecordIdError(raw.to_string()))
    }
}
