//! Emergency contact model.
//!
//! # Invariants
//! - `name` is never blank after trim.
//! - `phone` matches the permissive dial-string pattern used for alerts.

use crate::model::RecordId;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9(][0-9()\-.\s]{2,19}$").expect("valid phone regex"));

/// Person notified when an emergency is activated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: RecordId,
    pub name: String,
    pub phone: String,
    #[serde(default)]
    pub relationship: String,
    #[serde(default)]
    pub is_primary: bool,
    /// Records from earlier releases may lack this; they load as the epoch.
    #[serde(default)]
    pub created_at: DateTime<Utc>,
}

impl Contact {
    /// Creates a contact with a generated id.
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        relationship: impl Into<String>,
        is_primary: bool,
    ) -> Self {
        Self::with_id(RecordId::new(), name, phone, relationship, is_primary)
    }

    /// Creates a contact with a caller-provided id (import paths, tests).
    pub fn with_id(
        id: RecordId,
        name: impl Into<String>,
        phone: impl Into<String>,
        relationship: impl Into<String>,
        is_primary: bool,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            phone: phone.into(),
            relationship: relationship.into(),
            is_primary,
            created_at: Utc::now(),
        }
    }

    /// Validates display name and phone format.
    pub fn validate(&self) -> Result<(), ContactValidationError> {
        if self.name.trim().is_empty() {
            return Err(ContactValidationError::BlankName);
        }
        if !PHONE_RE.is_match(self.phone.trim()) {
            return Err(ContactValidationError::InvalidPhone(self.phone.clone()));
        }
        Ok(())
    }
}

/// Contact validation failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContactValidationError {
    BlankName,
    InvalidPhone(String),
}

impl Display for ContactValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankName => write!(f, "contact name must not be blank"),
            Self::InvalidPhone(value) => write!(f, "invalid phone number: `{value}`"),
        }
    }
}

impl Error for ContactValidationError {}
