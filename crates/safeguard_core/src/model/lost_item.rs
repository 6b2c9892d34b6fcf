//! Lost item report model.

use crate::model::RecordId;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Recovery state of a reported item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LostItemStatus {
    Lost,
    Found,
    Recovered,
}

impl LostItemStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Lost => "lost",
            Self::Found => "found",
            Self::Recovered => "recovered",
        }
    }

    /// Parses the lowercase status name.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "lost" => Some(Self::Lost),
            "found" => Some(Self::Found),
            "recovered" => Some(Self::Recovered),
            _ => None,
        }
    }
}

/// One lost item report. Independent of emergency sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LostItem {
    pub id: RecordId,
    pub title: String,
    pub description: String,
    pub category: String,
    /// Free-form description of where the item was last seen.
    pub location: String,
    pub date_reported: NaiveDate,
    pub status: LostItemStatus,
    pub created_at: DateTime<Utc>,
}

impl LostItem {
    /// Creates a new report in `lost` state.
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        category: impl Into<String>,
        location: impl Into<String>,
        date_reported: NaiveDate,
    ) -> Self {
        Self {
            id: RecordId::new(),
            title: title.into(),
            description: description.into(),
            category: category.into(),
            location: location.into(),
            date_reported,
            status: LostItemStatus::Lost,
            created_at: Utc::now(),
        }
    }
}
