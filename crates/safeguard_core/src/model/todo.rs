//! To-do task model.

use crate::model::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Task priority bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskPriority {
    Low,
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "low" => Some(Self::Low),
            "medium" => Some(Self::Medium),
            "high" => Some(Self::High),
            _ => None,
        }
    }
}

/// Simple to-do entry with an optional due time.
///
/// A task has at most one pending reminder, keyed by `id`, in the notifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TodoTask {
    pub id: RecordId,
    pub title: String,
    pub due_date: Option<DateTime<Utc>>,
    pub priority: TaskPriority,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

impl TodoTask {
    pub fn new(
        title: impl Into<String>,
        due_date: Option<DateTime<Utc>>,
        priority: TaskPriority,
    ) -> Self {
        Self {
            id: RecordId::new(),
            title: title.into(),
            due_date,
            priority,
            completed: false,
            created_at: Utc::now(),
        }
    }
}
