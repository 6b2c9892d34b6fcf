//! Emergency session record and its append-only event log.
//!
//! # Responsibility
//! - Capture one emergency-activation episode: position, alerted contacts and
//!   the ordered event log.
//!
//! # Invariants
//! - `events` is append-only; entries are never removed or reordered.
//! - `contacts_alerted` is fixed at creation.
//! - `location` is only replaced together with a `LOCATION_UPDATE` append.

use crate::model::position::Position;
use crate::model::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Session identifier derived from the activation time (epoch milliseconds).
pub type SessionId = i64;

/// Payload of one session event, tagged by event type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionEventData {
    LocationUpdate(Position),
    RecordingTick {
        /// Seconds elapsed since recording started.
        duration: u64,
    },
}

impl SessionEventData {
    /// Stable wire tag of this event type.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::LocationUpdate(_) => "LOCATION_UPDATE",
            Self::RecordingTick { .. } => "RECORDING_TICK",
        }
    }
}

/// One entry of the session event log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEvent {
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub data: SessionEventData,
}

/// Record of one emergency activation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmergencySession {
    pub id: SessionId,
    pub start_time: DateTime<Utc>,
    /// Latest known position, overwritten by tracking updates.
    pub location: Position,
    pub contacts_alerted: Vec<RecordId>,
    pub recording_active: bool,
    pub is_active: bool,
    events: Vec<SessionEvent>,
}

impl EmergencySession {
    /// Creates an active session with recording enabled and an empty log.
    pub fn new(
        id: SessionId,
        start_time: DateTime<Utc>,
        location: Position,
        contacts_alerted: Vec<RecordId>,
    ) -> Self {
        Self {
            id,
            start_time,
            location,
            contacts_alerted,
            recording_active: true,
            is_active: true,
            events: Vec::new(),
        }
    }

    /// Ordered event log.
    pub fn events(&self) -> &[SessionEvent] {
        &self.events
    }

    /// Replaces the current position and logs a `LOCATION_UPDATE`.
    pub fn record_location(&mut self, position: Position) {
        self.location = position.clone();
        self.push_event(SessionEventData::LocationUpdate(position));
    }

    /// Logs a `RECORDING_TICK` carrying elapsed seconds.
    pub fn record_tick(&mut self, elapsed_secs: u64) {
        self.push_event(SessionEventData::RecordingTick {
            duration: elapsed_secs,
        });
    }

    /// Marks the session as ended. The event log is left untouched.
    pub fn close(&mut self) {
        self.is_active = false;
        self.recording_active = false;
    }

    fn push_event(&mut self, data: SessionEventData) {
        self.events.push(SessionEvent {
            timestamp: Utc::now(),
            data,
        });
    }
}
