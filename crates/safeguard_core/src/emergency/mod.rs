//! Emergency session management.
//!
//! # Responsibility
//! - Own the lifecycle of at most one active emergency session.
//! - Orchestrate position acquisition, tracking, contact alerts and the
//!   recording stand-in.
//!
//! # Invariants
//! - At most one session is active per `EmergencyService`.
//! - Activation while a session is active is rejected with `AlreadyActive`.
//! - After `deactivate` returns, no background task mutates or persists the
//!   ended session.

use crate::alert::DEFAULT_MAP_URL_BASE;
use crate::geo::PositionError;
use crate::model::session::SessionId;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

mod service;
mod workers;

pub use service::EmergencyService;

/// Activation failures surfaced to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EmergencyError {
    /// Position provider unsupported, denied or timed out.
    LocationUnavailable(PositionError),
    AlreadyActive { session_id: SessionId },
}

impl Display for EmergencyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::LocationUnavailable(err) => {
                write!(f, "emergency activation failed: {err}")
            }
            Self::AlreadyActive { session_id } => {
                write!(f, "emergency session {session_id} is already active")
            }
        }
    }
}

impl Error for EmergencyError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::LocationUnavailable(err) => Some(err),
            Self::AlreadyActive { .. } => None,
        }
    }
}

/// Tunables for the session manager.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencySettings {
    /// Period of the recording tick. Tick durations are reported in whole
    /// seconds, so sub-second periods are rejected by `CoreConfig::validate`.
    pub recording_interval: Duration,
    pub map_url_base: String,
}

impl Default for EmergencySettings {
    fn default() -> Self {
        Self {
            recording_interval: Duration::from_secs(1),
            map_url_base: DEFAULT_MAP_URL_BASE.to_string(),
        }
    }
}
