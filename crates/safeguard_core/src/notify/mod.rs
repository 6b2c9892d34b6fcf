//! Local notification capability and task reminders.
//!
//! # Responsibility
//! - Gate notification delivery on the user-granted permission.
//! - Arm, replace and cancel one-shot task reminders.
//!
//! # Invariants
//! - Nothing reaches the platform sink unless permission is `Granted`.
//! - At most one pending reminder exists per task id.
//! - Notification failures never propagate into emergency workflows.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod notifier;
mod sink;

pub use notifier::{Notifier, DEFAULT_REMINDER_WINDOW};
pub use sink::{LogNotificationSink, MemoryNotificationSink};

/// Notification permission as reported by the platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionState {
    Granted,
    Denied,
    /// The user has not been asked yet.
    Default,
}

impl PermissionState {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Granted => "granted",
            Self::Denied => "denied",
            Self::Default => "default",
        }
    }
}

/// Presentation hints for one notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationOptions {
    /// Notifications sharing a tag replace each other.
    pub tag: String,
    pub icon: String,
    pub require_interaction: bool,
    /// Vibration pattern in milliseconds.
    pub vibrate: Vec<u32>,
}

impl Default for NotificationOptions {
    fn default() -> Self {
        Self {
            tag: "safeguard-notification".to_string(),
            icon: "/app-icon.png".to_string(),
            require_interaction: false,
            vibrate: vec![200, 100, 200],
        }
    }
}

impl NotificationOptions {
    pub fn emergency() -> Self {
        Self {
            tag: "emergency-alert".to_string(),
            icon: "/emergency-icon.png".to_string(),
            require_interaction: true,
            vibrate: vec![500, 250, 500, 250, 500],
        }
    }

    pub fn task_reminder(tag: String) -> Self {
        Self {
            tag,
            require_interaction: true,
            vibrate: vec![300, 200, 300],
            ..Self::default()
        }
    }
}

/// Fully resolved notification handed to a sink.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub body: String,
    pub options: NotificationOptions,
}

/// Platform notification surface.
pub trait NotificationSink: Send + Sync {
    /// Prompts the user. Only called while permission is `Default`.
    fn request_permission(&self) -> PermissionState;
    fn show(&self, notification: &Notification) -> Result<(), String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    PermissionDenied(PermissionState),
    Delivery(String),
}

impl Display for NotifyError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionDenied(state) => {
                write!(f, "notification permission not granted (state={})", state.as_str())
            }
            Self::Delivery(reason) => write!(f, "notification delivery failed: {reason}"),
        }
    }
}

impl Error for NotifyError {}
