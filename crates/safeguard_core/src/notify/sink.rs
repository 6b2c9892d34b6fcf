use super::{Notification, NotificationSink, PermissionState};
use log::info;
use std::sync::{Mutex, PoisonError};

/// Sink that writes notifications to the log. Always grants permission.
#[derive(Debug, Default)]
pub struct LogNotificationSink;

impl NotificationSink for LogNotificationSink {
    fn request_permission(&self) -> PermissionState {
        PermissionState::Granted
    }

    fn show(&self, notification: &Notification) -> Result<(), String> {
        info!(
            "event=notification_show module=notify status=ok tag={} title={}",
            notification.options.tag, notification.title
        );
        Ok(())
    }
}

/// Sink that records notifications in memory with a fixed permission answer.
#[derive(Debug)]
pub struct MemoryNotificationSink {
    answer: PermissionState,
    shown: Mutex<Vec<Notification>>,
}

impl MemoryNotificationSink {
    /// `answer` is returned whenever the user is prompted.
    pub fn new(answer: PermissionState) -> Self {
        Self {
            answer,
            shown: Mutex::new(Vec::new()),
        }
    }

    /// Snapshot of everything shown so far.
    pub fn shown(&self) -> Vec<Notification> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl NotificationSink for MemoryNotificationSink {
    fn request_permission(&self) -> PermissionState {
        self.answer
    }

    fn show(&self, notification: &Notification) -> Result<(), String> {
        self.shown
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(notification.clone());
        Ok(())
    }
}
