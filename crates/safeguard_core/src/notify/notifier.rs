//! Permission-gated notifier with per-task reminder timers.

use super::{Notification, NotificationOptions, NotificationSink, NotifyError, PermissionState};
use crate::model::todo::TodoTask;
use crate::model::RecordId;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;

/// Reminders are armed only for tasks due within this window.
pub const DEFAULT_REMINDER_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

struct PendingReminder {
    generation: u64,
    handle: JoinHandle<()>,
}

struct NotifierInner {
    sink: Arc<dyn NotificationSink>,
    permission: Mutex<PermissionState>,
    reminders: Mutex<HashMap<RecordId, PendingReminder>>,
    reminder_window: Duration,
    next_generation: AtomicU64,
}

impl NotifierInner {
    fn reminders(&self) -> MutexGuard<'_, HashMap<RecordId, PendingReminder>> {
        self.reminders.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn permission(&self) -> PermissionState {
        *self.permission.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn notify(&self, notification: Notification) -> Result<(), NotifyError> {
        let permission = self.permission();
        if permission != PermissionState::Granted {
            warn!(
                "event=notification_show module=notify status=skipped reason=permission_{} tag={}",
                permission.as_str(),
                notification.options.tag
            );
            return Err(NotifyError::PermissionDenied(permission));
        }

        self.sink.show(&notification).map_err(|reason| {
            warn!(
                "event=notification_show module=notify status=error tag={} error={}",
                notification.options.tag, reason
            );
            NotifyError::Delivery(reason)
        })
    }

    fn fire_reminder(&self, task_id: RecordId, generation: u64, title: &str) {
        {
            let mut reminders = self.reminders();
            match reminders.get(&task_id) {
                Some(pending) if pending.generation == generation => {
                    reminders.remove(&task_id);
                }
                _ => return,
            }
        }

        info!("event=reminder_fire module=notify status=ok task_id={task_id}");
        let _ = self.notify(Notification {
            title: "Task Reminder".to_string(),
            body: format!("Due soon: {title}"),
            options: NotificationOptions::task_reminder(format!("task-{task_id}")),
        });
    }
}

impl Drop for NotifierInner {
    fn drop(&mut self) {
        let reminders = self
            .reminders
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner);
        for (_, pending) in reminders.drain() {
            pending.handle.abort();
        }
    }
}

/// Cloneable notifier handle. Clones share permission and reminders.
#[derive(Clone)]
pub struct Notifier {
    inner: Arc<NotifierInner>,
}

impl Notifier {
    /// Creates a notifier in `Default` permission state.
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self::with_reminder_window(sink, DEFAULT_REMINDER_WINDOW)
    }

    pub fn with_reminder_window(sink: Arc<dyn NotificationSink>, reminder_window: Duration) -> Self {
        Self {
            inner: Arc::new(NotifierInner {
                sink,
                permission: Mutex::new(PermissionState::Default),
                reminders: Mutex::new(HashMap::new()),
                reminder_window,
                next_generation: AtomicU64::new(1),
            }),
        }
    }

    pub fn permission(&self) -> PermissionState {
        self.inner.permission()
    }

    /// Prompts through the sink while still `Default`; otherwise returns the
    /// remembered answer.
    pub fn request_permission(&self) -> PermissionState {
        let mut permission = self
            .inner
            .permission
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if *permission == PermissionState::Default {
            *permission = self.inner.sink.request_permission();
            info!(
                "event=notification_permission module=notify status=ok state={}",
                permission.as_str()
            );
        }
        *permission
    }

    /// Shows a notification. Without permission nothing is delivered and
    /// `NotifyError::PermissionDenied` is returned for the caller to ignore.
    pub fn notify(
        &self,
        title: impl Into<String>,
        body: impl Into<String>,
        options: NotificationOptions,
    ) -> Result<(), NotifyError> {
        self.inner.notify(Notification {
            title: title.into(),
            body: body.into(),
            options,
        })
    }

    /// Critical alert with emergency presentation hints.
    pub fn send_emergency_notification(&self, message: impl Into<String>) -> Result<(), NotifyError> {
        self.notify("EMERGENCY ALERT", message, NotificationOptions::emergency())
    }

    /// Arms a reminder if `task` is due within the reminder window.
    ///
    /// Returns whether a reminder is now pending for the task.
    pub fn schedule_reminder(&self, task: &TodoTask) -> bool {
        self.schedule_reminder_at(task, Utc::now())
    }

    /// Same as `schedule_reminder` with an explicit notion of "now".
    ///
    /// # Contract
    /// - No-op for tasks without a due date, completed tasks, and tasks due
    ///   in the past or at/after `now + window`.
    /// - Replaces any reminder already pending for the same task.
    /// - Requires a Tokio runtime; without one the reminder is not armed.
    pub fn schedule_reminder_at(&self, task: &TodoTask, now: DateTime<Utc>) -> bool {
        let Some(due) = task.due_date else {
            return false;
        };
        if task.completed {
            return false;
        }
        let Ok(delay) = (due - now).to_std() else {
            return false;
        };
        if delay.is_zero() || delay >= self.inner.reminder_window {
            debug!(
                "event=reminder_schedule module=notify status=skipped task_id={} reason=outside_window",
                task.id
            );
            return false;
        }
        let Ok(runtime) = Handle::try_current() else {
            warn!(
                "event=reminder_schedule module=notify status=error task_id={} error_code=no_runtime",
                task.id
            );
            return false;
        };

        let generation = self.inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let weak: Weak<NotifierInner> = Arc::downgrade(&self.inner);
        let task_id = task.id;
        let title = task.title.clone();

        // Registration happens under the lock so the timer cannot fire first.
        let mut reminders = self.inner.reminders();
        let handle = runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(inner) = weak.upgrade() {
                inner.fire_reminder(task_id, generation, &title);
            }
        });
        if let Some(previous) = reminders.insert(task_id, PendingReminder { generation, handle }) {
            previous.handle.abort();
        }
        drop(reminders);
        info!(
            "event=reminder_schedule module=notify status=ok task_id={} delay_s={}",
            task_id,
            delay.as_secs()
        );
        true
    }

    /// Cancels a pending reminder. Returns whether one was pending.
    pub fn cancel_reminder(&self, task_id: RecordId) -> bool {
        match self.inner.reminders().remove(&task_id) {
            Some(pending) => {
                pending.handle.abort();
                info!("event=reminder_cancel module=notify status=ok task_id={task_id}");
                true
            }
            None => false,
        }
    }

    pub fn has_pending_reminder(&self, task_id: RecordId) -> bool {
        self.inner.reminders().contains_key(&task_id)
    }

    pub fn pending_reminder_count(&self) -> usize {
        self.inner.reminders().len()
    }
}
