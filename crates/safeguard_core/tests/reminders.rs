use chrono::{Duration as ChronoDuration, Utc};
use safeguard_core::service::todo_service::TodoService;
use safeguard_core::{MemoryNotificationSink, Notifier, PermissionState, Storage, TaskPriority};
use std::sync::Arc;
use std::time::Duration;

const HOUR: Duration = Duration::from_secs(60 * 60);

fn notifier(answer: PermissionState) -> (Notifier, Arc<MemoryNotificationSink>) {
    let sink = Arc::new(MemoryNotificationSink::new(answer));
    let notifier = Notifier::new(sink.clone());
    notifier.request_permission();
    (notifier, sink)
}

#[tokio::test(start_paused = true)]
async fn task_due_soon_fires_one_reminder_and_unregisters() {
    let (notifier, sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));

    let task = todos
        .add_task(
            "Pay rent",
            Some(Utc::now() + ChronoDuration::hours(2)),
            TaskPriority::High,
        )
        .unwrap();
    assert!(notifier.has_pending_reminder(task.id));

    tokio::time::sleep(HOUR).await;
    assert!(sink.shown().is_empty());

    tokio::time::sleep(HOUR + Duration::from_secs(1)).await;
    let shown = sink.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Task Reminder");
    assert_eq!(shown[0].body, "Due soon: Pay rent");
    assert_eq!(shown[0].options.tag, format!("task-{}", task.id));
    assert!(shown[0].options.require_interaction);
    assert!(!notifier.has_pending_reminder(task.id));
}

#[tokio::test(start_paused = true)]
async fn tasks_outside_the_window_are_not_armed() {
    let (notifier, sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));

    let far = todos
        .add_task(
            "Renew passport",
            Some(Utc::now() + ChronoDuration::hours(48)),
            TaskPriority::Medium,
        )
        .unwrap();
    let overdue = todos
        .add_task(
            "Return library book",
            Some(Utc::now() - ChronoDuration::hours(1)),
            TaskPriority::Low,
        )
        .unwrap();
    let undated = todos.add_task("Buy milk", None, TaskPriority::Low).unwrap();

    assert!(!notifier.has_pending_reminder(far.id));
    assert!(!notifier.has_pending_reminder(overdue.id));
    assert!(!notifier.has_pending_reminder(undated.id));
    assert_eq!(notifier.pending_reminder_count(), 0);

    tokio::time::sleep(HOUR * 50).await;
    assert!(sink.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn completing_a_task_cancels_its_reminder() {
    let (notifier, sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));
    let task = todos
        .add_task(
            "Call the bank",
            Some(Utc::now() + ChronoDuration::hours(1)),
            TaskPriority::Medium,
        )
        .unwrap();

    let done = todos.set_completed(task.id, true).unwrap();
    assert!(done.completed);
    assert!(!notifier.has_pending_reminder(task.id));

    tokio::time::sleep(HOUR * 2).await;
    assert!(sink.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn rescheduling_replaces_the_pending_reminder() {
    let (notifier, sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));
    let mut task = todos
        .add_task(
            "Pick up prescription",
            Some(Utc::now() + ChronoDuration::hours(1)),
            TaskPriority::High,
        )
        .unwrap();

    task.due_date = Some(Utc::now() + ChronoDuration::hours(3));
    todos.update_task(&task).unwrap();
    assert!(notifier.schedule_reminder(&task));
    assert_eq!(notifier.pending_reminder_count(), 1);

    tokio::time::sleep(HOUR * 2).await;
    assert!(sink.shown().is_empty());

    tokio::time::sleep(HOUR * 2).await;
    assert_eq!(sink.shown().len(), 1);
    assert_eq!(notifier.pending_reminder_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn removing_a_task_cancels_its_reminder() {
    let (notifier, sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));
    let task = todos
        .add_task(
            "Water plants",
            Some(Utc::now() + ChronoDuration::minutes(30)),
            TaskPriority::Low,
        )
        .unwrap();

    todos.remove_task(task.id).unwrap();
    assert!(!notifier.cancel_reminder(task.id));

    tokio::time::sleep(HOUR).await;
    assert!(sink.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn denied_permission_swallows_reminder_delivery() {
    let (notifier, sink) = notifier(PermissionState::Denied);
    assert_eq!(notifier.permission(), PermissionState::Denied);
    let todos = TodoService::new(Storage::in_memory(), Some(notifier.clone()));
    let task = todos
        .add_task(
            "Check smoke alarm",
            Some(Utc::now() + ChronoDuration::minutes(10)),
            TaskPriority::Medium,
        )
        .unwrap();
    assert!(notifier.has_pending_reminder(task.id));

    tokio::time::sleep(HOUR).await;
    assert!(sink.shown().is_empty());
    assert!(!notifier.has_pending_reminder(task.id));
}

#[tokio::test(start_paused = true)]
async fn rearm_all_restores_reminders_after_restart() {
    let storage = Storage::in_memory();
    {
        let todos = TodoService::new(storage.clone(), None);
        todos
            .add_task(
                "Soon",
                Some(Utc::now() + ChronoDuration::hours(5)),
                TaskPriority::High,
            )
            .unwrap();
        todos
            .add_task(
                "Later",
                Some(Utc::now() + ChronoDuration::days(3)),
                TaskPriority::Low,
            )
            .unwrap();
        let done = todos
            .add_task(
                "Done already",
                Some(Utc::now() + ChronoDuration::hours(1)),
                TaskPriority::Low,
            )
            .unwrap();
        todos.set_completed(done.id, true).unwrap();
    }

    let (notifier, _sink) = notifier(PermissionState::Granted);
    let todos = TodoService::new(storage, Some(notifier.clone()));
    assert_eq!(todos.rearm_all().unwrap(), 1);
    assert_eq!(notifier.pending_reminder_count(), 1);
}
