//! To-do use-case service.
//!
//! # Invariants
//! - Open tasks due within the reminder window have a pending reminder when
//!   a notifier is attached.
//! - Completing or removing a task cancels its reminder.

use crate::model::todo::{TaskPriority, TodoTask};
use crate::model::RecordId;
use crate::notify::Notifier;
use crate::repo::collection_repo::{CollectionRepository, RepoError};
use crate::store::Storage;
use chrono::{DateTime, Utc};
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum TodoServiceError {
    BlankTitle,
    TaskNotFound(RecordId),
    Repo(RepoError),
}

impl Display for TodoServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "task title must not be blank"),
            Self::TaskNotFound(id) => write!(f, "task not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TodoServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for TodoServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::TaskNotFound(id),
            other => Self::Repo(other),
        }
    }
}

pub struct TodoService {
    repo: CollectionRepository<TodoTask>,
    notifier: Option<Notifier>,
}

impl TodoService {
    /// Without a notifier no reminders are armed.
    pub fn new(storage: Storage, notifier: Option<Notifier>) -> Self {
        Self {
            repo: CollectionRepository::new(storage),
            notifier,
        }
    }

    /// Stores a new open task and arms its reminder.
    pub fn add_task(
        &self,
        title: &str,
        due_date: Option<DateTime<Utc>>,
        priority: TaskPriority,
    ) -> Result<TodoTask, TodoServiceError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(TodoServiceError::BlankTitle);
        }
        let task = TodoTask::new(title, due_date, priority);
        self.repo.insert(&task)?;
        let reminder = self.arm(&task);
        info!(
            "event=task_add module=service status=ok task_id={} reminder={}",
            task.id, reminder
        );
        Ok(task)
    }

    pub fn list_tasks(&self) -> Result<Vec<TodoTask>, TodoServiceError> {
        Ok(self.repo.list()?)
    }

    pub fn get_task(&self, id: RecordId) -> Result<Option<TodoTask>, TodoServiceError> {
        Ok(self.repo.get(id)?)
    }

    /// Marks a task done (cancelling its reminder) or reopens it.
    pub fn set_completed(
        &self,
        id: RecordId,
        completed: bool,
    ) -> Result<TodoTask, TodoServiceError> {
        let mut task = self
            .repo
            .get(id)?
            .ok_or(TodoServiceError::TaskNotFound(id))?;
        task.completed = completed;
        self.repo.replace(&task)?;
        self.rearm(&task);
        Ok(task)
    }

    /// Replaces a task wholesale and re-arms its reminder.
    pub fn update_task(&self, task: &TodoTask) -> Result<(), TodoServiceError> {
        if task.title.trim().is_empty() {
            return Err(TodoServiceError::BlankTitle);
        }
        self.repo.replace(task)?;
        self.rearm(task);
        Ok(())
    }

    pub fn remove_task(&self, id: RecordId) -> Result<TodoTask, TodoServiceError> {
        let removed = self.repo.remove(id)?;
        if let Some(notifier) = &self.notifier {
            notifier.cancel_reminder(id);
        }
        Ok(removed)
    }

    /// Arms reminders for every stored task, e.g. after a restart.
    ///
    /// Returns the number of reminders now pending.
    pub fn rearm_all(&self) -> Result<usize, TodoServiceError> {
        let tasks = self.repo.list()?;
        Ok(tasks.iter().filter(|task| self.arm(task)).count())
    }

    fn arm(&self, task: &TodoTask) -> bool {
        self.notifier
            .as_ref()
            .is_some_and(|notifier| notifier.schedule_reminder(task))
    }

    fn rearm(&self, task: &TodoTask) {
        if let Some(notifier) = &self.notifier {
            notifier.cancel_reminder(task.id);
            notifier.schedule_reminder(task);
        }
    }
}
