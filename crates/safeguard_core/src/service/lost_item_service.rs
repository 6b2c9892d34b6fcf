//! Lost and found use-case service.

use crate::model::lost_item::{LostItem, LostItemStatus};
use crate::model::RecordId;
use crate::repo::collection_repo::{CollectionRepository, RepoError};
use crate::store::Storage;
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum LostItemServiceError {
    BlankTitle,
    ItemNotFound(RecordId),
    Repo(RepoError),
}

impl Display for LostItemServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "lost item title must not be blank"),
            Self::ItemNotFound(id) => write!(f, "lost item not found: {id}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for LostItemServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for LostItemServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound(id) => Self::ItemNotFound(id),
            other => Self::Repo(other),
        }
    }
}

/// Input for reporting an item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LostItemReport {
    pub title: String,
    pub description: String,
    pub category: String,
    pub location: String,
    pub date_reported: NaiveDate,
}

pub struct LostItemService {
    repo: CollectionRepository<LostItem>,
}

impl LostItemService {
    pub fn new(storage: Storage) -> Self {
        Self {
            repo: CollectionRepository::new(storage),
        }
    }

    /// Stores a new report in `lost` state.
    pub fn report_item(&self, report: LostItemReport) -> Result<LostItem, LostItemServiceError> {
        let title = report.title.trim();
        if title.is_empty() {
            return Err(LostItemServiceError::BlankTitle);
        }
        let item = LostItem::new(
            title,
            report.description.trim(),
            report.category.trim(),
            report.location.trim(),
            report.date_reported,
        );
        self.repo.insert(&item)?;
        info!("event=lost_item_report module=service status=ok item_id={}", item.id);
        Ok(item)
    }

    /// Lists reports, optionally restricted to one status.
    pub fn list_items(
        &self,
        status: Option<LostItemStatus>,
    ) -> Result<Vec<LostItem>, LostItemServiceError> {
        let items = self.repo.list()?;
        Ok(match status {
            Some(status) => items.into_iter().filter(|item| item.status == status).collect(),
            None => items,
        })
    }

    pub fn update_status(
        &self,
        id: RecordId,
        status: LostItemStatus,
    ) -> Result<LostItem, LostItemServiceError> {
        let mut item = self
            .repo
            .get(id)?
            .ok_or(LostItemServiceError::ItemNotFound(id))?;
        item.status = status;
        self.repo.replace(&item)?;
        info!(
            "event=lost_item_status module=service status=ok item_id={} item_status={}",
            id,
            status.as_str()
        );
        Ok(item)
    }

    pub fn remove_item(&self, id: RecordId) -> Result<LostItem, LostItemServiceError> {
        Ok(self.repo.remove(id)?)
    }
}
