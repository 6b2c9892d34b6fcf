//! Record collection repository over the key-value store.
//!
//! # Responsibility
//! - Provide CRUD over the JSON arrays stored under CONTACTS, LOST_ITEMS and
//!   TODOS.
//! - Keep list order equal to insertion order.
//!
//! # Invariants
//! - Read paths reject malformed persisted state instead of masking it, so a
//!   write never silently clobbers unreadable data.
//! - Record ids are unique within one collection.

use crate::model::contact::Contact;
use crate::model::lost_item::LostItem;
use crate::model::todo::TodoTask;
use crate::model::RecordId;
use crate::store::{RecordState, Storage, StorageKey, StoreError};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::marker::PhantomData;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for collection reads and writes.
#[derive(Debug)]
pub enum RepoError {
    NotFound(RecordId),
    DuplicateId(RecordId),
    /// Stored collection exists but cannot be decoded.
    InvalidData { key: StorageKey, message: String },
    /// Backend refused the write or read.
    Store(StoreError),
    WriteFailed(StorageKey),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(id) => write!(f, "record not found: {id}"),
            Self::DuplicateId(id) => write!(f, "record id already exists: {id}"),
            Self::InvalidData { key, message } => {
                write!(f, "invalid persisted data under {key}: {message}")
            }
            Self::Store(err) => write!(f, "{err}"),
            Self::WriteFailed(key) => write!(f, "failed to persist {key}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Store(err) => Some(err),
            _ => None,
        }
    }
}

impl From<StoreError> for RepoError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

/// A record type stored as one element of a keyed JSON array.
pub trait CollectionRecord: Serialize + DeserializeOwned + Clone {
    const KEY: StorageKey;

    fn record_id(&self) -> RecordId;
}

impl CollectionRecord for Contact {
    const KEY: StorageKey = StorageKey::Contacts;

    fn record_id(&self) -> RecordId {
        self.id
    }
}

impl CollectionRecord for LostItem {
    const KEY: StorageKey = StorageKey::LostItems;

    fn record_id(&self) -> RecordId {
        self.id
    }
}

impl CollectionRecord for TodoTask {
    const KEY: StorageKey = StorageKey::Todos;

    fn record_id(&self) -> RecordId {
        self.id
    }
}

/// Repository for one record collection.
pub struct CollectionRepository<T: CollectionRecord> {
    storage: Storage,
    _record: PhantomData<fn() -> T>,
}

impl<T: CollectionRecord> CollectionRepository<T> {
    pub fn new(storage: Storage) -> Self {
        Self {
            storage,
            _record: PhantomData,
        }
    }

    /// Lists all records in insertion order. A missing slot is empty.
    pub fn list(&self) -> RepoResult<Vec<T>> {
        let value = match self.storage.load_record(T::KEY)? {
            RecordState::Absent => return Ok(Vec::new()),
            RecordState::Current(value) | RecordState::Legacy(value) => value,
            RecordState::Malformed(message) => {
                return Err(RepoError::InvalidData {
                    key: T::KEY,
                    message,
                })
            }
            RecordState::UnsupportedVersion(version) => {
                return Err(RepoError::InvalidData {
                    key: T::KEY,
                    message: format!("unsupported schema version {version}"),
                })
            }
        };

        serde_json::from_value(value).map_err(|err| RepoError::InvalidData {
            key: T::KEY,
            message: err.to_string(),
        })
    }

    pub fn get(&self, id: RecordId) -> RepoResult<Option<T>> {
        Ok(self
            .list()?
            .into_iter()
            .find(|record| record.record_id() == id))
    }

    /// Appends a new record.
    pub fn insert(&self, record: &T) -> RepoResult<()> {
        let mut records = self.list()?;
        if records.iter().any(|r| r.record_id() == record.record_id()) {
            return Err(RepoError::DuplicateId(record.record_id()));
        }
        records.push(record.clone());
        self.write_all(&records)
    }

    /// Replaces an existing record in place.
    pub fn replace(&self, record: &T) -> RepoResult<()> {
        let mut records = self.list()?;
        let slot = records
            .iter_mut()
            .find(|r| r.record_id() == record.record_id())
            .ok_or(RepoError::NotFound(record.record_id()))?;
        *slot = record.clone();
        self.write_all(&records)
    }

    /// Removes a record and returns it.
    pub fn remove(&self, id: RecordId) -> RepoResult<T> {
        let mut records = self.list()?;
        let index = records
            .iter()
            .position(|r| r.record_id() == id)
            .ok_or(RepoError::NotFound(id))?;
        let removed = records.remove(index);
        self.write_all(&records)?;
        Ok(removed)
    }

    /// Overwrites the whole collection.
    pub fn write_all(&self, records: &[T]) -> RepoResult<()> {
        if self.storage.save_typed(T::KEY, &records) {
            Ok(())
        } else {
            Err(RepoError::WriteFailed(T::KEY))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CollectionRepository, RepoError};
    use crate::model::todo::{TaskPriority, TodoTask};
    use crate::store::{KeyValueStore, MemoryKeyValueStore, Storage, StorageKey};
    use std::sync::Arc;

    fn task(title: &str) -> TodoTask {
        TodoTask::new(title, None, TaskPriority::Medium)
    }

    #[test]
    fn insert_replace_remove_keep_order() {
        let repo = CollectionRepository::<TodoTask>::new(Storage::in_memory());
        let first = task("first");
        let mut second = task("second");
        repo.insert(&first).unwrap();
        repo.insert(&second).unwrap();

        second.completed = true;
        repo.replace(&second).unwrap();

        let titles: Vec<_> = repo.list().unwrap().into_iter().map(|t| t.title).collect();
        assert_eq!(titles, vec!["first", "second"]);
        assert!(repo.get(second.id).unwrap().unwrap().completed);

        let removed = repo.remove(first.id).unwrap();
        assert_eq!(removed.id, first.id);
        assert_eq!(repo.list().unwrap().len(), 1);
    }

    #[test]
    fn rejects_duplicates_and_missing_ids() {
        let repo = CollectionRepository::<TodoTask>::new(Storage::in_memory());
        let record = task("only");
        repo.insert(&record).unwrap();

        assert!(matches!(
            repo.insert(&record),
            Err(RepoError::DuplicateId(id)) if id == record.id
        ));

        let missing = task("missing");
        assert!(matches!(repo.replace(&missing), Err(RepoError::NotFound(_))));
        assert!(matches!(repo.remove(missing.id), Err(RepoError::NotFound(_))));
    }

    #[test]
    fn malformed_collection_is_reported_and_not_overwritten() {
        let backend = Arc::new(MemoryKeyValueStore::new());
        backend.put_raw(StorageKey::Todos, "[{broken").unwrap();
        let repo = CollectionRepository::<TodoTask>::new(Storage::new(backend.clone()));

        assert!(matches!(
            repo.insert(&task("new")),
            Err(RepoError::InvalidData { key: StorageKey::Todos, .. })
        ));
        assert_eq!(
            backend.get_raw(StorageKey::Todos).unwrap().as_deref(),
            Some("[{broken")
        );
    }
}
