//! Key-value persistence for application records.
//!
//! # Responsibility
//! - Map fixed logical keys to stable storage key strings.
//! - Provide raw string backends (SQLite, in-memory) behind one trait.
//! - Wrap values in a versioned envelope so malformed or legacy data is
//!   distinguishable from absence.
//!
//! # Invariants
//! - Only the keys listed in `StorageKey::ALL` are ever written.
//! - The `Storage` facade never surfaces backend failures; they are logged
//!   and degraded to `false` / `None`.

use crate::db::DbError;
use std::error::Error;
use std::fmt::{Display, Formatter};

mod memory;
mod record;
mod sqlite;
mod storage;

pub use memory::MemoryKeyValueStore;
pub use record::{RecordState, CURRENT_SCHEMA_VERSION};
pub use sqlite::SqliteKeyValueStore;
pub use storage::{ExportMap, Storage};

pub type StoreResult<T> = Result<T, StoreError>;

/// Logical record slots known to the application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum StorageKey {
    Contacts,
    LostItems,
    Todos,
    UserLocation,
    EmergencySession,
    UserPreferences,
}

impl StorageKey {
    pub const ALL: [StorageKey; 6] = [
        Self::Contacts,
        Self::LostItems,
        Self::Todos,
        Self::UserLocation,
        Self::EmergencySession,
        Self::UserPreferences,
    ];

    /// Backend key string.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Contacts => "safeguard_emergency_contacts",
            Self::LostItems => "safeguard_lost_items",
            Self::Todos => "safeguard_todo_tasks",
            Self::UserLocation => "safeguard_user_location",
            Self::EmergencySession => "safeguard_emergency_session",
            Self::UserPreferences => "safeguard_user_preferences",
        }
    }

    /// Name used in export/import mappings.
    pub fn logical_name(self) -> &'static str {
        match self {
            Self::Contacts => "CONTACTS",
            Self::LostItems => "LOST_ITEMS",
            Self::Todos => "TODOS",
            Self::UserLocation => "USER_LOCATION",
            Self::EmergencySession => "EMERGENCY_SESSION",
            Self::UserPreferences => "USER_PREFERENCES",
        }
    }

    pub fn from_logical_name(value: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|key| key.logical_name() == value)
    }
}

impl Display for StorageKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.logical_name())
    }
}

/// Raw string storage backend.
///
/// Implementations must be safe to share between the session manager's
/// background tasks.
pub trait KeyValueStore: Send + Sync {
    fn get_raw(&self, key: StorageKey) -> StoreResult<Option<String>>;
    fn put_raw(&self, key: StorageKey, value: &str) -> StoreResult<()>;
    /// Returns whether a value was present.
    fn delete_raw(&self, key: StorageKey) -> StoreResult<bool>;
}

/// Backend or serialization failure.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialize(serde_json::Error),
    /// A lock guarding the backend was poisoned by a panicking writer.
    Poisoned,
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialize(err) => write!(f, "failed to serialize record: {err}"),
            Self::Poisoned => write!(f, "storage backend lock poisoned"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialize(err) => Some(err),
            Self::Poisoned => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialize(value)
    }
}
