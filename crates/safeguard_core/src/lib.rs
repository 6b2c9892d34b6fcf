//! Core domain logic for SafeGuard.
//! This crate owns the emergency session lifecycle and every persisted record.

pub mod alert;
pub mod app;
pub mod config;
pub mod db;
pub mod emergency;
pub mod geo;
pub mod logging;
pub mod model;
pub mod notify;
pub mod repo;
pub mod service;
pub mod store;

pub use alert::{AlertChannel, AlertKind, AlertMessage, SimulatedSmsChannel};
pub use app::{Capabilities, SafeGuard};
pub use config::{ConfigError, CoreConfig};
pub use emergency::{EmergencyError, EmergencyService, EmergencySettings};
pub use geo::{
    calculate_distance, map_url, LocationService, PositionError, PositionOptions,
    PositionProvider, PositionWatch, SimulatedPositionProvider,
};
pub use logging::{default_log_level, init_from_config, init_logging, logging_status};
pub use model::contact::{Contact, ContactValidationError};
pub use model::lost_item::{LostItem, LostItemStatus};
pub use model::position::Position;
pub use model::session::{EmergencySession, SessionEvent, SessionEventData, SessionId};
pub use model::todo::{TaskPriority, TodoTask};
pub use model::{ParseRecordIdError, RecordId};
pub use notify::{
    LogNotificationSink, MemoryNotificationSink, Notification, NotificationOptions,
    NotificationSink, Notifier, NotifyError, PermissionState,
};
pub use repo::collection_repo::{RepoError, RepoResult};
pub use store::{ExportMap, RecordState, Storage, StorageKey, StoreError};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
