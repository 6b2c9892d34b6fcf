//! Composition root.
//!
//! # Responsibility
//! - Build every core service from a `CoreConfig` and injected platform
//!   capabilities (positions, outgoing alerts, notifications).
//!
//! # Invariants
//! - All services share one `Storage` and one `Notifier`.
//! - The session manager is owned here; there is no process-global session.

use crate::alert::AlertChannel;
use crate::config::CoreConfig;
use crate::emergency::EmergencyService;
use crate::geo::{LocationService, PositionProvider};
use crate::notify::{NotificationSink, Notifier};
use crate::service::contact_service::ContactService;
use crate::service::lost_item_service::LostItemService;
use crate::service::todo_service::TodoService;
use crate::store::{SqliteKeyValueStore, Storage, StoreError};
use log::info;
use std::sync::Arc;

/// Platform boundaries the core cannot provide itself.
#[derive(Clone)]
pub struct Capabilities {
    pub positions: Arc<dyn PositionProvider>,
    pub alerts: Arc<dyn AlertChannel>,
    pub notifications: Arc<dyn NotificationSink>,
}

pub struct SafeGuard {
    storage: Storage,
    location: Arc<LocationService>,
    notifier: Notifier,
    contacts: ContactService,
    lost_items: LostItemService,
    todos: TodoService,
    emergency: EmergencyService,
}

impl SafeGuard {
    /// Opens the configured store and wires all services.
    ///
    /// Uses SQLite at `config.db_path`, or an in-memory store when unset.
    pub fn open(config: &CoreConfig, capabilities: Capabilities) -> Result<Self, StoreError> {
        let storage = match config.db_path.as_deref() {
            Some(path) => Storage::new(Arc::new(SqliteKeyValueStore::open(path)?)),
            None => Storage::in_memory(),
        };
        Ok(Self::with_storage(config, storage, capabilities))
    }

    pub fn with_storage(config: &CoreConfig, storage: Storage, capabilities: Capabilities) -> Self {
        let location = Arc::new(LocationService::with_options(
            capabilities.positions,
            storage.clone(),
            config.one_shot_options(),
            config.watch_options(),
        ));
        let notifier =
            Notifier::with_reminder_window(capabilities.notifications, config.reminder_window());
        let emergency = EmergencyService::new(
            Arc::clone(&location),
            storage.clone(),
            capabilities.alerts,
            notifier.clone(),
            config.emergency_settings(),
        );

        info!(
            "event=app_wire module=app status=ok persistent={}",
            config.db_path.is_some()
        );

        Self {
            contacts: ContactService::new(storage.clone()),
            lost_items: LostItemService::new(storage.clone()),
            todos: TodoService::new(storage.clone(), Some(notifier.clone())),
            storage,
            location,
            notifier,
            emergency,
        }
    }

    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    pub fn location(&self) -> &LocationService {
        &self.location
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn contacts(&self) -> &ContactService {
        &self.contacts
    }

    pub fn lost_items(&self) -> &LostItemService {
        &self.lost_items
    }

    pub fn todos(&self) -> &TodoService {
        &self.todos
    }

    pub fn emergency(&self) -> &EmergencyService {
        &self.emergency
    }
}
