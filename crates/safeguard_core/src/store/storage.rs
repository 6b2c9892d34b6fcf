//! Storage facade used by services and the session manager.

use super::record::{decode, encode, RecordState};
use super::{KeyValueStore, MemoryKeyValueStore, StorageKey, StoreResult};
use log::{debug, error, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Logical-name → value dump produced by `export_all`.
pub type ExportMap = BTreeMap<String, Value>;

/// Cheaply cloneable handle over one key-value backend.
#[derive(Clone)]
pub struct Storage {
    backend: Arc<dyn KeyValueStore>,
}

impl Storage {
    pub fn new(backend: Arc<dyn KeyValueStore>) -> Self {
        Self { backend }
    }

    /// Storage over a fresh process-local backend.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryKeyValueStore::new()))
    }

    /// Writes `value` under `key`. Returns `false` on any failure.
    pub fn save(&self, key: StorageKey, value: &Value) -> bool {
        match self.try_save(key, value) {
            Ok(()) => {
                debug!("event=storage_save module=store status=ok key={key}");
                true
            }
            Err(err) => {
                error!("event=storage_save module=store status=error key={key} error={err}");
                false
            }
        }
    }

    /// Serializes and writes a typed value.
    pub fn save_typed<T: Serialize>(&self, key: StorageKey, value: &T) -> bool {
        match serde_json::to_value(value) {
            Ok(value) => self.save(key, &value),
            Err(err) => {
                error!(
                    "event=storage_save module=store status=error key={key} error_code=serialize_failed error={err}"
                );
                false
            }
        }
    }

    /// Reads a usable value. Absent, malformed and unsupported records all
    /// yield `None`.
    pub fn load(&self, key: StorageKey) -> Option<Value> {
        match self.load_record(key) {
            Ok(RecordState::Malformed(reason)) => {
                warn!("event=storage_load module=store status=malformed key={key} reason={reason}");
                None
            }
            Ok(RecordState::UnsupportedVersion(version)) => {
                warn!(
                    "event=storage_load module=store status=unsupported_version key={key} version={version}"
                );
                None
            }
            Ok(state) => state.into_value(),
            Err(err) => {
                error!("event=storage_load module=store status=error key={key} error={err}");
                None
            }
        }
    }

    /// Reads and deserializes a typed value, degrading to `None`.
    pub fn load_typed<T: DeserializeOwned>(&self, key: StorageKey) -> Option<T> {
        let value = self.load(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(err) => {
                warn!(
                    "event=storage_load module=store status=malformed key={key} error_code=shape_mismatch error={err}"
                );
                None
            }
        }
    }

    /// Reads the raw slot state without collapsing failures.
    pub fn load_record(&self, key: StorageKey) -> StoreResult<RecordState> {
        let raw = self.backend.get_raw(key)?;
        Ok(decode(raw.as_deref()))
    }

    /// Deletes `key`. Removing a missing key succeeds.
    pub fn remove(&self, key: StorageKey) -> bool {
        match self.backend.delete_raw(key) {
            Ok(existed) => {
                debug!("event=storage_remove module=store status=ok key={key} existed={existed}");
                true
            }
            Err(err) => {
                error!("event=storage_remove module=store status=error key={key} error={err}");
                false
            }
        }
    }

    /// Deletes every application key.
    pub fn clear_all(&self) -> bool {
        let mut all_ok = true;
        for key in StorageKey::ALL {
            all_ok &= self.remove(key);
        }
        all_ok
    }

    /// Dumps every key; absent or unreadable slots map to `null`.
    pub fn export_all(&self) -> ExportMap {
        StorageKey::ALL
            .into_iter()
            .map(|key| {
                (
                    key.logical_name().to_string(),
                    self.load(key).unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// Writes every known, non-null entry of `data`.
    ///
    /// Unknown logical names are skipped. Returns `false` if any write failed.
    pub fn import_all(&self, data: &ExportMap) -> bool {
        let mut all_ok = true;
        for (name, value) in data {
            let Some(key) = StorageKey::from_logical_name(name) else {
                warn!("event=storage_import module=store status=skipped name={name} reason=unknown_key");
                continue;
            };
            if value.is_null() {
                continue;
            }
            all_ok &= self.save(key, value);
        }
        all_ok
    }

    fn try_save(&self, key: StorageKey, value: &Value) -> StoreResult<()> {
        let raw = encode(value)?;
        self.backend.put_raw(key, &raw)
    }
}
