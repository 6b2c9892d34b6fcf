//! Location use-case service.
//!
//! # Responsibility
//! - Bound the one-shot fix with a timeout and refuse stale cached fixes.
//! - Remember the last known position in memory and under USER_LOCATION.
//!
//! # Invariants
//! - A timed-out fetch is reported as `PositionError::Timeout`, never retried.
//! - Coordinates are logged only at `debug` level.

use super::{PositionError, PositionOptions, PositionProvider, PositionWatch};
use crate::model::position::Position;
use crate::store::{Storage, StorageKey};
use log::{debug, info, warn};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Instant;

pub struct LocationService {
    provider: Arc<dyn PositionProvider>,
    storage: Storage,
    one_shot: PositionOptions,
    watch: PositionOptions,
    last_known: Mutex<Option<Position>>,
}

impl LocationService {
    pub fn new(provider: Arc<dyn PositionProvider>, storage: Storage) -> Self {
        Self::with_options(
            provider,
            storage,
            PositionOptions::one_shot(),
            PositionOptions::watch(),
        )
    }

    pub fn with_options(
        provider: Arc<dyn PositionProvider>,
        storage: Storage,
        one_shot: PositionOptions,
        watch: PositionOptions,
    ) -> Self {
        Self {
            provider,
            storage,
            one_shot,
            watch,
            last_known: Mutex::new(None),
        }
    }

    /// Fetches one fresh fix within the configured timeout.
    pub async fn current_position(&self) -> Result<Position, PositionError> {
        let started_at = Instant::now();
        let fetch = self.provider.current_position(&self.one_shot);
        let result = match tokio::time::timeout(self.one_shot.timeout, fetch).await {
            Ok(result) => result,
            Err(_) => Err(PositionError::Timeout),
        };

        match result {
            Ok(position) => {
                info!(
                    "event=location_fix module=geo status=ok duration_ms={} accuracy_m={:.0}",
                    started_at.elapsed().as_millis(),
                    position.accuracy
                );
                debug!(
                    "event=location_fix module=geo lat={:.6} lon={:.6}",
                    position.latitude, position.longitude
                );
                self.remember(&position);
                self.storage.save_typed(StorageKey::UserLocation, &position);
                Ok(position)
            }
            Err(err) => {
                warn!(
                    "event=location_fix module=geo status=error duration_ms={} error={}",
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(err)
            }
        }
    }

    /// Starts a position subscription with watch options.
    pub fn watch_position(&self) -> Result<PositionWatch, PositionError> {
        let watch = self.provider.watch_position(&self.watch)?;
        info!(
            "event=watch_start module=geo status=ok watch_id={}",
            watch.id()
        );
        Ok(watch)
    }

    /// Updates the in-memory last known position.
    pub fn remember(&self, position: &Position) {
        *self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(position.clone());
    }

    /// Last known position: memory first, then the persisted copy.
    pub fn last_known_location(&self) -> Option<Position> {
        let cached = self
            .last_known
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        cached.or_else(|| self.storage.load_typed(StorageKey::UserLocation))
    }
}
