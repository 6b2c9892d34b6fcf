//! Device location capability.
//!
//! # Responsibility
//! - Define the position provider contract (one-shot fix and subscription).
//! - Provide map-link and distance helpers.
//!
//! # Invariants
//! - A `PositionWatch` delivers positions in provider order.
//! - Once a watch is stopped or dropped, no further positions are delivered
//!   through it.

use crate::model::position::{haversine_km, Position};
use async_trait::async_trait;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

mod location_service;
mod simulated;

pub use location_service::LocationService;
pub use simulated::SimulatedPositionProvider;

/// Map service used for location links unless configured otherwise.
pub const DEFAULT_MAP_URL_BASE: &str = "https://www.google.com/maps";

/// Location acquisition failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PositionError {
    /// The platform has no location capability.
    Unsupported,
    PermissionDenied,
    Timeout,
    Unavailable(String),
}

impl Display for PositionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unsupported => write!(f, "geolocation is not supported on this device"),
            Self::PermissionDenied => write!(f, "location permission denied"),
            Self::Timeout => write!(f, "timed out waiting for a location fix"),
            Self::Unavailable(reason) => write!(f, "location unavailable: {reason}"),
        }
    }
}

impl Error for PositionError {}

/// Acquisition options passed to providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    /// Upper bound on waiting for a fix.
    pub timeout: Duration,
    /// Oldest cached fix the provider may return. Zero forces a fresh fix.
    pub maximum_age: Duration,
}

impl PositionOptions {
    /// One-shot defaults: 10 s wait, never reuse a cached fix.
    pub fn one_shot() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(10),
            maximum_age: Duration::ZERO,
        }
    }

    /// Subscription defaults: 5 s per fix, cached fixes up to 10 s old.
    pub fn watch() -> Self {
        Self {
            high_accuracy: true,
            timeout: Duration::from_secs(5),
            maximum_age: Duration::from_secs(10),
        }
    }
}

/// Platform location capability.
#[async_trait]
pub trait PositionProvider: Send + Sync {
    /// Resolves one fresh fix.
    async fn current_position(&self, options: &PositionOptions) -> Result<Position, PositionError>;

    /// Starts a subscription to position changes.
    fn watch_position(&self, options: &PositionOptions) -> Result<PositionWatch, PositionError>;
}

/// Subscription handle returned by `PositionProvider::watch_position`.
#[derive(Debug)]
pub struct PositionWatch {
    id: u64,
    updates: mpsc::UnboundedReceiver<Position>,
    cancel: CancellationToken,
}

/// Provider-side end of a watch.
#[derive(Debug, Clone)]
pub struct WatchFeed {
    id: u64,
    sender: mpsc::UnboundedSender<Position>,
    cancel: CancellationToken,
}

impl PositionWatch {
    /// Creates a connected watch/feed pair.
    pub fn channel(id: u64) -> (PositionWatch, WatchFeed) {
        let (sender, updates) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        (
            PositionWatch {
                id,
                updates,
                cancel: cancel.clone(),
            },
            WatchFeed { id, sender, cancel },
        )
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Waits for the next position. Returns `None` once stopped or when the
    /// provider closes the feed.
    pub async fn next(&mut self) -> Option<Position> {
        if self.cancel.is_cancelled() {
            return None;
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            position = self.updates.recv() => position,
        }
    }

    /// Cancels the subscription. Idempotent.
    pub fn stop(&mut self) {
        if !self.cancel.is_cancelled() {
            self.cancel.cancel();
            self.updates.close();
            log::debug!("event=watch_stop module=geo status=ok watch_id={}", self.id);
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Drop for PositionWatch {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

impl WatchFeed {
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Delivers one position. Returns `false` when the watch is gone.
    pub fn send(&self, position: Position) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        self.sender.send(position).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled() || self.sender.is_closed()
    }
}

/// Map link for a coordinate pair.
pub fn map_url(latitude: f64, longitude: f64) -> String {
    map_url_with_base(DEFAULT_MAP_URL_BASE, latitude, longitude)
}

pub(crate) fn map_url_with_base(base: &str, latitude: f64, longitude: f64) -> String {
    format!("{}?q={latitude},{longitude}", base.trim_end_matches('/'))
}

/// Great-circle distance in kilometers.
pub fn calculate_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    haversine_km(lat1, lon1, lat2, lon2)
}
