//! Simulated position provider for drills, demos and tests.

use super::{PositionError, PositionOptions, PositionProvider, PositionWatch, WatchFeed};
use crate::model::position::Position;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

#[derive(Debug, Clone)]
enum FixBehavior {
    Fixed(Position),
    Fail(PositionError),
    /// Never resolves; exercises the caller's timeout.
    Pending,
}

#[derive(Debug)]
struct SimulatedState {
    fix: FixBehavior,
    watch_error: Option<PositionError>,
    feeds: Vec<WatchFeed>,
    next_watch_id: u64,
}

/// Provider whose fixes and subscription updates are driven by the caller.
#[derive(Debug, Clone)]
pub struct SimulatedPositionProvider {
    state: Arc<Mutex<SimulatedState>>,
}

impl SimulatedPositionProvider {
    fn with_fix(fix: FixBehavior) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimulatedState {
                fix,
                watch_error: None,
                feeds: Vec::new(),
                next_watch_id: 1,
            })),
        }
    }

    /// Always resolves to `position`, re-stamped with the current time.
    pub fn fixed(position: Position) -> Self {
        Self::with_fix(FixBehavior::Fixed(position))
    }

    pub fn failing(error: PositionError) -> Self {
        Self::with_fix(FixBehavior::Fail(error))
    }

    /// One-shot fetches never complete.
    pub fn pending() -> Self {
        Self::with_fix(FixBehavior::Pending)
    }

    pub fn set_fix(&self, position: Position) {
        self.state().fix = FixBehavior::Fixed(position);
    }

    pub fn set_failure(&self, error: PositionError) {
        self.state().fix = FixBehavior::Fail(error);
    }

    /// Makes subsequent `watch_position` calls fail.
    pub fn refuse_watch(&self, error: PositionError) {
        self.state().watch_error = Some(error);
    }

    /// Pushes one update to every live watch. Returns how many received it.
    pub fn emit(&self, position: Position) -> usize {
        let mut state = self.state();
        state.feeds.retain(|feed| !feed.is_closed());
        state
            .feeds
            .iter()
            .filter(|feed| feed.send(position.clone()))
            .count()
    }

    /// Number of watches that have not been stopped.
    pub fn active_watches(&self) -> usize {
        let mut state = self.state();
        state.feeds.retain(|feed| !feed.is_closed());
        state.feeds.len()
    }

    /// Emits `positions` one by one, `interval` apart, on the current runtime.
    pub fn spawn_track(&self, positions: Vec<Position>, interval: Duration) -> JoinHandle<()> {
        let provider = self.clone();
        tokio::spawn(async move {
            for position in positions {
                tokio::time::sleep(interval).await;
                let position = Position {
                    timestamp: Utc::now(),
                    ..position
                };
                provider.emit(position);
            }
        })
    }

    fn state(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[async_trait]
impl PositionProvider for SimulatedPositionProvider {
    async fn current_position(&self, _options: &PositionOptions) -> Result<Position, PositionError> {
        let fix = self.state().fix.clone();
        match fix {
            FixBehavior::Fixed(position) => Ok(Position {
                timestamp: Utc::now(),
                ..position
            }),
            FixBehavior::Fail(error) => Err(error),
            FixBehavior::Pending => std::future::pending().await,
        }
    }

    fn watch_position(&self, _options: &PositionOptions) -> Result<PositionWatch, PositionError> {
        let mut state = self.state();
        if let Some(error) = state.watch_error.clone() {
            return Err(error);
        }
        let id = state.next_watch_id;
        state.next_watch_id += 1;
        let (watch, feed) = PositionWatch::channel(id);
        state.feeds.push(feed);
        Ok(watch)
    }
}
