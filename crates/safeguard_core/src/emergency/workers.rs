//! Background tasks attached to an active session.
//!
//! Both loops re-check the session's cancellation token while holding the
//! session lock, immediately before appending. `deactivate` cancels the token
//! under the same lock, so no append can land after it.

use super::service::{lock_slot, SessionSlot};
use crate::geo::{LocationService, PositionWatch};
use crate::model::session::SessionId;
use crate::store::{Storage, StorageKey};
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

pub(super) struct TrackingContext {
    pub slot: SessionSlot,
    pub storage: Storage,
    pub location: Arc<LocationService>,
    pub session_id: SessionId,
    pub cancel: CancellationToken,
}

/// Applies provider updates to the session in delivery order.
pub(super) async fn track_location(ctx: TrackingContext, mut watch: PositionWatch) {
    let mut applied = 0usize;
    loop {
        let next = tokio::select! {
            biased;
            _ = ctx.cancel.cancelled() => None,
            position = watch.next() => position,
        };
        let Some(position) = next else {
            break;
        };

        let mut guard = lock_slot(&ctx.slot);
        if ctx.cancel.is_cancelled() {
            break;
        }
        let Some(active) = guard
            .as_mut()
            .filter(|active| active.session.id == ctx.session_id)
        else {
            break;
        };

        ctx.location.remember(&position);
        active.session.record_location(position);
        if !ctx.storage.save_typed(StorageKey::EmergencySession, &active.session) {
            warn!(
                "event=location_update module=emergency status=error session_id={} error_code=persist_failed",
                ctx.session_id
            );
        }
        applied += 1;
    }

    watch.stop();
    debug!(
        "event=tracking_stop module=emergency status=ok session_id={} updates={}",
        ctx.session_id, applied
    );
}

/// Appends one `RECORDING_TICK` per period until cancelled.
pub(super) async fn record_ticks(
    slot: SessionSlot,
    storage: Storage,
    session_id: SessionId,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut ticks: u32 = 0;

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let mut guard = lock_slot(&slot);
        if cancel.is_cancelled() {
            break;
        }
        let Some(active) = guard
            .as_mut()
            .filter(|active| active.session.id == session_id)
        else {
            break;
        };

        ticks = ticks.saturating_add(1);
        active.session.record_tick((period * ticks).as_secs());
        if !storage.save_typed(StorageKey::EmergencySession, &active.session) {
            warn!(
                "event=recording_tick module=emergency status=error session_id={session_id} error_code=persist_failed"
            );
        }
    }

    debug!(
        "event=recording_stop module=emergency status=ok session_id={session_id} ticks={ticks}"
    );
}
