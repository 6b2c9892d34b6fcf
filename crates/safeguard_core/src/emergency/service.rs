//! Emergency session owner.
//!
//! # Responsibility
//! - Activate: fetch a fresh fix, create and persist the session, start
//!   tracking and recording, alert contacts.
//! - Deactivate: stop background work, send "I'm safe" notices, clear the
//!   session and its persisted record.
//!
//! # Invariants
//! - A failed fix leaves no session in memory or in storage.
//! - `deactivate` is always safe to call, including with nothing active.

use super::workers::{record_ticks, track_location, TrackingContext};
use super::{EmergencyError, EmergencySettings};
use crate::alert::{fan_out, format_emergency_message, format_safe_message, AlertChannel, AlertKind};
use crate::geo::LocationService;
use crate::model::contact::Contact;
use crate::model::position::Position;
use crate::model::session::{EmergencySession, SessionId};
use crate::notify::{NotificationOptions, Notifier};
use crate::repo::collection_repo::CollectionRepository;
use crate::store::{Storage, StorageKey};
use chrono::{DateTime, Utc};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(super) struct ActiveSession {
    pub session: EmergencySession,
    cancel: CancellationToken,
    workers: Vec<JoinHandle<()>>,
}

pub(super) type SessionSlot = Arc<Mutex<Option<ActiveSession>>>;

pub(super) fn lock_slot(slot: &Mutex<Option<ActiveSession>>) -> MutexGuard<'_, Option<ActiveSession>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Owner of the active emergency session and its background work.
pub struct EmergencyService {
    location: Arc<LocationService>,
    storage: Storage,
    contacts: CollectionRepository<Contact>,
    alerts: Arc<dyn AlertChannel>,
    notifier: Notifier,
    settings: EmergencySettings,
    slot: SessionSlot,
    last_session_id: AtomicI64,
}

impl EmergencyService {
    pub fn new(
        location: Arc<LocationService>,
        storage: Storage,
        alerts: Arc<dyn AlertChannel>,
        notifier: Notifier,
        settings: EmergencySettings,
    ) -> Self {
        // Ids must stay ahead of a session persisted by an earlier run.
        let last_session_id = storage
            .load_typed::<EmergencySession>(StorageKey::EmergencySession)
            .map_or(0, |session| session.id);
        Self {
            location,
            contacts: CollectionRepository::new(storage.clone()),
            storage,
            alerts,
            notifier,
            settings,
            slot: Arc::new(Mutex::new(None)),
            last_session_id: AtomicI64::new(last_session_id),
        }
    }

    /// Starts an emergency session and alerts `contacts`.
    ///
    /// # Contract
    /// - An empty contact list is valid and results in zero alerts.
    /// - Fails with `LocationUnavailable` if no fix is obtained; nothing is
    ///   persisted in that case.
    /// - Fails with `AlreadyActive` while another session is running,
    ///   including one recovered from storage after a restart.
    /// - Must be called from within a Tokio runtime.
    pub async fn activate(&self, contacts: &[Contact]) -> Result<EmergencySession, EmergencyError> {
        info!(
            "event=emergency_activate module=emergency status=start contacts={}",
            contacts.len()
        );
        self.ensure_idle()?;

        let position = self.location.current_position().await.map_err(|err| {
            error!("event=emergency_activate module=emergency status=error error_code=location_unavailable error={err}");
            EmergencyError::LocationUnavailable(err)
        })?;

        let started_at = Utc::now();
        let session = EmergencySession::new(
            self.next_session_id(started_at),
            started_at,
            position.clone(),
            contacts.iter().map(|contact| contact.id).collect(),
        );

        {
            let mut slot = lock_slot(&self.slot);
            if let Some(session_id) = self.running_session_id(&slot) {
                return Err(EmergencyError::AlreadyActive { session_id });
            }

            if !self.storage.save_typed(StorageKey::EmergencySession, &session) {
                warn!(
                    "event=emergency_activate module=emergency status=degraded session_id={} error_code=persist_failed",
                    session.id
                );
            }

            let cancel = CancellationToken::new();
            let workers = self.spawn_workers(session.id, &cancel);
            *slot = Some(ActiveSession {
                session: session.clone(),
                cancel,
                workers,
            });
        }

        self.send_alerts(contacts, &position);

        info!(
            "event=emergency_activate module=emergency status=ok session_id={} contacts={}",
            session.id,
            session.contacts_alerted.len()
        );
        Ok(session)
    }

    /// Sends one emergency alert per contact plus a summary notification.
    ///
    /// Never fails; returns the number of alerts the channel accepted.
    pub fn send_alerts(&self, contacts: &[Contact], position: &Position) -> usize {
        let body = format_emergency_message(position, Utc::now(), &self.settings.map_url_base);
        let delivered = fan_out(self.alerts.as_ref(), contacts, AlertKind::Emergency, &body);

        let count = contacts.len();
        let summary = format!(
            "Alerts sent to {count} contact{}",
            if count == 1 { "" } else { "s" }
        );
        let notified =
            self.notifier
                .notify("Emergency Activated", summary, NotificationOptions::emergency());
        if let Err(err) = notified {
            debug!("event=emergency_notify module=emergency status=skipped error={err}");
        }

        info!(
            "event=emergency_alerts module=emergency status=ok requested={count} delivered={delivered}"
        );
        delivered
    }

    /// Ends the current session, if any.
    ///
    /// # Contract
    /// - Background tracking and recording are stopped before this returns.
    /// - "I'm safe" notices go to the contacts currently stored, which may
    ///   differ from the ones alerted at activation.
    /// - The persisted session record is deleted.
    /// - Returns the closed session, or `None` when nothing was active.
    pub async fn deactivate(&self) -> Option<EmergencySession> {
        let taken = {
            let mut slot = lock_slot(&self.slot);
            if let Some(active) = slot.as_ref() {
                active.cancel.cancel();
            }
            slot.take()
        };

        let ended = match taken {
            Some(active) => {
                for worker in active.workers {
                    if let Err(err) = worker.await {
                        warn!("event=emergency_deactivate module=emergency status=degraded error_code=worker_failed error={err}");
                    }
                }
                Some(active.session)
            }
            // Recovered after a restart: no workers, only the persisted record.
            None => self
                .storage
                .load_typed::<EmergencySession>(StorageKey::EmergencySession),
        };

        let Some(mut session) = ended else {
            debug!("event=emergency_deactivate module=emergency status=noop");
            return None;
        };

        let notified = self.send_safe_notices();
        session.close();
        {
            // Activation persists under the same lock.
            let _slot = lock_slot(&self.slot);
            clear_persisted(&self.storage, session.id);
        }

        info!(
            "event=emergency_deactivate module=emergency status=ok session_id={} events={} safe_notices={}",
            session.id,
            session.events().len(),
            notified
        );
        Some(session)
    }

    /// Current session: the in-memory one, else the persisted record.
    pub fn active_session(&self) -> Option<EmergencySession> {
        if let Some(active) = lock_slot(&self.slot).as_ref() {
            return Some(active.session.clone());
        }
        self.storage.load_typed(StorageKey::EmergencySession)
    }

    pub fn is_active(&self) -> bool {
        self.active_session()
            .is_some_and(|session| session.is_active)
    }

    fn ensure_idle(&self) -> Result<(), EmergencyError> {
        let slot = lock_slot(&self.slot);
        match self.running_session_id(&slot) {
            Some(session_id) => Err(EmergencyError::AlreadyActive { session_id }),
            None => Ok(()),
        }
    }

    /// Id of the running session: the in-memory one, else an active
    /// persisted record. Call with the slot locked.
    fn running_session_id(&self, slot: &Option<ActiveSession>) -> Option<SessionId> {
        if let Some(active) = slot {
            return Some(active.session.id);
        }
        self.storage
            .load_typed::<EmergencySession>(StorageKey::EmergencySession)
            .filter(|session| session.is_active)
            .map(|session| session.id)
    }

    fn spawn_workers(&self, session_id: SessionId, cancel: &CancellationToken) -> Vec<JoinHandle<()>> {
        let mut workers = Vec::with_capacity(2);

        match self.location.watch_position() {
            Ok(watch) => {
                let ctx = TrackingContext {
                    slot: Arc::clone(&self.slot),
                    storage: self.storage.clone(),
                    location: Arc::clone(&self.location),
                    session_id,
                    cancel: cancel.clone(),
                };
                workers.push(tokio::spawn(track_location(ctx, watch)));
            }
            Err(err) => warn!(
                "event=tracking_start module=emergency status=error session_id={session_id} error={err}"
            ),
        }

        workers.push(tokio::spawn(record_ticks(
            Arc::clone(&self.slot),
            self.storage.clone(),
            session_id,
            self.settings.recording_interval,
            cancel.clone(),
        )));
        workers
    }

    fn send_safe_notices(&self) -> usize {
        let contacts = match self.contacts.list() {
            Ok(contacts) => contacts,
            Err(err) => {
                warn!("event=safe_notice module=emergency status=error error_code=contacts_unreadable error={err}");
                Vec::new()
            }
        };
        let body = format_safe_message(Utc::now());
        fan_out(self.alerts.as_ref(), &contacts, AlertKind::SafeNotice, &body)
    }

    /// Epoch-millisecond id, bumped when two activations share a millisecond.
    fn next_session_id(&self, at: DateTime<Utc>) -> SessionId {
        let candidate = at.timestamp_millis();
        let mut assigned = candidate;
        let _ = self
            .last_session_id
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| {
                assigned = candidate.max(last + 1);
                Some(assigned)
            });
        assigned
    }
}

/// Deletes the persisted session only if it still belongs to `session_id`.
fn clear_persisted(storage: &Storage, session_id: SessionId) -> bool {
    match storage.load_typed::<EmergencySession>(StorageKey::EmergencySession) {
        Some(stored) if stored.id != session_id => {
            warn!(
                "event=emergency_deactivate module=emergency status=skipped session_id={} stored_session_id={} reason=record_replaced",
                session_id, stored.id
            );
            false
        }
        _ => storage.remove(StorageKey::EmergencySession),
    }
}

impl Drop for EmergencyService {
    fn drop(&mut self) {
        if let Some(active) = lock_slot(&self.slot).as_ref() {
            active.cancel.cancel();
        }
    }
}
