use safeguard_core::service::contact_service::ContactService;
use safeguard_core::{
    AlertKind, Contact, EmergencyError, EmergencyService, EmergencySession, EmergencySettings,
    LocationService, MemoryNotificationSink, Notifier, PermissionState, Position, PositionError,
    SessionEventData, SimulatedPositionProvider, SimulatedSmsChannel, Storage, StorageKey,
};
use std::sync::Arc;
use std::time::Duration;

struct Harness {
    provider: SimulatedPositionProvider,
    sms: Arc<SimulatedSmsChannel>,
    sink: Arc<MemoryNotificationSink>,
    storage: Storage,
    location: Arc<LocationService>,
    contacts: ContactService,
    service: EmergencyService,
}

fn harness(provider: SimulatedPositionProvider) -> Harness {
    harness_with_storage(provider, Storage::in_memory())
}

fn harness_with_storage(provider: SimulatedPositionProvider, storage: Storage) -> Harness {
    harness_with(provider, storage, PermissionState::Granted)
}

fn harness_with(
    provider: SimulatedPositionProvider,
    storage: Storage,
    permission: PermissionState,
) -> Harness {
    let sms = Arc::new(SimulatedSmsChannel::new());
    let sink = Arc::new(MemoryNotificationSink::new(permission));
    let notifier = Notifier::new(sink.clone());
    assert_eq!(notifier.request_permission(), permission);

    let location = Arc::new(LocationService::new(
        Arc::new(provider.clone()),
        storage.clone(),
    ));
    let service = EmergencyService::new(
        location.clone(),
        storage.clone(),
        sms.clone(),
        notifier,
        EmergencySettings::default(),
    );

    Harness {
        provider,
        sms,
        sink,
        contacts: ContactService::new(storage.clone()),
        storage,
        location,
        service,
    }
}

fn san_francisco() -> Position {
    Position::new(37.7749, -122.4194, 5.0)
}

fn mom(harness: &Harness) -> Contact {
    harness
        .contacts
        .add_contact("Mom", "+1-555-0100", "mother", true)
        .unwrap()
}

fn persisted(storage: &Storage) -> Option<EmergencySession> {
    storage.load_typed(StorageKey::EmergencySession)
}

fn tick_durations(session: &EmergencySession) -> Vec<u64> {
    session
        .events()
        .iter()
        .filter_map(|event| match event.data {
            SessionEventData::RecordingTick { duration } => Some(duration),
            SessionEventData::LocationUpdate(_) => None,
        })
        .collect()
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn activation_alerts_contacts_and_persists_session() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    let mom = mom(&h);

    let session = h.service.activate(&[mom.clone()]).await.unwrap();

    assert_eq!(session.contacts_alerted, vec![mom.id]);
    assert!(session.is_active);
    assert!(session.recording_active);
    assert!((session.location.latitude - 37.7749).abs() < 1e-9);
    assert!(h.service.is_active());
    assert_eq!(persisted(&h.storage).map(|s| s.id), Some(session.id));

    let alerts = h.sms.sent_of_kind(AlertKind::Emergency);
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].contact_id, mom.id);
    assert!(alerts[0].body.starts_with("EMERGENCY ALERT!"));
    assert!(alerts[0]
        .body
        .contains("https://www.google.com/maps?q=37.7749,-122.4194"));
    assert!(alerts[0].body.contains("Coordinates: 37.774900, -122.419400"));
    assert!(alerts[0].body.contains("Accuracy: \u{b1}5m"));

    let shown = h.sink.shown();
    assert_eq!(shown.len(), 1);
    assert_eq!(shown[0].title, "Emergency Activated");
    assert_eq!(shown[0].body, "Alerts sent to 1 contact");
    assert_eq!(shown[0].options.tag, "emergency-alert");
}

#[tokio::test(start_paused = true)]
async fn refused_notifications_do_not_affect_alerts_or_activation() {
    let h = harness_with(
        SimulatedPositionProvider::fixed(san_francisco()),
        Storage::in_memory(),
        PermissionState::Denied,
    );
    let mom = mom(&h);
    let dad = h
        .contacts
        .add_contact("Dad", "+1 555 0101", "father", false)
        .unwrap();

    let session = h.service.activate(&[mom.clone(), dad.clone()]).await.unwrap();

    assert!(session.is_active);
    assert_eq!(session.contacts_alerted, vec![mom.id, dad.id]);
    let recipients: Vec<_> = h
        .sms
        .sent_of_kind(AlertKind::Emergency)
        .iter()
        .map(|message| message.contact_id)
        .collect();
    assert_eq!(recipients, vec![mom.id, dad.id]);
    assert!(h.sink.shown().is_empty());
    assert!(h.service.is_active());
}

#[tokio::test(start_paused = true)]
async fn activation_with_no_contacts_sends_no_alerts() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));

    let session = h.service.activate(&[]).await.unwrap();

    assert!(session.contacts_alerted.is_empty());
    assert!(h.sms.sent().is_empty());
    assert_eq!(h.sink.shown()[0].body, "Alerts sent to 0 contacts");
}

#[tokio::test(start_paused = true)]
async fn hanging_fix_times_out_without_creating_a_session() {
    let h = harness(SimulatedPositionProvider::pending());
    let mom = mom(&h);

    let err = h.service.activate(&[mom]).await.unwrap_err();

    assert_eq!(
        err,
        EmergencyError::LocationUnavailable(PositionError::Timeout)
    );
    assert!(h.service.active_session().is_none());
    assert!(!h.service.is_active());
    assert!(h
        .storage
        .load_record(StorageKey::EmergencySession)
        .unwrap()
        .is_absent());
    assert!(h.sms.sent().is_empty());
    assert!(h.sink.shown().is_empty());
}

#[tokio::test(start_paused = true)]
async fn denied_location_is_reported_as_unavailable() {
    let h = harness(SimulatedPositionProvider::failing(
        PositionError::PermissionDenied,
    ));

    let err = h.service.activate(&[]).await.unwrap_err();

    assert_eq!(
        err,
        EmergencyError::LocationUnavailable(PositionError::PermissionDenied)
    );
    assert!(persisted(&h.storage).is_none());
}

#[tokio::test(start_paused = true)]
async fn second_activation_is_rejected_while_active() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    let first = h.service.activate(&[]).await.unwrap();

    let err = h.service.activate(&[]).await.unwrap_err();

    assert_eq!(
        err,
        EmergencyError::AlreadyActive {
            session_id: first.id
        }
    );
    assert_eq!(h.service.active_session().map(|s| s.id), Some(first.id));
}

#[tokio::test(start_paused = true)]
async fn tracking_updates_replace_location_and_append_events() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    h.service.activate(&[]).await.unwrap();
    settle().await;

    let moved = Position::new(37.78, -122.41, 8.0);
    assert_eq!(h.provider.emit(moved.clone()), 1);
    settle().await;

    let session = h.service.active_session().unwrap();
    assert_eq!(session.location, moved);
    let updates: Vec<_> = session
        .events()
        .iter()
        .filter(|event| event.data.type_tag() == "LOCATION_UPDATE")
        .collect();
    assert_eq!(updates.len(), 1);
    assert_eq!(updates[0].data, SessionEventData::LocationUpdate(moved.clone()));

    let stored = persisted(&h.storage).unwrap();
    assert!((stored.location.latitude - 37.78).abs() < 1e-9);
    assert_eq!(stored.events().len(), session.events().len());
    assert_eq!(h.location.last_known_location(), Some(moved));
}

#[tokio::test(start_paused = true)]
async fn recording_ticks_once_per_second_and_only_appends() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    h.service.activate(&[]).await.unwrap();

    tokio::time::sleep(Duration::from_millis(1_500)).await;
    let early = h.service.active_session().unwrap();
    assert_eq!(tick_durations(&early), vec![1]);

    tokio::time::sleep(Duration::from_millis(2_000)).await;
    let later = h.service.active_session().unwrap();
    assert_eq!(tick_durations(&later), vec![1, 2, 3]);
    assert!(later.events().starts_with(early.events()));
    assert_eq!(tick_durations(&persisted(&h.storage).unwrap()), vec![1, 2, 3]);
}

#[tokio::test(start_paused = true)]
async fn refused_watch_still_records() {
    let provider = SimulatedPositionProvider::fixed(san_francisco());
    provider.refuse_watch(PositionError::Unavailable("gps off".to_string()));
    let h = harness(provider);

    h.service.activate(&[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;

    let session = h.service.active_session().unwrap();
    assert_eq!(tick_durations(&session), vec![1, 2]);
    assert_eq!(h.provider.active_watches(), 0);
}

#[tokio::test(start_paused = true)]
async fn deactivate_stops_background_work_and_clears_record() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    let mom = mom(&h);
    let activated = h.service.activate(&[mom.clone()]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(2_500)).await;
    assert!(h.service.is_active());

    let ended = h.service.deactivate().await.unwrap();

    assert_eq!(ended.id, activated.id);
    assert!(!ended.is_active);
    assert!(!ended.recording_active);
    assert_eq!(tick_durations(&ended), vec![1, 2]);
    assert!(h.service.active_session().is_none());
    assert!(!h.service.is_active());
    assert!(h
        .storage
        .load_record(StorageKey::EmergencySession)
        .unwrap()
        .is_absent());

    assert_eq!(h.provider.emit(Position::new(1.0, 1.0, 1.0)), 0);
    tokio::time::sleep(Duration::from_secs(5)).await;
    assert!(persisted(&h.storage).is_none());
    assert!(h.service.active_session().is_none());

    let notices = h.sms.sent_of_kind(AlertKind::SafeNotice);
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].contact_id, mom.id);
    assert!(notices[0].body.starts_with("I'm safe now."));
}

#[tokio::test(start_paused = true)]
async fn safe_notices_go_to_currently_stored_contacts() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    let mom = mom(&h);
    h.service.activate(&[mom.clone()]).await.unwrap();

    let dad = h
        .contacts
        .add_contact("Dad", "+1 555 0101", "father", false)
        .unwrap();
    h.contacts.remove_contact(mom.id).unwrap();
    h.service.deactivate().await.unwrap();

    let notices = h.sms.sent_of_kind(AlertKind::SafeNotice);
    let recipients: Vec<_> = notices.iter().map(|message| message.contact_id).collect();
    assert_eq!(recipients, vec![dad.id]);
}

#[tokio::test(start_paused = true)]
async fn deactivate_without_session_is_a_no_op() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    mom(&h);

    assert!(h.service.deactivate().await.is_none());
    assert!(h.sms.sent().is_empty());
    assert!(h.service.deactivate().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn persisted_session_is_visible_after_restart_and_can_be_ended() {
    let storage = Storage::in_memory();
    let session_id;
    {
        let h = harness_with_storage(
            SimulatedPositionProvider::fixed(san_francisco()),
            storage.clone(),
        );
        mom(&h);
        session_id = h.service.activate(&[]).await.unwrap().id;
        tokio::time::sleep(Duration::from_millis(1_200)).await;
    }

    let restarted = harness_with_storage(
        SimulatedPositionProvider::fixed(san_francisco()),
        storage.clone(),
    );
    let recovered = restarted.service.active_session().unwrap();
    assert_eq!(recovered.id, session_id);
    assert!(restarted.service.is_active());
    assert_eq!(tick_durations(&recovered), vec![1]);

    tokio::time::sleep(Duration::from_secs(3)).await;
    assert_eq!(persisted(&storage).map(|s| tick_durations(&s)), Some(vec![1]));

    let ended = restarted.service.deactivate().await.unwrap();
    assert_eq!(ended.id, session_id);
    assert!(!ended.is_active);
    assert!(persisted(&storage).is_none());
    assert_eq!(restarted.sms.sent_of_kind(AlertKind::SafeNotice).len(), 1);
}

#[tokio::test(start_paused = true)]
async fn recovered_session_blocks_activation_until_ended() {
    let storage = Storage::in_memory();
    let session_id;
    {
        let h = harness_with_storage(
            SimulatedPositionProvider::fixed(san_francisco()),
            storage.clone(),
        );
        mom(&h);
        session_id = h.service.activate(&[]).await.unwrap().id;
        tokio::time::sleep(Duration::from_millis(1_200)).await;
    }

    let restarted = harness_with_storage(
        SimulatedPositionProvider::fixed(san_francisco()),
        storage.clone(),
    );
    assert!(restarted.service.is_active());

    let err = restarted.service.activate(&[]).await.unwrap_err();
    assert_eq!(err, EmergencyError::AlreadyActive { session_id });
    let kept = persisted(&storage).unwrap();
    assert_eq!(kept.id, session_id);
    assert_eq!(tick_durations(&kept), vec![1]);
    assert!(restarted.sms.sent_of_kind(AlertKind::Emergency).is_empty());

    restarted.service.deactivate().await.unwrap();
    assert_eq!(restarted.sms.sent_of_kind(AlertKind::SafeNotice).len(), 1);

    let next = restarted.service.activate(&[]).await.unwrap();
    assert!(next.id > session_id);
    assert_eq!(persisted(&storage).map(|s| s.id), Some(next.id));
}

#[tokio::test(start_paused = true)]
async fn activation_racing_deactivation_never_loses_its_record() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));
    let first = h.service.activate(&[]).await.unwrap();
    tokio::time::sleep(Duration::from_millis(1_500)).await;

    let (ended, activated) = tokio::join!(h.service.deactivate(), h.service.activate(&[]));

    assert_eq!(ended.map(|s| s.id), Some(first.id));
    match activated {
        Ok(session) => {
            assert!(session.id > first.id);
            assert_eq!(persisted(&h.storage).map(|s| s.id), Some(session.id));
            assert!(h.service.is_active());
        }
        Err(err) => {
            assert_eq!(
                err,
                EmergencyError::AlreadyActive {
                    session_id: first.id
                }
            );
            assert!(persisted(&h.storage).is_none());
            assert!(!h.service.is_active());
        }
    }
}

#[tokio::test(start_paused = true)]
async fn session_ids_increase_across_activations() {
    let h = harness(SimulatedPositionProvider::fixed(san_francisco()));

    let first = h.service.activate(&[]).await.unwrap();
    h.service.deactivate().await.unwrap();
    let second = h.service.activate(&[]).await.unwrap();

    assert!(second.id > first.id);
}
