//! Subcommand handlers.

use crate::cli::{ContactAction, ItemAction, TodoAction};
use anyhow::{anyhow, bail, Context};
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use safeguard_core::service::lost_item_service::LostItemReport;
use safeguard_core::{
    calculate_distance, AlertKind, Capabilities, CoreConfig, ExportMap, LogNotificationSink,
    LostItemStatus, Position, RecordId, SafeGuard, SessionEventData, SimulatedPositionProvider,
    SimulatedSmsChannel, TaskPriority,
};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_DB_FILE: &str = "safeguard.db";

const DRILL_TRACK_INTERVAL: Duration = Duration::from_millis(700);

fn simulated_capabilities(
    provider: SimulatedPositionProvider,
    sms: Arc<SimulatedSmsChannel>,
) -> Capabilities {
    Capabilities {
        positions: Arc::new(provider),
        alerts: sms,
        notifications: Arc::new(LogNotificationSink),
    }
}

fn open_app(config: &CoreConfig) -> anyhow::Result<SafeGuard> {
    let provider = SimulatedPositionProvider::fixed(Position::new(0.0, 0.0, 0.0));
    let capabilities = simulated_capabilities(provider, Arc::new(SimulatedSmsChannel::new()));
    SafeGuard::open(config, capabilities).context("opening store")
}

fn parse_id(raw: &str) -> anyhow::Result<RecordId> {
    raw.parse::<RecordId>()
        .with_context(|| format!("invalid id `{raw}`"))
}

fn parse_status(raw: &str) -> anyhow::Result<LostItemStatus> {
    LostItemStatus::parse(raw).ok_or_else(|| {
        anyhow!("unknown status `{raw}`; expected lost | found | recovered")
    })
}

pub fn run_contacts(config: &CoreConfig, action: ContactAction) -> anyhow::Result<()> {
    let app = open_app(config)?;
    let contacts = app.contacts();
    match action {
        ContactAction::Add {
            name,
            phone,
            relationship,
            primary,
        } => {
            let contact = contacts.add_contact(&name, &phone, &relationship, primary)?;
            println!("added {} {}", contact.id, contact.name);
        }
        ContactAction::List => {
            for contact in contacts.list_contacts()? {
                println!(
                    "{}\t{}\t{}\t{}{}",
                    contact.id,
                    contact.name,
                    contact.phone,
                    contact.relationship,
                    if contact.is_primary { "\t(primary)" } else { "" }
                );
            }
        }
        ContactAction::Remove { id } => {
            let removed = contacts.remove_contact(parse_id(&id)?)?;
            println!("removed {} {}", removed.id, removed.name);
        }
    }
    Ok(())
}

pub fn run_items(config: &CoreConfig, action: ItemAction) -> anyhow::Result<()> {
    let app = open_app(config)?;
    let items = app.lost_items();
    match action {
        ItemAction::Report {
            title,
            description,
            category,
            location,
            date,
        } => {
            let date_reported = match date {
                Some(raw) => NaiveDate::parse_from_str(&raw, "%Y-%m-%d")
                    .with_context(|| format!("invalid date `{raw}`"))?,
                None => Utc::now().date_naive(),
            };
            let item = items.report_item(LostItemReport {
                title,
                description,
                category,
                location,
                date_reported,
            })?;
            println!("reported {} {}", item.id, item.title);
        }
        ItemAction::List { status } => {
            let status = status.as_deref().map(parse_status).transpose()?;
            for item in items.list_items(status)? {
                println!(
                    "{}\t{}\t{}\t{}\t{}",
                    item.id,
                    item.status.as_str(),
                    item.date_reported,
                    item.title,
                    item.location
                );
            }
        }
        ItemAction::Status { id, status } => {
            let item = items.update_status(parse_id(&id)?, parse_status(&status)?)?;
            println!("{} is now {}", item.title, item.status.as_str());
        }
    }
    Ok(())
}

pub fn run_todos(config: &CoreConfig, action: TodoAction) -> anyhow::Result<()> {
    let app = open_app(config)?;
    let todos = app.todos();
    match action {
        TodoAction::Add {
            title,
            due,
            due_in_hours,
            priority,
        } => {
            let due_date = match (due, due_in_hours) {
                (Some(raw), _) => Some(
                    DateTime::parse_from_rfc3339(&raw)
                        .with_context(|| format!("invalid due time `{raw}`"))?
                        .with_timezone(&Utc),
                ),
                (None, Some(hours)) => Some(Utc::now() + ChronoDuration::hours(hours)),
                (None, None) => None,
            };
            let priority = TaskPriority::parse(&priority).ok_or_else(|| {
                anyhow!("unknown priority `{priority}`; expected low | medium | high")
            })?;
            let task = todos.add_task(&title, due_date, priority)?;
            println!("added {} {}", task.id, task.title);
        }
        TodoAction::List => {
            for task in todos.list_tasks()? {
                let due = task
                    .due_date
                    .map(|due| due.format("%Y-%m-%d %H:%M").to_string())
                    .unwrap_or_else(|| "-".to_string());
                println!(
                    "{}\t[{}]\t{}\t{}\t{}",
                    task.id,
                    if task.completed { "x" } else { " " },
                    task.priority.as_str(),
                    due,
                    task.title
                );
            }
        }
        TodoAction::Done { id } => {
            let task = todos.set_completed(parse_id(&id)?, true)?;
            println!("completed {}", task.title);
        }
    }
    Ok(())
}

/// Activates a session against the stored contacts, walks a short simulated
/// track, then deactivates.
pub async fn run_drill(config: &CoreConfig, seconds: u64, lat: f64, lon: f64) -> anyhow::Result<()> {
    if seconds == 0 {
        bail!("drill duration must be at least one second");
    }

    let provider = SimulatedPositionProvider::fixed(Position::new(lat, lon, 10.0));
    let sms = Arc::new(SimulatedSmsChannel::new());
    let app = SafeGuard::open(config, simulated_capabilities(provider.clone(), sms.clone()))
        .context("opening store")?;
    app.notifier().request_permission();

    let contacts = app.contacts().list_contacts()?;
    let session = app.emergency().activate(&contacts).await?;
    println!(
        "session {} active, alerted {} contact(s)",
        session.id,
        session.contacts_alerted.len()
    );

    let steps = (seconds.saturating_mul(1_000) / DRILL_TRACK_INTERVAL.as_millis() as u64).max(1);
    let track = (1..=steps)
        .map(|step| {
            let offset = step as f64 * 0.0002;
            Position::new(lat + offset, lon + offset, 8.0)
        })
        .collect();
    let walker = provider.spawn_track(track, DRILL_TRACK_INTERVAL);

    tokio::time::sleep(Duration::from_secs(seconds)).await;
    let ended = app
        .emergency()
        .deactivate()
        .await
        .context("session ended unexpectedly")?;
    walker.abort();

    let (updates, ticks) = ended
        .events()
        .iter()
        .fold((0, 0), |(updates, ticks), event| match event.data {
            SessionEventData::LocationUpdate(_) => (updates + 1, ticks),
            SessionEventData::RecordingTick { .. } => (updates, ticks + 1),
        });
    let moved_km = calculate_distance(lat, lon, ended.location.latitude, ended.location.longitude);

    println!(
        "session {} ended: {} location update(s), {} recording tick(s), moved {:.3} km",
        ended.id, updates, ticks, moved_km
    );
    println!(
        "alerts sent: {} emergency, {} safe notice(s)",
        sms.sent_of_kind(AlertKind::Emergency).len(),
        sms.sent_of_kind(AlertKind::SafeNotice).len()
    );
    Ok(())
}

pub fn run_export(config: &CoreConfig, output: Option<&Path>) -> anyhow::Result<()> {
    let app = open_app(config)?;
    let mut dump = serde_json::Map::new();
    dump.insert(
        "exported_at".into(),
        serde_json::json!(Utc::now().to_rfc3339()),
    );
    dump.insert(
        "data".into(),
        serde_json::to_value(app.storage().export_all())?,
    );
    let rendered = serde_json::to_string_pretty(&serde_json::Value::Object(dump))?;

    match output {
        Some(path) => {
            std::fs::write(path, &rendered)
                .with_context(|| format!("writing {}", path.display()))?;
            println!("exported to {}", path.display());
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

pub fn run_import(config: &CoreConfig, file: &Path) -> anyhow::Result<()> {
    let raw = std::fs::read_to_string(file)
        .with_context(|| format!("reading {}", file.display()))?;
    let parsed: serde_json::Value = serde_json::from_str(&raw)?;
    // Accept both the wrapped `export` output and a bare key map.
    let data = parsed.get("data").cloned().unwrap_or(parsed);
    let map: ExportMap = serde_json::from_value(data).context("expected an object of keys")?;

    let app = open_app(config)?;
    if !app.storage().import_all(&map) {
        bail!("some keys could not be written; see the log for details");
    }
    println!("imported {} key(s)", map.values().filter(|v| !v.is_null()).count());
    Ok(())
}
