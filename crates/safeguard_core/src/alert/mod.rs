//! Outgoing contact alerts.
//!
//! # Responsibility
//! - Render emergency and "I'm safe" message templates.
//! - Define the injectable delivery boundary where a real SMS or telephony
//!   provider would plug in.
//!
//! # Invariants
//! - Fan-out is best-effort: one failed delivery never stops the others.
//! - Message bodies and phone numbers are logged only at `debug` level.

use crate::geo::map_url_with_base;
use crate::model::contact::Contact;
use crate::model::position::Position;
use crate::model::RecordId;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::{Mutex, PoisonError};

pub use crate::geo::DEFAULT_MAP_URL_BASE;

const APP_NAME: &str = "SafeGuard App";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Emergency,
    SafeNotice,
}

impl AlertKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Emergency => "emergency",
            Self::SafeNotice => "safe_notice",
        }
    }
}

/// One rendered message addressed to one contact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub contact_id: RecordId,
    pub contact_name: String,
    pub phone: String,
    pub kind: AlertKind,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertError {
    pub phone: String,
    pub reason: String,
}

impl Display for AlertError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "alert delivery to {} failed: {}", self.phone, self.reason)
    }
}

impl Error for AlertError {}

/// Delivery boundary for contact alerts.
pub trait AlertChannel: Send + Sync {
    fn deliver(&self, message: &AlertMessage) -> Result<(), AlertError>;
}

/// Stand-in for a real SMS integration: logs and records, sends nothing.
#[derive(Debug, Default)]
pub struct SimulatedSmsChannel {
    sent: Mutex<Vec<AlertMessage>>,
}

impl SimulatedSmsChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message handed to the channel, in delivery order.
    pub fn sent(&self) -> Vec<AlertMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn sent_of_kind(&self, kind: AlertKind) -> Vec<AlertMessage> {
        self.sent()
            .into_iter()
            .filter(|message| message.kind == kind)
            .collect()
    }
}

impl AlertChannel for SimulatedSmsChannel {
    fn deliver(&self, message: &AlertMessage) -> Result<(), AlertError> {
        info!(
            "event=sms_simulated module=alert status=ok kind={} contact_id={}",
            message.kind.as_str(),
            message.contact_id
        );
        debug!(
            "event=sms_simulated module=alert to={} body={:?}",
            message.phone, message.body
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}

/// Renders the emergency alert body.
pub fn format_emergency_message(
    position: &Position,
    sent_at: DateTime<Utc>,
    map_url_base: &str,
) -> String {
    let map_link = map_url_with_base(map_url_base, position.latitude, position.longitude);
    format!(
        "EMERGENCY ALERT!\n\n\
         I need immediate help. Please check my location:\n\
         {map_link}\n\n\
         This is an automated emergency message from {APP_NAME}.\n\n\
         Time: {}\n\
         Coordinates: {:.6}, {:.6}\n\
         Accuracy: \u{b1}{:.0}m",
        human_time(sent_at),
        position.latitude,
        position.longitude,
        position.accuracy
    )
}

/// Renders the end-of-emergency notice.
pub fn format_safe_message(sent_at: DateTime<Utc>) -> String {
    format!(
        "I'm safe now. Thank you for your concern.\n\n\
         This is an automated message from {APP_NAME}.\n\n\
         Time: {}",
        human_time(sent_at)
    )
}

/// Sends `body` to every contact. Returns the number of successful deliveries.
pub fn fan_out(
    channel: &dyn AlertChannel,
    contacts: &[Contact],
    kind: AlertKind,
    body: &str,
) -> usize {
    let mut delivered = 0;
    for contact in contacts {
        let message = AlertMessage {
            contact_id: contact.id,
            contact_name: contact.name.clone(),
            phone: contact.phone.clone(),
            kind,
            body: body.to_string(),
        };
        match channel.deliver(&message) {
            Ok(()) => delivered += 1,
            Err(err) => warn!(
                "event=alert_deliver module=alert status=error kind={} contact_id={} error={}",
                kind.as_str(),
                contact.id,
                err.reason
            ),
        }
    }
    delivered
}

fn human_time(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M:%S UTC").to_string()
}
