//! WhatsApp notification channel.
//!
//! Renders the fixed reminder text and hands it to a `MessageTransport`.
//! Validation and the global enable switch are applied before the transport
//! is touched; every transport error is folded into `SendFailure::Transport`
//! with the provider's text intact.

use std::sync::Arc;

use super::error::SendFailure;
use super::traits::MessageTransport;
use crate::config::ReminderConfig;
use crate::models::{FollowUp, PatientContact};

const WHATSAPP_PREFIX: &str = "whatsapp:";

/// Day, short month, year, then 12-hour clock: `05 Mar 2025 at 02:00 PM`.
const REMINDER_DATE_FORMAT: &str = "%d %b %Y at %I:%M %p";

/// Channel settings taken from configuration at construction.
#[derive(Debug, Clone)]
pub struct ChannelConfig {
    pub enabled: bool,
    pub sender: String,
    pub clinic_name: String,
}

impl From<&ReminderConfig> for ChannelConfig {
    fn from(config: &ReminderConfig) -> Self {
        Self {
            enabled: config.enabled,
            sender: config.sender.clone(),
            clinic_name: config.clinic_name.clone(),
        }
    }
}

pub struct NotificationChannel {
    config: ChannelConfig,
    transport: Arc<dyn MessageTransport>,
}

impl NotificationChannel {
    pub fn new(config: ChannelConfig, transport: Arc<dyn MessageTransport>) -> Self {
        Self { config, transport }
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Render the reminder body. Pure: same inputs give the same string.
    pub fn format_message(&self, follow_up: &FollowUp, patient: &PatientContact) -> String {
        format!(
            "Hello {}, this is a reminder for your follow-up appointment on {} at {}. Reason: {}. Please contact us if you need to reschedule.",
            patient.display_name,
            follow_up.scheduled_at.format(REMINDER_DATE_FORMAT),
            self.config.clinic_name,
            follow_up.reason_or_default(),
        )
    }

    /// Send `body` to `address`; returns the provider message id.
    ///
    /// Makes at most one transport call, and none when the channel is
    /// disabled or the address lacks a `+` country-code prefix.
    pub fn send(&self, address: &str, body: &str) -> Result<String, SendFailure> {
        if !self.config.enabled {
            return Err(SendFailure::ChannelDisabled);
        }

        let address = address.trim();
        if !address.starts_with('+') {
            return Err(SendFailure::InvalidAddress {
                address: address.to_string(),
            });
        }

        let to = format!("{WHATSAPP_PREFIX}{address}");
        let from = whatsapp_address(&self.config.sender);

        self.transport
            .send(&from, &to, body)
            .map_err(|e| SendFailure::Transport(e.to_string()))
    }
}

fn whatsapp_address(address: &str) -> String {
    let address = address.trim();
    if address.starts_with(WHATSAPP_PREFIX) {
        address.to_string()
    } else {
        format!("{WHATSAPP_PREFIX}{address}")
    }
}
