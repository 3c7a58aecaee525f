//! Error types for the reminder engine.
//!
//! `SendFailure` is a business outcome: the dispatcher persists it as a
//! `FAILED` reminder and returns normally. `ReminderError` is what callers of
//! the dispatcher and the on-demand paths see as an `Err`.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::models::{FollowUpId, PatientId};

/// Why a single reminder send did not go out.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SendFailure {
    #[error("Invalid phone number format: {address}. Must include country code (+)")]
    InvalidAddress { address: String },

    #[error("Reminders are disabled in configuration")]
    ChannelDisabled,

    #[error("Patient not found: {patient_id}")]
    UnknownPatient { patient_id: PatientId },

    #[error("{0}")]
    Transport(String),
}

impl SendFailure {
    /// Only provider-side failures may succeed on a later manual resend
    /// without operator action on patient data or configuration.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport(_))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidAddress { .. } => "invalid_address",
            Self::ChannelDisabled => "channel_disabled",
            Self::UnknownPatient { .. } => "unknown_patient",
            Self::Transport(_) => "transport_failure",
        }
    }
}

/// Raw failure reported by a message transport.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("Request timed out after {secs}s")]
    Timeout { secs: u64 },

    #[error("Cannot connect to provider at {0}")]
    Connection(String),

    /// Provider answered with a non-success status; `message` is its text verbatim.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(String),

    #[error("Unreadable provider response: {0}")]
    ResponseParsing(String),
}

#[derive(Error, Debug)]
pub enum ReminderError {
    #[error("Follow-up not found: {0}")]
    NotFound(FollowUpId),

    #[error("Failed to send WhatsApp reminder: {reason}")]
    SendFailed { id: FollowUpId, reason: SendFailure },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Internal error: {0}")]
    Internal(String),
}
