//! Trait seams of the reminder engine.
//!
//! - ReminderStore: follow-up queries and the reminder-state write
//! - PatientDirectory: resolves a patient reference to contact details
//! - MessageTransport: the outbound provider
//! - Clock: local wall-clock time, substituted in tests

use chrono::{Local, NaiveDateTime};

use super::error::TransportError;
use crate::db::DatabaseError;
use crate::models::{AppointmentStatus, FollowUp, FollowUpId, PatientContact, PatientId, ReminderState};

/// Follow-up record access. Deleted records are invisible to every method.
pub trait ReminderStore: Send + Sync {
    /// Records scheduled within `[start, end]` (inclusive), ordered by
    /// scheduled time then id.
    fn find_due_between(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<FollowUp>, DatabaseError>;

    fn find_by_status(&self, status: AppointmentStatus) -> Result<Vec<FollowUp>, DatabaseError>;

    /// `Ok(None)` when the id does not resolve to a live record.
    fn find_by_id(&self, id: FollowUpId) -> Result<Option<FollowUp>, DatabaseError>;

    /// Insert or fully overwrite a record.
    fn save(&self, follow_up: &FollowUp) -> Result<(), DatabaseError>;

    /// Overwrite only the reminder columns in a single statement.
    /// Returns false when the record no longer exists.
    fn update_reminder_state(
        &self,
        id: FollowUpId,
        state: &ReminderState,
    ) -> Result<bool, DatabaseError>;
}

/// Resolves `patient_id` references; never mutates patient data.
pub trait PatientDirectory: Send + Sync {
    fn patient_contact(&self, patient_id: PatientId) -> Result<Option<PatientContact>, DatabaseError>;
}

/// Outbound message provider.
pub trait MessageTransport: Send + Sync {
    /// Deliver `body` from `from` to `to`; returns the provider message id.
    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TransportError>;
}

pub trait Clock: Send + Sync {
    /// Current local wall-clock time.
    fn now(&self) -> NaiveDateTime;
}

/// The host's local time zone.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}
