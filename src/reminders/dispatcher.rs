//! Sends one reminder and records its outcome.
//!
//! `dispatch` does not check eligibility; callers decide whether a record
//! should be sent. Every call performs a send, even for records already
//! marked `SENT`.
//!
//! The load → send → persist sequence for a given id runs under a per-record
//! lock, so two concurrent dispatches of the same follow-up never interleave
//! their state writes. Different records never contend.

use std::collections::HashSet;
use std::sync::{Arc, Condvar, Mutex, PoisonError};

use chrono::SubsecRound;

use super::channel::NotificationChannel;
use super::error::{ReminderError, SendFailure};
use super::traits::{Clock, PatientDirectory, ReminderStore};
use super::types::DispatchOutcome;
use crate::models::{FollowUp, FollowUpId};

pub struct ReminderDispatcher {
    store: Arc<dyn ReminderStore>,
    patients: Arc<dyn PatientDirectory>,
    channel: NotificationChannel,
    clock: Arc<dyn Clock>,
    locks: RecordLocks,
}

impl ReminderDispatcher {
    pub fn new(
        store: Arc<dyn ReminderStore>,
        patients: Arc<dyn PatientDirectory>,
        channel: NotificationChannel,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            patients,
            channel,
            clock,
            locks: RecordLocks::default(),
        }
    }

    pub fn store(&self) -> &dyn ReminderStore {
        self.store.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn channel(&self) -> &NotificationChannel {
        &self.channel
    }

    /// Send a reminder for `id` now and persist the outcome.
    ///
    /// Business failures (unresolvable patient, invalid address, disabled
    /// channel, provider error) are persisted as `FAILED` and returned inside `Ok`. `Err` means there
    /// was nothing to mark: the record is gone, or the store itself failed.
    pub fn dispatch(&self, id: FollowUpId) -> Result<DispatchOutcome, ReminderError> {
        let _guard = self.locks.acquire(id);

        let follow_up = self
            .store
            .find_by_id(id)?
            .ok_or(ReminderError::NotFound(id))?;

        let contact = self.patients.patient_contact(follow_up.patient_id)?;
        let result = match &contact {
            Some(patient) => {
                let body = self.channel.format_message(&follow_up, patient);
                self.channel.send(&patient.phone, &body)
            }
            None => Err(SendFailure::UnknownPatient {
                patient_id: follow_up.patient_id,
            }),
        };
        // Stored timestamps carry whole seconds.
        let now = self.clock.now().trunc_subsecs(0);
        let patient = contact.as_ref().map_or("", |p| p.display_name.as_str());

        let (state, failure) = match result {
            Ok(provider_message_id) => {
                tracing::info!(
                    follow_up_id = id,
                    patient_id = follow_up.patient_id,
                    patient,
                    provider_message_id = %provider_message_id,
                    outcome = "sent",
                    "Reminder sent"
                );
                (follow_up.reminder.sent(provider_message_id, now), None)
            }
            Err(failure) => {
                tracing::warn!(
                    follow_up_id = id,
                    patient_id = follow_up.patient_id,
                    patient,
                    outcome = "failed",
                    kind = failure.kind(),
                    retryable = failure.is_retryable(),
                    error = %failure,
                    "Reminder send failed"
                );
                (follow_up.reminder.failed(failure.to_string(), now), Some(failure))
            }
        };

        if !self.store.update_reminder_state(id, &state)? {
            // Deleted while the send was in flight.
            tracing::warn!(
                follow_up_id = id,
                sent = failure.is_none(),
                "Follow-up disappeared before its reminder outcome could be recorded"
            );
            return Err(ReminderError::NotFound(id));
        }

        Ok(DispatchOutcome {
            follow_up: FollowUp {
                reminder: state,
                ..follow_up
            },
            failure,
        })
    }
}

/// Per-record mutual exclusion keyed by follow-up id.
#[derive(Default)]
struct RecordLocks {
    held: Mutex<HashSet<FollowUpId>>,
    released: Condvar,
}

impl RecordLocks {
    fn acquire(&self, id: FollowUpId) -> RecordGuard<'_> {
        // The set is only inserted into / removed from, so it stays valid
        // even if a holder panicked.
        let mut held = self.held.lock().unwrap_or_else(PoisonError::into_inner);
        while held.contains(&id) {
            held = self
                .released
                .wait(held)
                .unwrap_or_else(PoisonError::into_inner);
        }
        held.insert(id);
        RecordGuard { locks: self, id }
    }
}

struct RecordGuard<'a> {
    locks: &'a RecordLocks,
    id: FollowUpId,
}

impl Drop for RecordGuard<'_> {
    fn drop(&mut self) {
        self.locks
            .held
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.id);
        self.locks.released.notify_all();
    }
}
