use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::enums::{AppointmentStatus, ReminderStatus};

pub type FollowUpId = i64;
pub type PatientId = i64;

/// Substituted into the reminder text when a follow-up has no reason.
pub const DEFAULT_REASON: &str = "General checkup";

/// A scheduled patient follow-up and its reminder delivery state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FollowUp {
    pub id: FollowUpId,
    pub patient_id: PatientId,
    pub scheduled_at: NaiveDateTime,
    pub reason: Option<String>,
    pub appointment_status: AppointmentStatus,
    #[serde(flatten)]
    pub reminder: ReminderState,
}

/// The reminder columns of a follow-up. Written only by the dispatcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderState {
    pub reminder_sent: bool,
    pub reminder_status: ReminderStatus,
    pub reminder_sent_at: Option<NaiveDateTime>,
    pub reminder_error: Option<String>,
    pub provider_message_id: Option<String>,
}

impl Default for ReminderState {
    fn default() -> Self {
        Self {
            reminder_sent: false,
            reminder_status: ReminderStatus::NotSent,
            reminder_sent_at: None,
            reminder_error: None,
            provider_message_id: None,
        }
    }
}

impl ReminderState {
    /// State after a send the provider accepted.
    pub fn sent(&self, provider_message_id: String, at: NaiveDateTime) -> Self {
        Self {
            reminder_sent: true,
            reminder_status: ReminderStatus::Sent,
            reminder_sent_at: Some(at),
            reminder_error: None,
            provider_message_id: Some(provider_message_id),
        }
    }

    /// State after a failed send. A previous success is not retracted:
    /// `reminder_sent` and the last provider message id carry over.
    pub fn failed(&self, error: String, at: NaiveDateTime) -> Self {
        Self {
            reminder_sent: self.reminder_sent,
            reminder_status: ReminderStatus::Failed,
            reminder_sent_at: Some(at),
            reminder_error: Some(error),
            provider_message_id: self.provider_message_id.clone(),
        }
    }
}

impl FollowUp {
    /// Whether the unattended daily job may send a reminder for this record.
    pub fn is_reminder_eligible(&self) -> bool {
        !self.reminder.reminder_sent && self.appointment_status == AppointmentStatus::Pending
    }

    pub fn reason_or_default(&self) -> &str {
        match self.reason.as_deref().map(str::trim) {
            Some(reason) if !reason.is_empty() => reason,
            _ => DEFAULT_REASON,
        }
    }
}

/// Materialized patient fields needed to address and greet a reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatientContact {
    pub patient_id: PatientId,
    pub display_name: String,
    pub phone: String,
}

impl PatientContact {
    pub fn from_names(patient_id: PatientId, first_name: &str, last_name: &str, phone: &str) -> Self {
        Self {
            patient_id,
            display_name: format!("{} {}", first_name.trim(), last_name.trim())
                .trim()
                .to_string(),
            phone: phone.trim().to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap().and_hms_opt(h, 0, 0).unwrap()
    }

    fn follow_up(status: AppointmentStatus, sent: bool) -> FollowUp {
        FollowUp {
            id: 1,
            patient_id: 7,
            scheduled_at: at(14),
            reason: None,
            appointment_status: status,
            reminder: ReminderState {
                reminder_sent: sent,
                ..ReminderState::default()
            },
        }
    }

    #[test]
    fn only_pending_unsent_is_eligible() {
        assert!(follow_up(AppointmentStatus::Pending, false).is_reminder_eligible());
        assert!(!follow_up(AppointmentStatus::Pending, true).is_reminder_eligible());
        assert!(!follow_up(AppointmentStatus::Completed, false).is_reminder_eligible());
        assert!(!follow_up(AppointmentStatus::Missed, false).is_reminder_eligible());
        assert!(!follow_up(AppointmentStatus::Cancelled, false).is_reminder_eligible());
    }

    #[test]
    fn blank_reason_falls_back_to_default() {
        let mut f = follow_up(AppointmentStatus::Pending, false);
        assert_eq!(f.reason_or_default(), DEFAULT_REASON);
        f.reason = Some("   ".into());
        assert_eq!(f.reason_or_default(), DEFAULT_REASON);
        f.reason = Some("Blood pressure review".into());
        assert_eq!(f.reason_or_default(), "Blood pressure review");
    }

    #[test]
    fn sent_state_clears_error() {
        let failed = ReminderState::default().failed("boom".into(), at(9));
        let sent = failed.sent("SM1".into(), at(10));
        assert!(sent.reminder_sent);
        assert_eq!(sent.reminder_status, ReminderStatus::Sent);
        assert_eq!(sent.reminder_error, None);
        assert_eq!(sent.provider_message_id.as_deref(), Some("SM1"));
        assert_eq!(sent.reminder_sent_at, Some(at(10)));
    }

    #[test]
    fn failure_after_success_keeps_sent_flag() {
        let sent = ReminderState::default().sent("SM1".into(), at(9));
        let failed = sent.failed("provider down".into(), at(10));
        assert!(failed.reminder_sent);
        assert_eq!(failed.reminder_status, ReminderStatus::Failed);
        assert_eq!(failed.reminder_error.as_deref(), Some("provider down"));
        assert_eq!(failed.provider_message_id.as_deref(), Some("SM1"));
    }

    #[test]
    fn display_name_joins_first_and_last() {
        let contact = PatientContact::from_names(3, "Asha", "Rao", " +15555550100 ");
        assert_eq!(contact.display_name, "Asha Rao");
        assert_eq!(contact.phone, "+15555550100");
    }
}
