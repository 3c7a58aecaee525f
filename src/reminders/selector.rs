//! Due-set selection: which follow-ups the unattended run should remind.
//!
//! Eligibility: `reminder_sent = false` and appointment status `PENDING`.
//! Results are ordered by scheduled time, then id.

use chrono::{Duration, NaiveDateTime, NaiveTime};

use super::traits::{Clock, ReminderStore};
use crate::db::DatabaseError;
use crate::models::FollowUp;

/// Look-ahead of the candidate listing.
pub const CANDIDATE_WINDOW_HOURS: i64 = 24;

/// Inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl Window {
    /// `[00:00:00, 23:59:59]` of the calendar day containing `now`.
    pub fn calendar_day(now: NaiveDateTime) -> Self {
        let day = now.date();
        let end_of_day = NaiveTime::from_hms_opt(23, 59, 59).unwrap_or_default();
        Self {
            start: day.and_time(NaiveTime::MIN),
            end: day.and_time(end_of_day),
        }
    }

    /// `[now, now + 24h]`.
    pub fn look_ahead(now: NaiveDateTime) -> Self {
        Self {
            start: now,
            end: now + Duration::hours(CANDIDATE_WINDOW_HOURS),
        }
    }
}

pub struct DueSetSelector<'a> {
    store: &'a dyn ReminderStore,
    clock: &'a dyn Clock,
}

impl<'a> DueSetSelector<'a> {
    pub fn new(store: &'a dyn ReminderStore, clock: &'a dyn Clock) -> Self {
        Self { store, clock }
    }

    /// Eligible follow-ups scheduled today (local calendar day).
    pub fn due_today(&self) -> Result<(Window, Vec<FollowUp>), DatabaseError> {
        let window = Window::calendar_day(self.clock.now());
        let due = self.due_within(window)?;
        Ok((window, due))
    }

    /// Eligible follow-ups over the next 24 hours, for operator review.
    pub fn upcoming_candidates(&self) -> Result<Vec<FollowUp>, DatabaseError> {
        self.due_within(Window::look_ahead(self.clock.now()))
    }

    pub fn due_within(&self, window: Window) -> Result<Vec<FollowUp>, DatabaseError> {
        let mut due: Vec<FollowUp> = self
            .store
            .find_due_between(window.start, window.end)?
            .into_iter()
            .filter(FollowUp::is_reminder_eligible)
            .collect();
        // Store order is not part of its contract for every implementation.
        due.sort_by_key(|f| (f.scheduled_at, f.id));
        Ok(due)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AppointmentStatus, FollowUpId};
    use crate::reminders::store::SqliteReminderStore;
    use crate::reminders::testing::{datetime, FixedClock};
    use crate::db::sqlite::open_memory_database;

    fn store() -> SqliteReminderStore {
        SqliteReminderStore::new(open_memory_database().expect("Failed to open in-memory DB"))
    }

    fn add(
        store: &SqliteReminderStore,
        at: NaiveDateTime,
        status: AppointmentStatus,
    ) -> FollowUpId {
        let p = store.insert_patient("Asha", "Rao", "+15555550100").unwrap();
        store.insert_follow_up(p, at, None, status).unwrap()
    }

    #[test]
    fn calendar_day_spans_midnight_to_last_second() {
        let w = Window::calendar_day(datetime(2025, 3, 5, 9, 0));
        assert_eq!(w.start, datetime(2025, 3, 5, 0, 0));
        assert_eq!(w.end, datetime(2025, 3, 5, 23, 59) + Duration::seconds(59));
    }

    #[test]
    fn look_ahead_is_24_hours() {
        let now = datetime(2025, 3, 5, 9, 30);
        let w = Window::look_ahead(now);
        assert_eq!(w.start, now);
        assert_eq!(w.end, datetime(2025, 3, 6, 9, 30));
    }

    #[test]
    fn due_today_keeps_only_pending_unsent() {
        let s = store();
        let clock = FixedClock::at(datetime(2025, 3, 5, 9, 0));

        let pending = add(&s, datetime(2025, 3, 5, 14, 0), AppointmentStatus::Pending);
        add(&s, datetime(2025, 3, 5, 10, 0), AppointmentStatus::Completed);
        add(&s, datetime(2025, 3, 5, 11, 0), AppointmentStatus::Cancelled);
        add(&s, datetime(2025, 3, 5, 12, 0), AppointmentStatus::Missed);

        let already = add(&s, datetime(2025, 3, 5, 15, 0), AppointmentStatus::Pending);
        let mut f = s.find_by_id(already).unwrap().unwrap();
        f.reminder = f.reminder.sent("SM1".into(), datetime(2025, 3, 4, 9, 0));
        s.save(&f).unwrap();

        let (window, due) = DueSetSelector::new(&s, &clock).due_today().unwrap();
        assert_eq!(window.start, datetime(2025, 3, 5, 0, 0));
        let ids: Vec<_> = due.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![pending]);
    }

    #[test]
    fn due_today_includes_earlier_today_and_excludes_other_days() {
        let s = store();
        let clock = FixedClock::at(datetime(2025, 3, 5, 9, 0));

        let early = add(&s, datetime(2025, 3, 5, 0, 0), AppointmentStatus::Pending);
        let late = add(
            &s,
            datetime(2025, 3, 5, 23, 59) + Duration::seconds(59),
            AppointmentStatus::Pending,
        );
        add(&s, datetime(2025, 3, 4, 23, 59), AppointmentStatus::Pending);
        add(&s, datetime(2025, 3, 6, 0, 0), AppointmentStatus::Pending);

        let (_, due) = DueSetSelector::new(&s, &clock).due_today().unwrap();
        let ids: Vec<_> = due.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![early, late]);
    }

    #[test]
    fn results_are_ordered_by_scheduled_time() {
        let s = store();
        let clock = FixedClock::at(datetime(2025, 3, 5, 9, 0));

        let c = add(&s, datetime(2025, 3, 5, 16, 0), AppointmentStatus::Pending);
        let a = add(&s, datetime(2025, 3, 5, 10, 0), AppointmentStatus::Pending);
        let b = add(&s, datetime(2025, 3, 5, 13, 0), AppointmentStatus::Pending);

        let (_, due) = DueSetSelector::new(&s, &clock).due_today().unwrap();
        let ids: Vec<_> = due.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![a, b, c]);
    }

    #[test]
    fn candidates_look_24_hours_ahead() {
        let s = store();
        let clock = FixedClock::at(datetime(2025, 3, 5, 18, 0));

        add(&s, datetime(2025, 3, 5, 9, 0), AppointmentStatus::Pending);
        let tonight = add(&s, datetime(2025, 3, 5, 20, 0), AppointmentStatus::Pending);
        let tomorrow = add(&s, datetime(2025, 3, 6, 17, 0), AppointmentStatus::Pending);
        add(&s, datetime(2025, 3, 6, 19, 0), AppointmentStatus::Pending);
        add(&s, datetime(2025, 3, 6, 8, 0), AppointmentStatus::Cancelled);

        let due = DueSetSelector::new(&s, &clock).upcoming_candidates().unwrap();
        let ids: Vec<_> = due.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![tonight, tomorrow]);
    }

    #[test]
    fn deleted_records_are_not_due() {
        let s = store();
        let clock = FixedClock::at(datetime(2025, 3, 5, 9, 0));
        let id = add(&s, datetime(2025, 3, 5, 14, 0), AppointmentStatus::Pending);
        s.delete_follow_up(id).unwrap();

        let (_, due) = DueSetSelector::new(&s, &clock).due_today().unwrap();
        assert!(due.is_empty());
    }
}
