//! Daily reminder scheduler.
//!
//! A background thread polls the clock and fires the daily run once per
//! calendar day at the configured local time. Nothing is persisted: a fire
//! missed while the process was down is not replayed, and the next fire is
//! the following scheduled time.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{Days, NaiveDateTime, NaiveTime};

use super::service::ReminderService;
use super::traits::Clock;

/// Sleep granularity for shutdown responsiveness.
const SLEEP_GRANULARITY_SECS: u64 = 1;

/// Fixed local time of day at which the run fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    fire_at: NaiveTime,
}

impl DailyTrigger {
    pub fn new(fire_at: NaiveTime) -> Self {
        Self { fire_at }
    }

    pub fn fire_at(&self) -> NaiveTime {
        self.fire_at
    }

    /// First fire instant strictly after `now`.
    pub fn next_fire_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.fire_at);
        if today > now {
            today
        } else {
            now.date()
                .checked_add_days(Days::new(1))
                .map(|d| d.and_time(self.fire_at))
                .unwrap_or(NaiveDateTime::MAX)
        }
    }
}

/// Armed trigger. `poll` reports whether the run is due.
#[derive(Debug, Clone)]
pub struct DailySchedule {
    trigger: DailyTrigger,
    next: NaiveDateTime,
}

impl DailySchedule {
    pub fn new(trigger: DailyTrigger, now: NaiveDateTime) -> Self {
        Self {
            trigger,
            next: trigger.next_fire_after(now),
        }
    }

    pub fn next_fire(&self) -> NaiveDateTime {
        self.next
    }

    /// True at most once per scheduled fire.
    ///
    /// A late poll on the same calendar day still fires. A poll that lands
    /// on a later day (host suspended, clock jumped) re-arms without firing,
    /// so missed days are never replayed.
    pub fn poll(&mut self, now: NaiveDateTime) -> bool {
        if now < self.next {
            return false;
        }
        let fire = now.date() == self.next.date();
        if !fire {
            tracing::warn!(
                missed = %self.next,
                now = %now,
                "Reminder fire time missed, waiting for the next one"
            );
        }
        self.next = self.trigger.next_fire_after(now);
        fire
    }
}

/// Handle for the background scheduler thread.
///
/// `shutdown()` or `Drop` stops the loop and prevents the current run, if
/// any, from starting new items. Drop waits for in-flight sends to finish.
pub struct ReminderSchedulerHandle {
    shutdown: Arc<AtomicBool>,
    handle: Option<std::thread::JoinHandle<()>>,
}

impl ReminderSchedulerHandle {
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }
}

impl Drop for ReminderSchedulerHandle {
    fn drop(&mut self) {
        self.shutdown();
        if let Some(h) = self.handle.take() {
            let _ = h.join();
        }
    }
}

/// Start the daily scheduler on its own thread.
///
/// Shares the service's shutdown flag, so stopping the scheduler also stops
/// any bulk resend from starting new items.
pub fn start_reminder_scheduler(
    service: Arc<ReminderService>,
    clock: Arc<dyn Clock>,
    trigger: DailyTrigger,
) -> ReminderSchedulerHandle {
    let shutdown = service.shutdown_flag();
    let flag = shutdown.clone();

    let handle = std::thread::spawn(move || {
        scheduler_loop(&service, clock.as_ref(), trigger, &flag);
    });

    ReminderSchedulerHandle {
        shutdown,
        handle: Some(handle),
    }
}

fn scheduler_loop(
    service: &ReminderService,
    clock: &dyn Clock,
    trigger: DailyTrigger,
    shutdown: &AtomicBool,
) {
    let mut schedule = DailySchedule::new(trigger, clock.now());
    tracing::info!(
        fire_at = %trigger.fire_at(),
        next_fire = %schedule.next_fire(),
        "Reminder scheduler started"
    );

    while !shutdown.load(Ordering::Relaxed) {
        if schedule.poll(clock.now()) {
            if let Err(e) = service.run_daily() {
                tracing::error!(error = %e, "Daily reminder run failed");
            }
            tracing::debug!(next_fire = %schedule.next_fire(), "Next reminder run scheduled");
        }
        std::thread::sleep(Duration::from_secs(SLEEP_GRANULARITY_SECS));
    }
    tracing::info!("Reminder scheduler shutting down");
}
