//! Reminder service: the daily run and the on-demand entry points.
//!
//! Both cadences share one dispatcher. The daily run pre-filters through the
//! due-set selector and swallows per-item failures into a tally; a single
//! manual resend sends regardless of state and returns any failure to the
//! caller; bulk resend records a per-item outcome and never fails as a whole.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use uuid::Uuid;

use super::dispatcher::ReminderDispatcher;
use super::error::ReminderError;
use super::runner::{run_batch, BatchItem};
use super::selector::DueSetSelector;
use super::types::{BulkItemOutcome, BulkOutcome, BulkReminderResult, RunSummary};
use crate::models::{FollowUp, FollowUpId};

pub struct ReminderService {
    dispatcher: Arc<ReminderDispatcher>,
    max_concurrency: usize,
    shutdown: Arc<AtomicBool>,
}

impl ReminderService {
    pub fn new(dispatcher: Arc<ReminderDispatcher>, max_concurrency: usize) -> Self {
        Self {
            dispatcher,
            max_concurrency: max_concurrency.max(1),
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Flag checked before each batch item starts.
    pub fn shutdown_flag(&self) -> Arc<AtomicBool> {
        self.shutdown.clone()
    }

    /// Stop batches from starting new items. In-flight items still finish.
    pub fn request_shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    /// Whether sends can reach the provider at all.
    pub fn reminders_enabled(&self) -> bool {
        self.dispatcher.channel().is_enabled()
    }

    fn selector(&self) -> DueSetSelector<'_> {
        DueSetSelector::new(self.dispatcher.store(), self.dispatcher.clock())
    }

    /// Force-send one reminder, whatever the record's current state.
    ///
    /// The outcome is persisted either way; a failed send is also returned
    /// as `ReminderError::SendFailed`.
    pub fn send_manual(&self, id: FollowUpId) -> Result<FollowUp, ReminderError> {
        let outcome = self.dispatcher.dispatch(id)?;
        match outcome.failure {
            None => Ok(outcome.follow_up),
            Some(reason) => Err(ReminderError::SendFailed { id, reason }),
        }
    }

    /// Force-send each id. One entry per id, in request order.
    pub fn send_bulk(&self, ids: &[FollowUpId]) -> BulkReminderResult {
        let items = run_batch(&self.dispatcher, ids, self.max_concurrency, &self.shutdown);

        let mut result = BulkReminderResult {
            items: Vec::with_capacity(ids.len()),
            succeeded: 0,
            failed: 0,
            skipped: 0,
        };

        for (&follow_up_id, item) in ids.iter().zip(items) {
            let (outcome, follow_up) = match item {
                BatchItem::Completed(Ok(dispatched)) => match dispatched.failure {
                    None => (BulkOutcome::Sent, Some(dispatched.follow_up)),
                    Some(reason) => (
                        BulkOutcome::Failed {
                            reason: reason.to_string(),
                        },
                        Some(dispatched.follow_up),
                    ),
                },
                BatchItem::Completed(Err(ReminderError::NotFound(_))) => (BulkOutcome::NotFound, None),
                BatchItem::Completed(Err(e)) => (
                    BulkOutcome::Error {
                        message: e.to_string(),
                    },
                    self.current_state(follow_up_id),
                ),
                BatchItem::Skipped => (BulkOutcome::Skipped, self.current_state(follow_up_id)),
            };

            match &outcome {
                BulkOutcome::Sent => result.succeeded += 1,
                BulkOutcome::Skipped => result.skipped += 1,
                _ => result.failed += 1,
            }

            result.items.push(BulkItemOutcome {
                follow_up_id,
                outcome,
                follow_up,
            });
        }

        tracing::info!(
            requested = ids.len(),
            succeeded = result.succeeded,
            failed = result.failed,
            skipped = result.skipped,
            "Bulk reminder resend completed"
        );

        result
    }

    /// Eligible follow-ups in the next 24 hours. Read-only.
    pub fn list_candidates(&self) -> Result<Vec<FollowUp>, ReminderError> {
        Ok(self.selector().upcoming_candidates()?)
    }

    /// Remind everything due today that has not been reminded yet.
    pub fn run_daily(&self) -> Result<RunSummary, ReminderError> {
        let start = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let (window, due) = self.selector().due_today()?;
        let ids: Vec<FollowUpId> = due.iter().map(|f| f.id).collect();
        tracing::debug!(run_id = %run_id, due = ids.len(), "Daily reminder run starting");

        let items = run_batch(&self.dispatcher, &ids, self.max_concurrency, &self.shutdown);

        let mut summary = RunSummary {
            run_id,
            window_start: window.start,
            window_end: window.end,
            due: ids.len() as u32,
            succeeded: 0,
            failed: 0,
            skipped: 0,
            duration_ms: 0,
            errors: Vec::new(),
        };

        for (id, item) in ids.iter().zip(items) {
            match item {
                BatchItem::Completed(Ok(outcome)) => match outcome.failure {
                    None => summary.succeeded += 1,
                    Some(reason) => {
                        summary.failed += 1;
                        summary.errors.push(format!("follow-up {id}: {reason}"));
                    }
                },
                BatchItem::Completed(Err(e)) => {
                    summary.failed += 1;
                    summary.errors.push(format!("follow-up {id}: {e}"));
                }
                BatchItem::Skipped => summary.skipped += 1,
            }
        }
        summary.duration_ms = start.elapsed().as_millis() as u64;

        tracing::info!(
            run_id = %summary.run_id,
            due = summary.due,
            succeeded = summary.succeeded,
            failed = summary.failed,
            skipped = summary.skipped,
            duration_ms = summary.duration_ms,
            "Daily reminder run completed"
        );

        Ok(summary)
    }

    fn current_state(&self, id: FollowUpId) -> Option<FollowUp> {
        self.dispatcher.store().find_by_id(id).ok().flatten()
    }
}
