//! Bounded-concurrency batch executor shared by the daily run and bulk resend.
//!
//! Workers pull the next index from a shared counter, so at most
//! `max_concurrency` dispatches run at once. Every item is isolated: errors
//! and panics are captured per item and never stop the batch. Once the
//! shutdown flag is raised no new item starts; items already dispatched run
//! to completion and the rest are reported as skipped.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use super::dispatcher::ReminderDispatcher;
use super::error::ReminderError;
use super::types::DispatchOutcome;
use crate::models::FollowUpId;

/// Result for one id of a batch.
#[derive(Debug)]
pub enum BatchItem {
    Completed(Result<DispatchOutcome, ReminderError>),
    /// Not started because shutdown was requested.
    Skipped,
}

/// Dispatch every id, returning one `BatchItem` per id in input order.
pub fn run_batch(
    dispatcher: &ReminderDispatcher,
    ids: &[FollowUpId],
    max_concurrency: usize,
    shutdown: &AtomicBool,
) -> Vec<BatchItem> {
    let mut items: Vec<BatchItem> = ids.iter().map(|_| BatchItem::Skipped).collect();
    if ids.is_empty() {
        return items;
    }

    let workers = max_concurrency.clamp(1, ids.len());
    let next = AtomicUsize::new(0);
    let next = &next;

    let finished: Vec<(usize, Result<DispatchOutcome, ReminderError>)> =
        std::thread::scope(|s| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    s.spawn(move || {
                        let mut done = Vec::new();
                        while !shutdown.load(Ordering::Relaxed) {
                            let index = next.fetch_add(1, Ordering::SeqCst);
                            let Some(&id) = ids.get(index) else {
                                break;
                            };
                            done.push((index, dispatch_contained(dispatcher, id)));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| h.join().unwrap_or_default())
                .collect()
        });

    for (index, result) in finished {
        items[index] = BatchItem::Completed(result);
    }

    let skipped = items
        .iter()
        .filter(|item| matches!(item, BatchItem::Skipped))
        .count();
    if skipped > 0 {
        tracing::info!(skipped, total = ids.len(), "Shutdown requested, remaining reminders not started");
    }

    items
}

/// Run one dispatch, converting a panic into `ReminderError::Internal`.
fn dispatch_contained(
    dispatcher: &ReminderDispatcher,
    id: FollowUpId,
) -> Result<DispatchOutcome, ReminderError> {
    let result = match panic::catch_unwind(AssertUnwindSafe(|| dispatcher.dispatch(id))) {
        Ok(result) => result,
        Err(payload) => Err(ReminderError::Internal(format!(
            "dispatch panicked: {}",
            panic_message(payload.as_ref())
        ))),
    };

    match &result {
        Err(e @ ReminderError::NotFound(_)) => {
            tracing::warn!(follow_up_id = id, outcome = "not_found", error = %e, "Follow-up vanished before dispatch");
        }
        Err(e) => {
            tracing::error!(follow_up_id = id, outcome = "error", error = %e, "Reminder dispatch failed unexpectedly");
        }
        Ok(_) => {}
    }

    result
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
