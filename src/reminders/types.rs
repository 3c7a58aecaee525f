//! Result types returned by dispatch, the daily run and bulk resend.

use chrono::NaiveDateTime;
use serde::Serialize;

use super::error::SendFailure;
use crate::models::{FollowUp, FollowUpId};

/// Result of one dispatch: the record as persisted, plus the failure if any.
#[derive(Debug, Clone)]
pub struct DispatchOutcome {
    pub follow_up: FollowUp,
    pub failure: Option<SendFailure>,
}

impl DispatchOutcome {
    pub fn sent(&self) -> bool {
        self.failure.is_none()
    }
}

/// Summary of one daily run, emitted once at the end.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: String,
    pub window_start: NaiveDateTime,
    pub window_end: NaiveDateTime,
    pub due: u32,
    pub succeeded: u32,
    pub failed: u32,
    /// Due items never started because shutdown was requested.
    pub skipped: u32,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BulkOutcome {
    Sent,
    Failed { reason: String },
    NotFound,
    Error { message: String },
    Skipped,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkItemOutcome {
    pub follow_up_id: FollowUpId,
    pub outcome: BulkOutcome,
    /// Final persisted record, when one exists.
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkReminderResult {
    /// One entry per requested id, in request order.
    pub items: Vec<BulkItemOutcome>,
    pub succeeded: u32,
    pub failed: u32,
    pub skipped: u32,
}
