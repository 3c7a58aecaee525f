//! Shared state and request/response types for the API layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::models::{FollowUp, FollowUpId};
use crate::reminders::ReminderService;

/// Shared context for all API routes.
#[derive(Clone)]
pub struct ApiContext {
    pub service: Arc<ReminderService>,
}

impl ApiContext {
    pub fn new(service: Arc<ReminderService>) -> Self {
        Self { service }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkReminderRequest {
    pub follow_up_ids: Vec<FollowUpId>,
}

#[derive(Debug, Serialize)]
pub struct CandidatesResponse {
    pub count: usize,
    pub follow_ups: Vec<FollowUp>,
}
