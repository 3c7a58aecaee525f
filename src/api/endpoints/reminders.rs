//! Reminder endpoints.
//!
//! - `POST /api/reminders/follow-ups/:id`: force-send one reminder
//! - `POST /api/reminders/bulk`: force-send a list of reminders
//! - `GET /api/reminders/candidates`: what the next 24 hours would remind
//! - `POST /api/reminders/run`: run the daily job now

use axum::extract::{Path, State};
use axum::Json;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::{ApiContext, BulkReminderRequest, CandidatesResponse};
use crate::models::{FollowUp, FollowUpId};
use crate::reminders::{BulkReminderResult, RunSummary};

/// `POST /api/reminders/follow-ups/:id`
pub async fn send_one(
    State(ctx): State<ApiContext>,
    Path(id): Path<FollowUpId>,
) -> Result<Json<FollowUp>, ApiError> {
    let follow_up = blocking(move || Ok(ctx.service.send_manual(id)?)).await?;
    Ok(Json(follow_up))
}

/// `POST /api/reminders/bulk`
pub async fn send_bulk(
    State(ctx): State<ApiContext>,
    Json(request): Json<BulkReminderRequest>,
) -> Result<Json<BulkReminderResult>, ApiError> {
    if request.follow_up_ids.is_empty() {
        return Err(ApiError::BadRequest("follow_up_ids must not be empty".into()));
    }
    let result = blocking(move || Ok(ctx.service.send_bulk(&request.follow_up_ids))).await?;
    Ok(Json(result))
}

/// `GET /api/reminders/candidates`
pub async fn candidates(
    State(ctx): State<ApiContext>,
) -> Result<Json<CandidatesResponse>, ApiError> {
    let follow_ups = blocking(move || Ok(ctx.service.list_candidates()?)).await?;
    Ok(Json(CandidatesResponse {
        count: follow_ups.len(),
        follow_ups,
    }))
}

/// `POST /api/reminders/run`
pub async fn run_now(State(ctx): State<ApiContext>) -> Result<Json<RunSummary>, ApiError> {
    tracing::info!("Daily reminder run triggered via API");
    let summary = blocking(move || Ok(ctx.service.run_daily()?)).await?;
    Ok(Json(summary))
}
