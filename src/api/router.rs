//! Reminder API router.
//!
//! Returns a composable `Router` with every route nested under `/api/`.

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::api::endpoints;
use crate::api::types::ApiContext;
use crate::reminders::ReminderService;

/// Build the API router over `service`.
pub fn reminder_api_router(service: Arc<ReminderService>) -> Router {
    build_router(ApiContext::new(service))
}

fn build_router(ctx: ApiContext) -> Router {
    // NOTE: Path params use `:param` syntax (matchit 0.7 / axum 0.7).
    let routes = Router::new()
        .route("/health", get(endpoints::health::check))
        .route(
            "/reminders/follow-ups/:id",
            post(endpoints::reminders::send_one),
        )
        .route("/reminders/bulk", post(endpoints::reminders::send_bulk))
        .route(
            "/reminders/candidates",
            get(endpoints::reminders::candidates),
        )
        .route("/reminders/run", post(endpoints::reminders::run_now))
        .with_state(ctx);

    Router::new()
        .nest("/api", routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
