//! Reminder HTTP API.
//!
//! Thin axum surface over `ReminderService`: single and bulk resend, the
//! candidate listing and an operator trigger for the daily run. Routes are
//! nested under `/api/`; the router is composable and can be mounted on any
//! axum server instance.

pub mod endpoints;
pub mod error;
pub mod router;
pub mod server;
pub mod types;

pub use error::ApiError;
pub use router::reminder_api_router;
pub use server::{serve_api, serve_on};
pub use types::ApiContext;
