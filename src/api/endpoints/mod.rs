//! Endpoint handlers.
//!
//! The reminder engine is synchronous (SQLite + blocking HTTP), so handlers
//! move its calls onto the blocking pool.

pub mod health;
pub mod reminders;

use crate::api::error::ApiError;

/// Run `f` on tokio's blocking pool.
pub(crate) async fn blocking<T, F>(f: F) -> Result<T, ApiError>
where
    F: FnOnce() -> Result<T, ApiError> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(f).await?
}
