//! HTTP server lifecycle for the reminder API.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::api::router::reminder_api_router;
use crate::reminders::ReminderService;

/// Bind `addr` and serve until `shutdown` resolves.
pub async fn serve_api<F>(
    service: Arc<ReminderService>,
    addr: SocketAddr,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(addr).await?;
    serve_on(listener, service, shutdown).await
}

/// Serve on an already-bound listener. In-flight requests finish before
/// this returns.
pub async fn serve_on<F>(
    listener: TcpListener,
    service: Arc<ReminderService>,
    shutdown: F,
) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Reminder API server started");

    axum::serve(listener, reminder_api_router(service))
        .with_graceful_shutdown(shutdown)
        .await?;

    tracing::info!("Reminder API server stopped");
    Ok(())
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════
