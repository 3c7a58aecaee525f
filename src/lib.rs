pub mod api;
pub mod config;
pub mod db;
pub mod models;
pub mod reminders;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use rusqlite::Connection;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use config::{AppConfig, ConfigError};
use db::DatabaseError;
use reminders::{
    start_reminder_scheduler, ChannelConfig, Clock, DailyTrigger, MessageTransport,
    NotificationChannel, ReminderDispatcher, ReminderService, SqliteReminderStore, SystemClock,
    TransportError, TwilioTransport,
};

/// Anything that stops the process from starting or serving.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),

    #[error("Provider client error: {0}")]
    Transport(#[from] TransportError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Install the global tracing subscriber. `RUST_LOG` wins over the default filter.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();
}

/// Wire store, channel and dispatcher into a service.
pub fn build_service(
    config: &AppConfig,
    conn: Connection,
    transport: Arc<dyn MessageTransport>,
    clock: Arc<dyn Clock>,
) -> Arc<ReminderService> {
    let store = Arc::new(SqliteReminderStore::new(conn));
    let channel = NotificationChannel::new(ChannelConfig::from(&config.reminders), transport);
    let dispatcher = Arc::new(ReminderDispatcher::new(
        store.clone(),
        store,
        channel,
        clock,
    ));
    Arc::new(ReminderService::new(
        dispatcher,
        config.reminders.max_concurrency,
    ))
}

/// Start the daily scheduler and the HTTP API; return after Ctrl-C.
///
/// The engine is synchronous, so the tokio runtime is built here and torn
/// down before the service (and its blocking HTTP client) is dropped.
pub fn run() -> Result<(), StartupError> {
    init_tracing();

    let config = AppConfig::from_env()?;
    tracing::info!(
        version = config::APP_VERSION,
        database = %config.database_path.display(),
        bind_addr = %config.bind_addr,
        reminders_enabled = config.reminders.enabled,
        fire_at = %config.reminders.fire_at,
        "{} starting",
        config::APP_NAME
    );
    if !config.reminders.enabled {
        tracing::warn!("Reminders are disabled; every send will be recorded as FAILED");
    }

    let conn = db::open_database(&config.database_path)?;
    let transport = Arc::new(TwilioTransport::new(
        &config.twilio,
        config.reminders.send_timeout_secs,
    )?);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let service = build_service(&config, conn, transport, clock.clone());

    let scheduler = start_reminder_scheduler(
        service.clone(),
        clock,
        DailyTrigger::new(config.reminders.fire_at),
    );

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(api::serve_api(
        service.clone(),
        config.bind_addr,
        shutdown_signal(service.shutdown_flag()),
    ));
    drop(runtime);

    // Joins the scheduler thread; a run in progress finishes its in-flight sends.
    drop(scheduler);
    drop(service);

    served?;
    tracing::info!("{} stopped", config::APP_NAME);
    Ok(())
}

async fn shutdown_signal(flag: Arc<AtomicBool>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
    flag.store(true, Ordering::Relaxed);
}
