use std::net::SocketAddr;
use std::path::PathBuf;

use chrono::NaiveTime;
use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "followup-reminders";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_CLINIC_NAME: &str = "Clinic";
pub const DEFAULT_FIRE_TIME: &str = "09:00";
pub const DEFAULT_SEND_TIMEOUT_SECS: u64 = 15;
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;
pub const DEFAULT_TWILIO_API_BASE: &str = "https://api.twilio.com";
pub const DEFAULT_DATABASE_PATH: &str = "followups.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8080";

/// Log filter used when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "info,followup_reminders=debug,tower_http=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing required setting {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },
}

/// Settings consumed by the notification channel and the batch paths.
#[derive(Debug, Clone)]
pub struct ReminderConfig {
    /// Global send switch. When false every send short-circuits to a failure.
    pub enabled: bool,
    /// Sender address handed to the provider.
    pub sender: String,
    /// Clinic display name rendered in the message body.
    pub clinic_name: String,
    /// Local wall-clock time of the daily run.
    pub fire_at: NaiveTime,
    pub send_timeout_secs: u64,
    /// Upper bound on concurrently dispatched items in a batch.
    pub max_concurrency: usize,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            sender: String::new(),
            clinic_name: DEFAULT_CLINIC_NAME.to_string(),
            fire_at: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or_default(),
            send_timeout_secs: DEFAULT_SEND_TIMEOUT_SECS,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwilioConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub api_base: String,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub bind_addr: SocketAddr,
    pub reminders: ReminderConfig,
    pub twilio: TwilioConfig,
}

impl AppConfig {
    /// Load from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let enabled = match get("REMINDERS_ENABLED") {
            Some(v) => parse_bool("REMINDERS_ENABLED", &v)?,
            None => true,
        };

        let fire_raw = get("REMINDER_FIRE_TIME").unwrap_or_else(|| DEFAULT_FIRE_TIME.to_string());
        let fire_at = NaiveTime::parse_from_str(&fire_raw, "%H:%M").map_err(|_| ConfigError::Invalid {
            key: "REMINDER_FIRE_TIME",
            value: fire_raw.clone(),
        })?;

        let send_timeout_secs = match get("REMINDER_SEND_TIMEOUT_SECS") {
            Some(v) => parse_positive("REMINDER_SEND_TIMEOUT_SECS", &v)?,
            None => DEFAULT_SEND_TIMEOUT_SECS,
        };

        let max_concurrency = match get("REMINDER_MAX_CONCURRENCY") {
            Some(v) => parse_positive("REMINDER_MAX_CONCURRENCY", &v)? as usize,
            None => DEFAULT_MAX_CONCURRENCY,
        };

        let sender = get("TWILIO_WHATSAPP_NUMBER").unwrap_or_default();
        let account_sid = get("TWILIO_ACCOUNT_SID").unwrap_or_default();
        let auth_token = get("TWILIO_AUTH_TOKEN").unwrap_or_default();

        // Credentials only matter when sends can actually reach the provider.
        if enabled {
            if sender.is_empty() {
                return Err(ConfigError::Missing("TWILIO_WHATSAPP_NUMBER"));
            }
            if account_sid.is_empty() {
                return Err(ConfigError::Missing("TWILIO_ACCOUNT_SID"));
            }
            if auth_token.is_empty() {
                return Err(ConfigError::Missing("TWILIO_AUTH_TOKEN"));
            }
        }

        let bind_raw = get("API_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let bind_addr = bind_raw.parse().map_err(|_| ConfigError::Invalid {
            key: "API_BIND_ADDR",
            value: bind_raw.clone(),
        })?;

        Ok(Self {
            database_path: PathBuf::from(
                get("DATABASE_PATH").unwrap_or_else(|| DEFAULT_DATABASE_PATH.to_string()),
            ),
            bind_addr,
            reminders: ReminderConfig {
                enabled,
                sender,
                clinic_name: get("REMINDER_CLINIC_NAME")
                    .unwrap_or_else(|| DEFAULT_CLINIC_NAME.to_string()),
                fire_at,
                send_timeout_secs,
                max_concurrency,
            },
            twilio: TwilioConfig {
                account_sid,
                auth_token,
                api_base: get("TWILIO_API_BASE")
                    .unwrap_or_else(|| DEFAULT_TWILIO_API_BASE.to_string()),
            },
        })
    }
}

fn parse_bool(key: &'static str, value: &str) -> Result<bool, ConfigError> {
    match value.to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}

fn parse_positive(key: &'static str, value: &str) -> Result<u64, ConfigError> {
    match value.parse::<u64>() {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        }),
    }
}
