//! Follow-up Reminder Engine
//!
//! Decides which scheduled follow-ups need a WhatsApp reminder, sends it
//! through the provider and records every outcome on the follow-up itself.
//!
//! ## Architecture
//!
//! ```text
//! Scheduler → Selector → Runner → Dispatcher → Channel → Transport
//!                                     ↓
//!                                   Store (reminder state)
//! ```
//!
//! The on-demand paths (single and bulk resend, candidate listing) live on
//! `ReminderService` next to the daily run and share the same dispatcher.
//!
//! ## Reminder state machine
//! - `NOT_SENT → SENT` on a successful send
//! - `NOT_SENT | SENT → FAILED` on any send failure; `reminder_sent` keeps
//!   its previous value
//! - `SENT → DELIVERED` is reserved for provider receipts, not set here

pub mod error;
pub mod types;
pub mod traits;
pub mod store;
pub mod channel;
pub mod twilio;
pub mod dispatcher;
pub mod selector;
pub mod runner;
pub mod service;
pub mod scheduler;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{ReminderError, SendFailure, TransportError};
pub use types::*;
pub use traits::*;
pub use store::SqliteReminderStore;
pub use channel::{ChannelConfig, NotificationChannel};
pub use twilio::TwilioTransport;
pub use dispatcher::ReminderDispatcher;
pub use selector::{DueSetSelector, Window};
pub use service::ReminderService;
pub use scheduler::{start_reminder_scheduler, DailySchedule, DailyTrigger, ReminderSchedulerHandle};
