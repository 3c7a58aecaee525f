//! Test doubles for the transport and clock seams.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};

use super::channel::{ChannelConfig, NotificationChannel};
use super::dispatcher::ReminderDispatcher;
use super::error::TransportError;
use super::store::SqliteReminderStore;
use super::traits::{Clock, MessageTransport};
use crate::db::sqlite::open_memory_database;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub from: String,
    pub to: String,
    pub body: String,
}

/// Transport that records every call and answers from a script.
pub struct RecordingTransport {
    calls: Mutex<Vec<SentMessage>>,
    counter: AtomicUsize,
    default_error: Option<TransportError>,
    failures_by_destination: HashMap<String, TransportError>,
    panic_destination: Option<String>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl RecordingTransport {
    pub fn ok() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            counter: AtomicUsize::new(0),
            default_error: None,
            failures_by_destination: HashMap::new(),
            panic_destination: None,
            delay: Duration::ZERO,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    pub fn failing(error: TransportError) -> Self {
        Self {
            default_error: Some(error),
            ..Self::ok()
        }
    }

    /// Fail only messages addressed to `phone` (bare number, no prefix).
    pub fn fail_for(mut self, phone: &str, error: TransportError) -> Self {
        self.failures_by_destination
            .insert(format!("whatsapp:{phone}"), error);
        self
    }

    /// Panic inside `send` for messages addressed to `phone`.
    pub fn panic_for(mut self, phone: &str) -> Self {
        self.panic_destination = Some(format!("whatsapp:{phone}"));
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn calls(&self) -> Vec<SentMessage> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }

    /// Highest number of sends observed running at the same time.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

impl MessageTransport for RecordingTransport {
    fn send(&self, from: &str, to: &str, body: &str) -> Result<String, TransportError> {
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        if self.panic_destination.as_deref() == Some(to) {
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            panic!("transport exploded for {to}");
        }

        self.calls.lock().unwrap().push(SentMessage {
            from: from.to_string(),
            to: to.to_string(),
            body: body.to_string(),
        });
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if let Some(err) = self.failures_by_destination.get(to) {
            return Err(err.clone());
        }
        if let Some(err) = &self.default_error {
            return Err(err.clone());
        }
        let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(format!("SM{n:032}"))
    }
}

/// Clock pinned to a settable instant.
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn at(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock().unwrap() = now;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock().unwrap()
    }
}

pub fn datetime(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// In-memory store plus a dispatcher wired to `transport` and `clock`.
pub struct Fixture {
    pub store: Arc<SqliteReminderStore>,
    pub transport: Arc<RecordingTransport>,
    pub clock: Arc<FixedClock>,
    pub dispatcher: Arc<ReminderDispatcher>,
}

impl Fixture {
    pub fn new(transport: RecordingTransport, now: NaiveDateTime) -> Self {
        Self::with_channel(transport, now, true)
    }

    pub fn with_channel(transport: RecordingTransport, now: NaiveDateTime, enabled: bool) -> Self {
        let store = Arc::new(SqliteReminderStore::new(
            open_memory_database().expect("Failed to open in-memory DB"),
        ));
        let transport = Arc::new(transport);
        let clock = Arc::new(FixedClock::at(now));
        let channel = NotificationChannel::new(
            ChannelConfig {
                enabled,
                sender: "whatsapp:+14155238886".into(),
                clinic_name: "Dr. Ramesh Tarakh Clinic".into(),
            },
            transport.clone(),
        );
        let dispatcher = Arc::new(ReminderDispatcher::new(
            store.clone(),
            store.clone(),
            channel,
            clock.clone(),
        ));
        Self {
            store,
            transport,
            clock,
            dispatcher,
        }
    }
}
