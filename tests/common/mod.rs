//! Common test utilities shared across integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use waitlist::{AppConfig, KeyValueStore, ManualClock, MemoryStore, OtpDelivery, WaitlistApp};

/// Fixed start time for the manual clock, in epoch milliseconds.
pub const START: u64 = 1_700_000_000_000;

/// Initialize test tracing (call once at the beginning of tests).
///
/// Subsequent calls are safe and will be ignored.
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::new("waitlist=debug");

    let _ = tracing_subscriber::fmt()
        .with_test_writer()
        .with_env_filter(filter)
        .try_init();
}

/// Captures every delivered code instead of sending it anywhere.
#[derive(Default)]
pub struct RecordingDelivery {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingDelivery {
    /// The most recent code delivered to `email`.
    pub fn last_code(&self, email: &str) -> Option<String> {
        self.sent
            .lock()
            .unwrap()
            .iter()
            .rev()
            .find(|(to, _)| to == email)
            .map(|(_, code)| code.clone())
    }

    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

impl OtpDelivery for RecordingDelivery {
    fn deliver(&self, email: &str, code: &str) -> waitlist::Result<()> {
        self.sent
            .lock()
            .unwrap()
            .push((email.to_string(), code.to_string()));
        Ok(())
    }
}

pub struct Fixture {
    pub app: WaitlistApp,
    pub clock: ManualClock,
    pub delivery: Arc<RecordingDelivery>,
}

pub fn fixture() -> Fixture {
    fixture_with(AppConfig::default(), Arc::new(MemoryStore::new()))
}

pub fn fixture_with(config: AppConfig, store: Arc<dyn KeyValueStore>) -> Fixture {
    init_tracing();

    let clock = ManualClock::new(START);
    let delivery = Arc::new(RecordingDelivery::default());
    let app = WaitlistApp::with_delivery(&config, store, Arc::new(clock.clone()), delivery.clone());

    Fixture {
        app,
        clock,
        delivery,
    }
}
