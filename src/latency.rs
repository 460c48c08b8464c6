//! Simulated request latency.

use std::time::Duration;

use crate::config::LatencySettings;

/// Operation classes with distinct simulated delays.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Operation {
    Register,
    Lookup,
    Query,
    SendCode,
    VerifyCode,
}

/// Applies the configured artificial delay before an operation runs.
#[derive(Clone, Debug, Default)]
pub struct Latency {
    settings: LatencySettings,
}

impl Latency {
    pub fn new(settings: LatencySettings) -> Self {
        Self { settings }
    }

    /// A latency model that never sleeps.
    pub fn none() -> Self {
        Self::default()
    }

    /// Returns the delay for `op`, zero when disabled.
    pub fn delay(&self, op: Operation) -> Duration {
        if !self.settings.enabled {
            return Duration::ZERO;
        }
        let ms = match op {
            Operation::Register => self.settings.register_ms,
            Operation::Lookup => self.settings.lookup_ms,
            Operation::Query => self.settings.query_ms,
            Operation::SendCode => self.settings.send_ms,
            Operation::VerifyCode => self.settings.verify_ms,
        };
        Duration::from_millis(ms)
    }

    /// Sleeps for the delay of `op`.
    pub async fn pause(&self, op: Operation) {
        let delay = self.delay(op);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_latency_is_zero() {
        let latency = Latency::none();
        assert_eq!(latency.delay(Operation::Register), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn enabled_latency_sleeps() {
        let latency = Latency::new(LatencySettings {
            enabled: true,
            ..LatencySettings::default()
        });
        assert_eq!(latency.delay(Operation::SendCode), Duration::from_millis(800));

        let start = tokio::time::Instant::now();
        latency.pause(Operation::VerifyCode).await;
        assert!(start.elapsed() >= Duration::from_millis(600));
    }
}
