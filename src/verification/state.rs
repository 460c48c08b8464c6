use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::clock::{millis, Timestamp};

/// The single in-flight verification.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationState {
    /// Normalized email the code was issued for.
    pub email: String,
    /// Issued code.
    pub otp: String,
    /// Deadline after which the code no longer verifies.
    pub expires_at: Timestamp,
    /// Failed verify calls since the code was issued.
    pub attempts: u32,
    /// Resends issued for this email since the last success.
    pub resend_count: u32,
    /// Time the current code was issued.
    pub last_resend_at: Timestamp,
    /// End of the lockout, if one was triggered.
    pub locked_until: Option<Timestamp>,
}

impl VerificationState {
    /// Returns the lockout deadline if it is still in the future.
    pub fn active_lock(&self, now: Timestamp) -> Option<Timestamp> {
        self.locked_until.filter(|&until| now < until)
    }

    pub fn is_locked(&self, now: Timestamp) -> bool {
        self.active_lock(now).is_some()
    }

    pub fn is_expired(&self, now: Timestamp) -> bool {
        now > self.expires_at
    }

    /// Earliest time another code may be requested.
    pub fn cooldown_until(&self, cooldown: Duration) -> Timestamp {
        self.last_resend_at.saturating_add(millis(cooldown))
    }

    pub fn attempts_remaining(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempts)
    }
}
