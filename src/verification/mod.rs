//! Email verification with one-time codes.
//!
//! At most one verification is in flight at a time, keyed by email. The state
//! machine has three observable states:
//!
//! - no session: nothing stored, or the stored state belongs to another email
//! - active: a code was issued and may still verify
//! - locked: too many failed attempts; `locked_until` is in the future
//!
//! Expiry is never stored. Every operation compares the clock against
//! `expires_at` and `locked_until` before acting.

use std::sync::Arc;

use metrics::counter;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::clock::{millis, Clock, Timestamp};
use crate::config::VerificationSettings;
use crate::latency::{Latency, Operation};
use crate::storage::Repository;
use crate::{Error, Result};

/// Code generation and delivery.
pub mod otp;

/// Response projections.
pub mod response;

/// Persisted verification state.
pub mod state;

pub use otp::{FixedOtp, LogDelivery, OtpDelivery, OtpGenerator, RandomOtp};
pub use response::{ResendOtpResponse, SendOtpResponse, VerifyOtpResponse};
pub use state::VerificationState;

/// A code was issued and handed to the delivery channel.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OtpIssued {
    pub email: String,
    pub expires_at: Timestamp,
    pub resend_count: u32,
}

/// Read-only view of the verification slot.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationStatus {
    /// A code is outstanding and neither expired nor locked.
    pub in_progress: bool,
    pub email: Option<String>,
    pub expires_at: Option<Timestamp>,
    pub attempts_remaining: Option<u32>,
    pub locked_until: Option<Timestamp>,
    /// Cooldown elapsed and resend cap not reached. False without a session.
    pub can_resend: bool,
    /// When resending becomes possible; only set while it is not.
    pub resend_cooldown_until: Option<Timestamp>,
}

/// One-time code verification over a single-slot repository.
pub struct VerificationSession {
    state: Arc<dyn Repository<Option<VerificationState>>>,
    generator: Arc<dyn OtpGenerator>,
    delivery: Arc<dyn OtpDelivery>,
    clock: Arc<dyn Clock>,
    settings: VerificationSettings,
    latency: Latency,
    lock: Mutex<()>,
}

impl VerificationSession {
    /// Creates a verification session.
    pub fn new(
        state: Arc<dyn Repository<Option<VerificationState>>>,
        generator: Arc<dyn OtpGenerator>,
        delivery: Arc<dyn OtpDelivery>,
        clock: Arc<dyn Clock>,
        settings: VerificationSettings,
    ) -> Self {
        Self {
            state,
            generator,
            delivery,
            clock,
            settings,
            latency: Latency::none(),
            lock: Mutex::new(()),
        }
    }

    /// Applies simulated latency to every operation.
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    /// Returns the active settings.
    pub fn settings(&self) -> &VerificationSettings {
        &self.settings
    }

    fn normalize(email: &str) -> String {
        email.trim().to_lowercase()
    }

    fn load_for(&self, email: &str) -> Result<(Option<VerificationState>, bool)> {
        let stored = self.state.load()?;
        let same_email = stored.as_ref().is_some_and(|s| s.email == email);
        Ok((stored, same_email))
    }

    fn check_lock(state: &VerificationState, now: Timestamp) -> Result<()> {
        match state.active_lock(now) {
            Some(locked_until) => Err(Error::AccountLocked {
                locked_until,
                attempts_remaining: None,
            }),
            None => Ok(()),
        }
    }

    fn check_cooldown(&self, state: &VerificationState, now: Timestamp) -> Result<()> {
        let cooldown_until = state.cooldown_until(self.settings.resend_cooldown());
        if now < cooldown_until {
            return Err(Error::CooldownActive { cooldown_until });
        }
        Ok(())
    }

    fn issue(&self, email: String, resend_count: u32, now: Timestamp) -> Result<OtpIssued> {
        let code = self.generator.generate(self.settings.otp_length);
        let expires_at = now.saturating_add(millis(self.settings.otp_expiry()));

        // Nothing is stored for a code that never reached the user.
        self.delivery.deliver(&email, &code)?;

        self.state.save(&Some(VerificationState {
            email: email.clone(),
            otp: code.clone(),
            expires_at,
            attempts: 0,
            resend_count,
            last_resend_at: now,
            locked_until: None,
        }))?;

        Ok(OtpIssued {
            email,
            expires_at,
            resend_count,
        })
    }

    /// Issues a fresh code for `email`, replacing any verification for another email.
    ///
    /// # Errors
    /// [`Error::AccountLocked`] while this email is locked out,
    /// [`Error::CooldownActive`] if the previous code for this email is too recent,
    /// [`Error::DeliveryFailed`], and storage failures.
    #[instrument(skip(self))]
    pub async fn send_otp(&self, email: &str) -> Result<OtpIssued> {
        counter!("verification.send.requests").increment(1);
        self.latency.pause(Operation::SendCode).await;

        let email = Self::normalize(email);
        let _guard = self.lock.lock().await;
        let now = self.clock.now();

        let (stored, same_email) = self.load_for(&email)?;
        let mut resend_count = 0;
        if let Some(state) = stored.as_ref().filter(|_| same_email) {
            Self::check_lock(state, now)?;
            self.check_cooldown(state, now)?;
            resend_count = state.resend_count;
        }

        let issued = self.issue(email, resend_count, now)?;
        info!(expires_at = issued.expires_at, "verification code sent");
        Ok(issued)
    }

    /// Issues a replacement code for `email`, counting against the resend cap.
    ///
    /// The cap is checked before the cooldown, so a capped email gets
    /// [`Error::MaxResendsReached`] even while cooling down.
    ///
    /// # Errors
    /// [`Error::AccountLocked`], [`Error::MaxResendsReached`],
    /// [`Error::CooldownActive`], [`Error::DeliveryFailed`], and storage failures.
    #[instrument(skip(self))]
    pub async fn resend_otp(&self, email: &str) -> Result<OtpIssued> {
        counter!("verification.resend.requests").increment(1);
        self.latency.pause(Operation::SendCode).await;

        let email = Self::normalize(email);
        let _guard = self.lock.lock().await;
        let now = self.clock.now();

        let (stored, same_email) = self.load_for(&email)?;
        let mut resend_count = 1;
        if let Some(state) = stored.as_ref().filter(|_| same_email) {
            Self::check_lock(state, now)?;
            if state.resend_count >= self.settings.max_resends {
                counter!("verification.resend.capped").increment(1);
                return Err(Error::MaxResendsReached);
            }
            self.check_cooldown(state, now)?;
            resend_count = state.resend_count + 1;
        }

        let issued = self.issue(email, resend_count, now)?;
        info!(resend_count, "verification code resent");
        Ok(issued)
    }

    /// Checks `code` against the outstanding code for `email`.
    ///
    /// A match clears the slot. A mismatch consumes one attempt; the attempt
    /// that reaches the maximum starts a lockout and is reported as
    /// [`Error::AccountLocked`] with zero attempts remaining. An expired code
    /// is rejected without consuming an attempt.
    ///
    /// # Errors
    /// [`Error::NoSessionInProgress`], [`Error::AccountLocked`],
    /// [`Error::CodeExpired`], [`Error::IncorrectCode`], and storage failures.
    #[instrument(skip(self, code))]
    pub async fn verify_otp(&self, email: &str, code: &str) -> Result<()> {
        counter!("verification.verify.requests").increment(1);
        self.latency.pause(Operation::VerifyCode).await;

        let email = Self::normalize(email);
        let _guard = self.lock.lock().await;
        let now = self.clock.now();

        let (stored, same_email) = self.load_for(&email)?;
        let Some(mut state) = stored.filter(|_| same_email) else {
            return Err(Error::NoSessionInProgress);
        };

        Self::check_lock(&state, now)?;

        if state.is_expired(now) {
            debug!(expires_at = state.expires_at, "code expired");
            return Err(Error::CodeExpired);
        }

        if otp::codes_match(&state.otp, code.trim()) {
            self.state.save(&None)?;
            counter!("verification.verify.success").increment(1);
            info!("email verified");
            return Ok(());
        }

        counter!("verification.verify.failures").increment(1);
        state.attempts += 1;

        if state.attempts >= self.settings.max_attempts {
            let locked_until = now.saturating_add(millis(self.settings.lockout()));
            state.locked_until = Some(locked_until);
            self.state.save(&Some(state))?;
            warn!(locked_until, "too many failed attempts, verification locked");
            return Err(Error::AccountLocked {
                locked_until,
                attempts_remaining: Some(0),
            });
        }

        let attempts_remaining = state.attempts_remaining(self.settings.max_attempts);
        self.state.save(&Some(state))?;
        Err(Error::IncorrectCode { attempts_remaining })
    }

    /// Projects the current slot for display.
    pub fn status(&self) -> Result<VerificationStatus> {
        let Some(state) = self.state.load()? else {
            return Ok(VerificationStatus::default());
        };

        let now = self.clock.now();
        let resend_cooldown_until = state.cooldown_until(self.settings.resend_cooldown());
        let can_resend =
            now > resend_cooldown_until && state.resend_count < self.settings.max_resends;

        Ok(VerificationStatus {
            in_progress: !state.is_expired(now) && !state.is_locked(now),
            email: Some(state.email.clone()),
            expires_at: Some(state.expires_at),
            attempts_remaining: Some(state.attempts_remaining(self.settings.max_attempts)),
            locked_until: state.locked_until,
            can_resend,
            resend_cooldown_until: (!can_resend).then_some(resend_cooldown_until),
        })
    }

    /// Discards any verification in flight.
    pub fn reset(&self) -> Result<()> {
        self.state.save(&None)
    }
}
