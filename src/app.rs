//! Wiring of the registry, verification slot and session over one store.

use std::sync::Arc;

use crate::clock::Clock;
use crate::config::AppConfig;
use crate::latency::Latency;
use crate::referral::{milestones, Milestone, MilestoneProgress, RandomReferralCodes};
use crate::registry::WaitlistRegistry;
use crate::session::UserSession;
use crate::storage::{KeyValueStore, SecureStorage, UserRepository, VerificationRepository};
use crate::verification::{
    FixedOtp, LogDelivery, OtpDelivery, OtpGenerator, RandomOtp, VerificationSession,
};
use crate::Result;

/// All components sharing one key-value store and clock.
pub struct WaitlistApp {
    pub registry: WaitlistRegistry,
    pub verification: VerificationSession,
    pub session: UserSession,
    milestones: Vec<Milestone>,
    storage: SecureStorage,
}

impl WaitlistApp {
    /// Builds the app with codes delivered through the development log sink.
    pub fn new(config: &AppConfig, store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let delivery = Arc::new(LogDelivery::new(config.verification.log_codes));
        Self::with_delivery(config, store, clock, delivery)
    }

    /// Builds the app with a custom code delivery channel.
    pub fn with_delivery(
        config: &AppConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        delivery: Arc<dyn OtpDelivery>,
    ) -> Self {
        let storage = SecureStorage::new(
            store.clone(),
            clock.clone(),
            config.storage.prefix.clone(),
            config.session.timeout(),
        );
        let latency = Latency::new(config.latency.clone());

        let generator: Arc<dyn OtpGenerator> = match &config.verification.fixed_code {
            Some(code) => Arc::new(FixedOtp(code.clone())),
            None => Arc::new(RandomOtp),
        };

        let registry = WaitlistRegistry::new(
            Arc::new(UserRepository::new(store, &config.storage.prefix)),
            Arc::new(RandomReferralCodes),
            clock.clone(),
            config.waitlist.clone(),
        )
        .with_latency(latency.clone());

        let verification = VerificationSession::new(
            Arc::new(VerificationRepository::new(storage.clone())),
            generator,
            delivery,
            clock,
            config.verification.clone(),
        )
        .with_latency(latency);

        Self {
            registry,
            verification,
            session: UserSession::new(storage.clone()),
            milestones: config.milestones(),
            storage,
        }
    }

    /// Milestone progress for a referral count.
    pub fn milestone_progress(&self, referral_count: u64) -> Option<MilestoneProgress> {
        milestones::progress(&self.milestones, referral_count)
    }

    /// Removes the session and any verification in flight. Users are kept.
    pub fn sign_out(&self) -> Result<()> {
        self.session.clear()?;
        self.verification.reset()
    }

    /// Removes every key under the configured prefix, the user list included.
    pub fn clear_all(&self) -> Result<()> {
        self.storage.clear()
    }
}
