//! Waitlist registry.
//!
//! Registrations, logins, queue ranks and referral statistics over an ordered
//! user collection held in a [`Repository`].

use std::sync::Arc;

use metrics::counter;
use rand::rngs::OsRng;
use rand::RngCore;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::clock::Clock;
use crate::config::WaitlistSettings;
use crate::latency::{Latency, Operation};
use crate::referral::{mask_email, ReferralCodes};
use crate::session::UserSession;
use crate::storage::Repository;
use crate::{Error, Result};

/// Queue scoring.
pub mod ranking;

/// User and derived statistics types.
pub mod user;

pub use user::{QueueStats, ReferralStats, ReferredUser, User};

const MAX_CODE_DRAWS: usize = 64;

/// Registry of waitlist users.
pub struct WaitlistRegistry {
    users: Arc<dyn Repository<Vec<User>>>,
    codes: Arc<dyn ReferralCodes>,
    clock: Arc<dyn Clock>,
    settings: WaitlistSettings,
    latency: Latency,
    write_lock: Mutex<()>,
}

impl WaitlistRegistry {
    /// Creates a registry over the given user repository.
    pub fn new(
        users: Arc<dyn Repository<Vec<User>>>,
        codes: Arc<dyn ReferralCodes>,
        clock: Arc<dyn Clock>,
        settings: WaitlistSettings,
    ) -> Self {
        Self {
            users,
            codes,
            clock,
            settings,
            latency: Latency::none(),
            write_lock: Mutex::new(()),
        }
    }

    /// Applies simulated latency to every operation.
    pub fn with_latency(mut self, latency: Latency) -> Self {
        self.latency = latency;
        self
    }

    fn validate_email(email: &str) -> Result<()> {
        let invalid = || Error::InvalidEmail(email.to_string());

        let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
        if local.is_empty() || domain.contains('@') || email.chars().any(char::is_whitespace) {
            return Err(invalid());
        }

        match domain.rsplit_once('.') {
            Some((host, tld)) if !host.is_empty() && !tld.is_empty() => Ok(()),
            _ => Err(invalid()),
        }
    }

    fn draw_referral_code(&self, users: &[User]) -> Result<String> {
        for _ in 0..MAX_CODE_DRAWS {
            let code = self.codes.generate();
            if !users.iter().any(|u| u.referral_code == code) {
                return Ok(code);
            }
        }
        Err(Error::ReferralCodesExhausted(MAX_CODE_DRAWS))
    }

    fn draw_user_id(users: &[User]) -> String {
        let mut bytes = [0u8; 8];
        loop {
            OsRng.fill_bytes(&mut bytes);
            let id = hex::encode(bytes);
            if !users.iter().any(|u| u.id == id) {
                return id;
            }
        }
    }

    /// Adds `email` to the waitlist, optionally crediting the owner of `referral_code`.
    ///
    /// The new user takes the next sequence position. A referrer gains one
    /// referral and moves up by `min(referral_count, max_referral_bonus)`,
    /// never past position 1. On success the new user becomes the session user;
    /// if that session write fails the user list is restored.
    ///
    /// # Errors
    /// [`Error::InvalidEmail`], [`Error::DuplicateEmail`],
    /// [`Error::InvalidCodeFormat`], [`Error::ReferralNotFound`], and any
    /// storage failure while persisting.
    #[instrument(skip(self, session))]
    pub async fn register(
        &self,
        session: &UserSession,
        email: &str,
        referral_code: Option<&str>,
    ) -> Result<User> {
        counter!("waitlist.register.requests").increment(1);
        self.latency.pause(Operation::Register).await;

        let email = email.trim();
        Self::validate_email(email)?;

        let _guard = self.write_lock.lock().await;
        let mut users = self.users.load()?;

        if users.iter().any(|u| u.has_email(email)) {
            counter!("waitlist.register.duplicates").increment(1);
            return Err(Error::DuplicateEmail);
        }

        let referral_code = referral_code.map(str::trim).filter(|c| !c.is_empty());
        let referrer = match referral_code {
            Some(code) => {
                if !self.codes.is_valid(code) {
                    return Err(Error::InvalidCodeFormat);
                }
                let idx = users
                    .iter()
                    .position(|u| u.referral_code == code)
                    .ok_or(Error::ReferralNotFound)?;
                Some(idx)
            }
            None => None,
        };

        let user = User {
            id: Self::draw_user_id(&users),
            email: email.to_string(),
            referral_code: self.draw_referral_code(&users)?,
            referred_by: referral_code.map(str::to_string),
            referral_count: 0,
            position: users.len() as u64 + 1,
            verified: true,
            joined_at: self.clock.now(),
        };
        let previous = users.clone();
        users.push(user.clone());

        if let Some(idx) = referrer {
            let referrer = &mut users[idx];
            ranking::apply_referral_bonus(referrer, self.settings.max_referral_bonus);
            debug!(
                referrer = %referrer.id,
                referral_count = referrer.referral_count,
                position = referrer.position,
                "referral credited"
            );
        }

        self.users.save(&users)?;
        if let Err(e) = session.set(&user) {
            if let Err(rollback) = self.users.save(&previous) {
                error!(error = %rollback, "failed to roll back registration");
            }
            return Err(e);
        }

        counter!("waitlist.register.success").increment(1);
        info!(user_id = %user.id, position = user.position, "user registered");
        Ok(user)
    }

    /// Signs in an existing user by email.
    ///
    /// Returns `Ok(None)` when nobody registered with that email. A failure to
    /// write the session is logged and does not fail the login.
    #[instrument(skip(self, session))]
    pub async fn login(&self, session: &UserSession, email: &str) -> Result<Option<User>> {
        self.latency.pause(Operation::Lookup).await;

        let email = email.trim();
        let user = self.users.load()?.into_iter().find(|u| u.has_email(email));

        if let Some(user) = &user {
            if let Err(e) = session.set(user) {
                warn!(error = %e, "error storing user session");
            }
            info!(user_id = %user.id, "user logged in");
        }
        Ok(user)
    }

    /// Looks a user up by email, ignoring case.
    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.latency.pause(Operation::Lookup).await;

        let email = email.trim();
        Ok(self.users.load()?.into_iter().find(|u| u.has_email(email)))
    }

    /// Returns the session user; read failures are logged and yield `None`.
    pub fn current_user(&self, session: &UserSession) -> Option<User> {
        session.current().unwrap_or_else(|e| {
            warn!(error = %e, "error getting current user");
            None
        })
    }

    /// Ends the session; failures are logged.
    pub fn logout(&self, session: &UserSession) {
        if let Err(e) = session.clear() {
            warn!(error = %e, "error during logout");
        }
    }

    /// Re-reads `user_id` and stores the latest record as the session user.
    pub async fn refresh_user_data(
        &self,
        session: &UserSession,
        user_id: &str,
    ) -> Result<Option<User>> {
        let user = self.find(user_id)?;

        if let Some(user) = &user {
            if let Err(e) = session.set(user) {
                warn!(error = %e, "error refreshing user data");
            }
        }
        Ok(user)
    }

    /// Computes the displayed queue position of `user_id`.
    ///
    /// Returns `Ok(None)` for an unknown id.
    pub async fn queue_position(&self, user_id: &str) -> Result<Option<QueueStats>> {
        self.latency.pause(Operation::Query).await;

        let users = self.users.load()?;
        let Some(user) = users.iter().find(|u| u.id == user_id) else {
            return Ok(None);
        };
        let Some(rank) = ranking::rank_of(&users, user_id) else {
            return Ok(None);
        };

        let offset = self.settings.queue_offset;
        Ok(Some(QueueStats {
            position: rank + offset,
            total: users.len() as u64 + offset,
            referral_count: user.referral_count,
        }))
    }

    /// Summarizes who registered with the referral code of `user_id`.
    ///
    /// Returns `Ok(None)` for an unknown id.
    pub async fn referral_stats(&self, user_id: &str) -> Result<Option<ReferralStats>> {
        self.latency.pause(Operation::Query).await;

        let users = self.users.load()?;
        let Some(user) = users.iter().find(|u| u.id == user_id) else {
            return Ok(None);
        };

        let referred: Vec<ReferredUser> = users
            .iter()
            .filter(|u| u.referred_by.as_deref() == Some(user.referral_code.as_str()))
            .map(|u| ReferredUser {
                email: mask_email(&u.email),
                joined_at: u.joined_at,
            })
            .collect();

        Ok(Some(ReferralStats {
            code: user.referral_code.clone(),
            count: referred.len() as u64,
            users: referred,
        }))
    }

    /// Returns the number of registered users.
    pub async fn user_count(&self) -> Result<usize> {
        Ok(self.users.load()?.len())
    }

    fn find(&self, user_id: &str) -> Result<Option<User>> {
        Ok(self.users.load()?.into_iter().find(|u| u.id == user_id))
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::referral::RandomReferralCodes;
    use crate::storage::{MemoryStore, SecureStorage, UserRepository};

    fn registry() -> (WaitlistRegistry, UserSession) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let users = Arc::new(UserRepository::new(store.clone(), "sv_waitlist_"));
        let session = UserSession::new(SecureStorage::new(
            store,
            clock.clone(),
            "sv_waitlist_",
            Duration::from_secs(1800),
        ));
        let registry = WaitlistRegistry::new(
            users,
            Arc::new(RandomReferralCodes),
            clock,
            WaitlistSettings::default(),
        );
        (registry, session)
    }

    #[test]
    fn email_validation() {
        for ok in ["a@x.com", "first.last@sub.example.org"] {
            assert!(WaitlistRegistry::validate_email(ok).is_ok(), "{ok}");
        }
        for bad in ["", "plain", "@x.com", "a@", "a@x", "a@.com", "a@x.", "a@b@c.com", "a b@x.com"] {
            assert!(WaitlistRegistry::validate_email(bad).is_err(), "{bad}");
        }
    }

    #[tokio::test]
    async fn register_assigns_sequential_positions() {
        let (registry, session) = registry();

        let a = registry.register(&session, "a@x.com", None).await.unwrap();
        let b = registry.register(&session, "b@x.com", None).await.unwrap();

        assert_eq!(a.position, 1);
        assert_eq!(b.position, 2);
        assert_ne!(a.referral_code, b.referral_code);
        assert_eq!(registry.current_user(&session).unwrap().id, b.id);
        assert_eq!(registry.user_count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn duplicate_email_ignores_case() {
        let (registry, session) = registry();
        registry.register(&session, "a@x.com", None).await.unwrap();

        let err = registry
            .register(&session, "A@X.COM", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::DuplicateEmail));
    }

    #[tokio::test]
    async fn empty_referral_code_is_ignored() {
        let (registry, session) = registry();
        let user = registry
            .register(&session, "a@x.com", Some("  "))
            .await
            .unwrap();
        assert_eq!(user.referred_by, None);
    }

    #[tokio::test]
    async fn logout_clears_current_user() {
        let (registry, session) = registry();
        registry.register(&session, "a@x.com", None).await.unwrap();

        registry.logout(&session);
        assert!(registry.current_user(&session).is_none());

        let user = registry.login(&session, "A@x.com").await.unwrap().unwrap();
        assert_eq!(registry.current_user(&session), Some(user));
    }
}
