use std::sync::Arc;

use tracing::{error, warn};

use super::{KeyValueStore, SecureStorage};
use crate::registry::User;
use crate::verification::VerificationState;
use crate::Result;

/// Whole-collection persistence.
///
/// Callers read the entire collection, mutate it in memory, and write it back.
pub trait Repository<T>: Send + Sync {
    /// Loads the collection; an absent collection loads as its empty value.
    fn load(&self) -> Result<T>;

    /// Replaces the stored collection.
    fn save(&self, value: &T) -> Result<()>;
}

/// Ordered user list stored as a raw JSON array.
pub struct UserRepository {
    store: Arc<dyn KeyValueStore>,
    key: String,
}

impl UserRepository {
    /// Suffix appended to the storage prefix.
    pub const KEY: &'static str = "users";

    /// Creates a repository writing to `prefix + "users"`.
    pub fn new(store: Arc<dyn KeyValueStore>, prefix: &str) -> Self {
        Self {
            store,
            key: format!("{prefix}{}", Self::KEY),
        }
    }

    /// Returns the full store key.
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Repository<Vec<User>> for UserRepository {
    fn load(&self) -> Result<Vec<User>> {
        let Some(raw) = self.store.get(&self.key)? else {
            return Ok(Vec::new());
        };

        match serde_json::from_str(&raw) {
            Ok(users) => Ok(users),
            Err(e) => {
                warn!(key = %self.key, error = %e, "error loading users, removing corrupted data");
                if let Err(e) = self.store.remove(&self.key) {
                    error!(key = %self.key, error = %e, "failed to remove corrupted data");
                }
                Ok(Vec::new())
            }
        }
    }

    fn save(&self, users: &Vec<User>) -> Result<()> {
        let serialized = serde_json::to_string(users)?;
        self.store.set(&self.key, &serialized)
    }
}

/// Single-slot verification state stored in a timed envelope.
pub struct VerificationRepository {
    storage: SecureStorage,
}

impl VerificationRepository {
    /// Suffix appended to the storage prefix.
    pub const KEY: &'static str = "sv_verification_state";

    pub fn new(storage: SecureStorage) -> Self {
        Self { storage }
    }
}

impl Repository<Option<VerificationState>> for VerificationRepository {
    fn load(&self) -> Result<Option<VerificationState>> {
        self.storage.get(Self::KEY)
    }

    fn save(&self, state: &Option<VerificationState>) -> Result<()> {
        match state {
            Some(state) => self.storage.set(Self::KEY, state),
            None => self.storage.remove(Self::KEY),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::clock::ManualClock;
    use crate::storage::MemoryStore;

    fn user(email: &str, position: u64) -> User {
        User {
            id: format!("id-{position}"),
            email: email.to_string(),
            referral_code: format!("SV-AAAA{position:02}"),
            referred_by: None,
            referral_count: 0,
            position,
            verified: true,
            joined_at: 1_000 + position,
        }
    }

    #[test]
    fn users_round_trip_in_order() {
        let store = Arc::new(MemoryStore::new());
        let repo = UserRepository::new(store.clone(), "sv_waitlist_");
        assert!(repo.load().unwrap().is_empty());

        let users = vec![user("b@x.com", 1), user("a@x.com", 2)];
        repo.save(&users).unwrap();

        assert!(store.get("sv_waitlist_users").unwrap().is_some());
        assert_eq!(repo.load().unwrap(), users);
    }

    #[test]
    fn corrupted_users_self_heal() {
        let store = Arc::new(MemoryStore::new());
        store.set("sv_waitlist_users", "{broken").unwrap();

        let repo = UserRepository::new(store.clone(), "sv_waitlist_");
        assert!(repo.load().unwrap().is_empty());
        assert!(store.get("sv_waitlist_users").unwrap().is_none());
    }

    #[test]
    fn verification_state_uses_enveloped_key() {
        let store = Arc::new(MemoryStore::new());
        let clock = ManualClock::new(0);
        let storage = SecureStorage::new(
            store.clone(),
            Arc::new(clock),
            "sv_waitlist_",
            Duration::from_secs(600),
        );
        let repo = VerificationRepository::new(storage);

        let state = VerificationState {
            email: "a@x.com".to_string(),
            otp: "123456".to_string(),
            expires_at: 300_000,
            attempts: 0,
            resend_count: 0,
            last_resend_at: 0,
            locked_until: None,
        };
        repo.save(&Some(state.clone())).unwrap();
        assert!(store
            .get("sv_waitlist_sv_verification_state")
            .unwrap()
            .is_some());
        assert_eq!(repo.load().unwrap(), Some(state));

        repo.save(&None).unwrap();
        assert_eq!(repo.load().unwrap(), None);
    }
}
