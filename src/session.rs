//! Current-user session.

use crate::registry::User;
use crate::storage::SecureStorage;
use crate::Result;

/// The signed-in waitlist user, persisted in a timed envelope.
///
/// Registry operations that change who is signed in take the session
/// explicitly instead of touching shared global state.
#[derive(Clone)]
pub struct UserSession {
    storage: SecureStorage,
}

impl UserSession {
    /// Suffix appended to the storage prefix.
    pub const KEY: &'static str = "current_user";

    pub fn new(storage: SecureStorage) -> Self {
        Self { storage }
    }

    /// Returns the signed-in user, if the session exists and has not timed out.
    pub fn current(&self) -> Result<Option<User>> {
        self.storage.get(Self::KEY)
    }

    /// Signs `user` in, replacing any previous session.
    pub fn set(&self, user: &User) -> Result<()> {
        self.storage.set(Self::KEY, user)
    }

    /// Signs out.
    pub fn clear(&self) -> Result<()> {
        self.storage.remove(Self::KEY)
    }

    /// Extends the session lifetime without changing the user.
    pub fn touch(&self) -> Result<()> {
        self.storage.refresh(Self::KEY)
    }
}
