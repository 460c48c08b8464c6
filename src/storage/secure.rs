use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{error, warn};

use super::KeyValueStore;
use crate::clock::{millis, Clock, Timestamp};
use crate::{Error, Result};

/// Stored wrapper recording when a value was written.
#[derive(Debug, Serialize, Deserialize)]
pub struct Envelope<T> {
    /// The wrapped value.
    pub value: T,
    /// Epoch milliseconds of the write.
    pub timestamp: Timestamp,
}

/// Prefixed, timestamped view over a [`KeyValueStore`].
///
/// Values are wrapped in an [`Envelope`]. Reads validate the envelope shape and
/// its age; malformed or timed-out entries are deleted and reported as absent.
#[derive(Clone)]
pub struct SecureStorage {
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    prefix: String,
    timeout: Duration,
}

impl SecureStorage {
    /// Creates an envelope layer writing keys as `prefix + key`.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        prefix: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            clock,
            prefix: prefix.into(),
            timeout,
        }
    }

    /// Returns the full store key for `key`.
    pub fn key(&self, key: &str) -> String {
        format!("{}{key}", self.prefix)
    }

    /// Returns the underlying store.
    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    /// Returns the clock used for envelope timestamps.
    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Writes `value` wrapped in a fresh envelope.
    pub fn set<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let envelope = Envelope {
            value,
            timestamp: self.clock.now(),
        };
        let serialized = serde_json::to_string(&envelope)?;
        self.store.set(&self.key(key), &serialized).map_err(|e| {
            error!(key, error = %e, "storage set failed");
            e
        })
    }

    /// Reads the value under `key`.
    ///
    /// Returns `Ok(None)` when the key is missing, when the stored envelope is
    /// malformed, or when it is older than the session timeout. The latter two
    /// also delete the entry.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let full_key = self.key(key);
        let Some(raw) = self.store.get(&full_key)? else {
            return Ok(None);
        };

        let envelope = match decode::<T>(&raw) {
            Ok(envelope) => envelope,
            Err(_) => {
                warn!(key = %full_key, "invalid storage data format, removing corrupted data");
                self.discard(key);
                return Ok(None);
            }
        };

        let age = self.clock.now().saturating_sub(envelope.timestamp);
        if age > millis(self.timeout) {
            self.discard(key);
            return Ok(None);
        }

        Ok(Some(envelope.value))
    }

    /// Removes the value under `key`.
    pub fn remove(&self, key: &str) -> Result<()> {
        self.store.remove(&self.key(key))
    }

    /// Removes every key carrying this layer's prefix.
    pub fn clear(&self) -> Result<()> {
        for key in self.store.keys()? {
            if key.starts_with(&self.prefix) {
                if let Err(e) = self.store.remove(&key) {
                    error!(key = %key, error = %e, "failed to remove key");
                }
            }
        }
        Ok(())
    }

    /// Re-stamps the envelope under `key` so it counts as freshly written.
    pub fn refresh(&self, key: &str) -> Result<()> {
        if let Some(value) = self.get::<serde_json::Value>(key)? {
            self.set(key, &value)?;
        }
        Ok(())
    }

    fn discard(&self, key: &str) {
        if let Err(e) = self.remove(key) {
            error!(key, error = %e, "failed to remove corrupted data");
        }
    }
}

/// Parses an envelope, rejecting anything without both `value` and a numeric `timestamp`.
pub fn decode<T: DeserializeOwned>(raw: &str) -> Result<Envelope<T>> {
    let corrupted = || Error::CorruptedData("envelope".to_string());

    let parsed: serde_json::Value = serde_json::from_str(raw).map_err(|_| corrupted())?;
    let object = parsed.as_object().ok_or_else(corrupted)?;
    if !object.contains_key("value") || !object.get("timestamp").is_some_and(|t| t.is_u64()) {
        return Err(corrupted());
    }

    serde_json::from_value(parsed).map_err(|_| corrupted())
}
