use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::referral::Milestone;
use crate::{Error, Result};

/// Application configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Key-value store settings.
    pub storage: StorageSettings,
    /// Current-user session settings.
    pub session: SessionSettings,
    /// Queue and referral settings.
    pub waitlist: WaitlistSettings,
    /// One-time code settings.
    pub verification: VerificationSettings,
    /// Simulated latency settings.
    pub latency: LatencySettings,
    /// Referral milestones, ordered by ascending count.
    pub milestones: Vec<Milestone>,
}

/// Key-value store settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSettings {
    /// Path of the JSON file backing the CLI store.
    pub path: String,
    /// Prefix prepended to every key written through the envelope layer.
    pub prefix: String,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            path: "waitlist-data.json".to_string(),
            prefix: "sv_waitlist_".to_string(),
        }
    }
}

/// Session envelope settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSettings {
    /// Age in seconds after which an envelope is treated as absent.
    pub timeout_secs: u64,
}

impl SessionSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 30 * 60,
        }
    }
}

/// Queue and referral settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WaitlistSettings {
    /// Offset added to displayed ranks and totals.
    pub queue_offset: u64,
    /// Upper bound on the position bonus granted per referral event.
    pub max_referral_bonus: u64,
}

impl Default for WaitlistSettings {
    fn default() -> Self {
        Self {
            queue_offset: 3000,
            max_referral_bonus: 10,
        }
    }
}

/// One-time code settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct VerificationSettings {
    /// Number of digits in a code.
    pub otp_length: usize,
    /// Seconds a code stays valid.
    pub otp_expiry_secs: u64,
    /// Seconds between two code requests for the same email.
    pub resend_cooldown_secs: u64,
    /// Failed attempts that trigger a lockout.
    pub max_attempts: u32,
    /// Resends allowed per email until a successful verification.
    pub max_resends: u32,
    /// Seconds a lockout lasts.
    pub lockout_secs: u64,
    /// Development-only fixed code issued instead of a random one.
    pub fixed_code: Option<String>,
    /// Log issued codes through the development sink. Off in release builds
    /// unless set explicitly.
    pub log_codes: bool,
}

impl VerificationSettings {
    pub fn otp_expiry(&self) -> Duration {
        Duration::from_secs(self.otp_expiry_secs)
    }

    pub fn resend_cooldown(&self) -> Duration {
        Duration::from_secs(self.resend_cooldown_secs)
    }

    pub fn lockout(&self) -> Duration {
        Duration::from_secs(self.lockout_secs)
    }
}

impl Default for VerificationSettings {
    fn default() -> Self {
        Self {
            otp_length: 6,
            otp_expiry_secs: 5 * 60,
            resend_cooldown_secs: 60,
            max_attempts: 5,
            max_resends: 3,
            lockout_secs: 15 * 60,
            fixed_code: None,
            log_codes: cfg!(debug_assertions),
        }
    }
}

/// Artificial delays applied before operations resolve.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LatencySettings {
    /// Whether delays are applied at all.
    pub enabled: bool,
    pub register_ms: u64,
    pub lookup_ms: u64,
    pub query_ms: u64,
    pub send_ms: u64,
    pub verify_ms: u64,
}

impl Default for LatencySettings {
    fn default() -> Self {
        Self {
            enabled: false,
            register_ms: 500,
            lookup_ms: 300,
            query_ms: 200,
            send_ms: 800,
            verify_ms: 600,
        }
    }
}

impl AppConfig {
    /// Loads configuration from `.env` file, TOML file, and environment variables.
    ///
    /// Configuration priority (highest to lowest):
    /// 1. Environment variables with `WAITLIST_` prefix, sections separated by `__`
    ///    (e.g., `WAITLIST_VERIFICATION__MAX_ATTEMPTS=5`)
    /// 2. TOML configuration file (if exists)
    /// 3. `.env` file (if exists)
    /// 4. Built-in defaults
    ///
    /// The TOML file path can be set via `WAITLIST_CONFIG_PATH`. If not set, defaults to
    /// `./config/waitlist.toml`. A missing file is silently skipped.
    ///
    /// # Environment Variable Examples
    /// ```bash
    /// WAITLIST_STORAGE__PATH=/var/lib/waitlist/data.json
    /// WAITLIST_SESSION__TIMEOUT_SECS=3600
    /// WAITLIST_WAITLIST__QUEUE_OFFSET=3000
    /// WAITLIST_VERIFICATION__FIXED_CODE=111111
    /// WAITLIST_LATENCY__ENABLED=true
    /// ```
    ///
    /// # Errors
    /// Returns an error if the configuration is malformed or contains invalid values.
    pub fn from_env() -> Result<Self> {
        use figment::providers::{Env, Format, Serialized, Toml};
        use figment::Figment;

        let _ = dotenvy::dotenv();

        let config_path = std::env::var("WAITLIST_CONFIG_PATH")
            .unwrap_or_else(|_| "config/waitlist.toml".to_string());

        let config: Self = Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(&config_path).nested())
            .merge(Env::prefixed("WAITLIST_").split("__"))
            .extract()
            .map_err(|e| Error::InvalidConfig(e.to_string()))?;

        config.validate()?;
        Ok(config)
    }

    /// Returns the configured milestones, or the built-in ladder when none are set.
    pub fn milestones(&self) -> Vec<Milestone> {
        if self.milestones.is_empty() {
            Milestone::defaults()
        } else {
            self.milestones.clone()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] describing the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        let v = &self.verification;

        if v.otp_length == 0 {
            return Err(Error::InvalidConfig("otp_length cannot be zero".to_string()));
        }
        if v.max_attempts == 0 {
            return Err(Error::InvalidConfig(
                "max_attempts cannot be zero".to_string(),
            ));
        }
        if v.otp_expiry_secs == 0 {
            return Err(Error::InvalidConfig(
                "otp_expiry_secs cannot be zero".to_string(),
            ));
        }
        if let Some(code) = &v.fixed_code {
            if code.len() != v.otp_length || !code.chars().all(|c| c.is_ascii_digit()) {
                return Err(Error::InvalidConfig(format!(
                    "fixed_code must be {} digits",
                    v.otp_length
                )));
            }
        }

        if self.session.timeout_secs == 0 {
            return Err(Error::InvalidConfig(
                "session timeout_secs cannot be zero".to_string(),
            ));
        }

        // Verification state lives in a session envelope and must outlive its deadlines.
        if self.session.timeout_secs < v.lockout_secs {
            return Err(Error::InvalidConfig(format!(
                "session timeout_secs ({}) must cover lockout_secs ({})",
                self.session.timeout_secs, v.lockout_secs
            )));
        }
        if self.session.timeout_secs < v.otp_expiry_secs {
            return Err(Error::InvalidConfig(format!(
                "session timeout_secs ({}) must cover otp_expiry_secs ({})",
                self.session.timeout_secs, v.otp_expiry_secs
            )));
        }

        if self.storage.prefix.is_empty() {
            return Err(Error::InvalidConfig(
                "storage prefix cannot be empty".to_string(),
            ));
        }

        let milestones = self.milestones();
        if milestones.iter().any(|m| m.count == 0) {
            return Err(Error::InvalidConfig(
                "milestone counts must be positive".to_string(),
            ));
        }
        if milestones.windows(2).any(|w| w[0].count >= w[1].count) {
            return Err(Error::InvalidConfig(
                "milestones must be strictly ascending".to_string(),
            ));
        }

        Ok(())
    }
}
