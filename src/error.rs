//! Error types for the waitlist and verification flows.

use crate::clock::Timestamp;

/// Main error types for the library.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The email address is already on the waitlist.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The email address is not shaped like an email address.
    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    /// A referral code does not match the expected code shape.
    #[error("Invalid referral code format")]
    InvalidCodeFormat,

    /// No registered user owns the referral code.
    #[error("Referral code not found")]
    ReferralNotFound,

    /// The code generator kept producing codes that are already taken.
    #[error("Could not draw an unused referral code after {0} attempts")]
    ReferralCodesExhausted(usize),

    /// The underlying key-value store rejected a read or write.
    #[error("Storage unavailable: {0}")]
    StorageUnavailable(String),

    /// A stored record could not be decoded.
    #[error("Corrupted data under key '{0}'")]
    CorruptedData(String),

    /// A value could not be encoded for storage.
    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    /// No verification is in progress for the email.
    #[error("No verification in progress. Please request a new code.")]
    NoSessionInProgress,

    /// Too many failed attempts; verification is suspended until `locked_until`.
    #[error("Too many failed attempts. Please try again later.")]
    AccountLocked {
        /// Epoch milliseconds at which the lockout ends.
        locked_until: Timestamp,
        /// Set to zero when this very attempt triggered the lockout.
        attempts_remaining: Option<u32>,
    },

    /// The verification code is past its deadline.
    #[error("Verification code has expired. Please request a new one.")]
    CodeExpired,

    /// The verification code did not match.
    #[error("Incorrect code. {attempts_remaining} {} remaining.", attempt_noun(.attempts_remaining))]
    IncorrectCode {
        /// Attempts left before the lockout.
        attempts_remaining: u32,
    },

    /// A new code was requested too soon after the previous one.
    #[error("Please wait before requesting another code.")]
    CooldownActive {
        /// Epoch milliseconds at which a new code may be requested.
        cooldown_until: Timestamp,
    },

    /// The code could not be handed to the delivery channel.
    #[error("Could not deliver verification code: {0}")]
    DeliveryFailed(String),

    /// The resend cap for this email has been reached.
    #[error("Maximum resend limit reached. Please try again later.")]
    MaxResendsReached,

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Returns true for errors caused by the backing store rather than by input.
    pub fn is_storage(&self) -> bool {
        matches!(
            self,
            Error::StorageUnavailable(_) | Error::CorruptedData(_) | Error::Serialization(_)
        )
    }
}

fn attempt_noun(count: &u32) -> &'static str {
    if *count == 1 {
        "attempt"
    } else {
        "attempts"
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;
