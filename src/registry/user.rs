use serde::{Deserialize, Serialize};

use crate::clock::Timestamp;

/// A waitlist registrant.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Opaque identifier.
    pub id: String,
    /// Email as entered; unique ignoring case.
    pub email: String,
    /// This user's own code to hand out.
    pub referral_code: String,
    /// Code used at registration, if any.
    pub referred_by: Option<String>,
    /// Registrations that used this user's code.
    pub referral_count: u64,
    /// Sequence number, lowered by referral bonuses, never below 1.
    pub position: u64,
    /// Whether the email was confirmed before registering.
    pub verified: bool,
    /// Registration time.
    pub joined_at: Timestamp,
}

impl User {
    /// Case-insensitive email comparison.
    pub fn has_email(&self, email: &str) -> bool {
        self.email.to_lowercase() == email.to_lowercase()
    }
}

/// A user's displayed place in the queue.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    /// Rank among all users plus the display offset.
    pub position: u64,
    /// Registered users plus the display offset.
    pub total: u64,
    pub referral_count: u64,
}

/// A referred user as shown to the referrer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferredUser {
    /// Masked email.
    pub email: String,
    pub joined_at: Timestamp,
}

/// Referral summary for one user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferralStats {
    pub code: String,
    pub count: u64,
    pub users: Vec<ReferredUser>,
}
