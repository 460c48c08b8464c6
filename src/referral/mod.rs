//! Referral codes, email masking and milestone tracking.

use rand::rngs::OsRng;
use rand::Rng;

/// Referral milestone ladder.
pub mod milestones;

pub use milestones::{Milestone, MilestoneProgress};

const CODE_PREFIX: &str = "SV-";
const CODE_BODY_LEN: usize = 6;
const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

/// Generates and validates referral codes.
///
/// Uniqueness across the waitlist is enforced by the registry, which keeps
/// generating until it draws a code nobody owns.
pub trait ReferralCodes: Send + Sync {
    /// Draws a new code.
    fn generate(&self) -> String;

    /// Checks a code's shape without looking it up.
    fn is_valid(&self, code: &str) -> bool;
}

/// Random `SV-XXXXXX` codes drawn from the OS RNG.
///
/// The alphabet leaves out `0`, `1`, `I` and `O`.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomReferralCodes;

impl ReferralCodes for RandomReferralCodes {
    fn generate(&self) -> String {
        let mut rng = OsRng;
        let body: String = (0..CODE_BODY_LEN)
            .map(|_| char::from(CODE_ALPHABET[rng.gen_range(0..CODE_ALPHABET.len())]))
            .collect();
        format!("{CODE_PREFIX}{body}")
    }

    fn is_valid(&self, code: &str) -> bool {
        code.strip_prefix(CODE_PREFIX).is_some_and(|body| {
            body.len() == CODE_BODY_LEN && body.bytes().all(|b| CODE_ALPHABET.contains(&b))
        })
    }
}

/// Masks an email for display: the first three characters stay, the rest of
/// the local part becomes `***`.
///
/// Addresses whose local part has fewer than three characters are returned
/// unchanged.
pub fn mask_email(email: &str) -> String {
    let Some(at) = email.rfind('@') else {
        return email.to_string();
    };
    let local = &email[..at];
    if local.chars().count() < 3 {
        return email.to_string();
    }

    let kept: String = local.chars().take(3).collect();
    format!("{kept}***{}", &email[at..])
}
