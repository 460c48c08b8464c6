use rand::rngs::OsRng;
use rand::Rng;
use tracing::info;

use crate::Result;

/// Produces one-time codes.
pub trait OtpGenerator: Send + Sync {
    /// Returns a numeric code of exactly `length` digits.
    fn generate(&self, length: usize) -> String;
}

/// Uniformly random digits from the OS RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct RandomOtp;

impl OtpGenerator for RandomOtp {
    fn generate(&self, length: usize) -> String {
        let mut rng = OsRng;
        (0..length)
            .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
            .collect()
    }
}

/// Always issues the same code. Development only.
#[derive(Clone, Debug)]
pub struct FixedOtp(pub String);

impl OtpGenerator for FixedOtp {
    fn generate(&self, _length: usize) -> String {
        self.0.clone()
    }
}

/// Hands an issued code to the user by some out-of-band channel.
pub trait OtpDelivery: Send + Sync {
    fn deliver(&self, email: &str, code: &str) -> Result<()>;
}

/// Development sink that writes codes to the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogDelivery {
    enabled: bool,
}

impl LogDelivery {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }
}

impl OtpDelivery for LogDelivery {
    fn deliver(&self, email: &str, code: &str) -> Result<()> {
        if self.enabled {
            info!(target: "waitlist::dev", email, code, "[DEV] verification code issued");
        }
        Ok(())
    }
}

/// Compares codes without short-circuiting on the first differing byte.
pub fn codes_match(expected: &str, given: &str) -> bool {
    let (a, b) = (expected.as_bytes(), given.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
