//! Waitlist registration with referral ranking and email verification.
//!
//! Two units sit over an injected key-value store and clock:
//!
//! - [`WaitlistRegistry`] keeps the ordered user list, credits referrals, and
//!   computes queue ranks and referral statistics.
//! - [`VerificationSession`] runs the one-time code lifecycle: issue, verify,
//!   resend, lock out after repeated failures, expire.
//!
//! [`WaitlistApp`] wires both to a store using an [`AppConfig`].
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use waitlist::{AppConfig, ManualClock, MemoryStore, WaitlistApp};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> waitlist::Result<()> {
//! let app = WaitlistApp::new(
//!     &AppConfig::default(),
//!     Arc::new(MemoryStore::new()),
//!     Arc::new(ManualClock::new(0)),
//! );
//!
//! let alice = app.registry.register(&app.session, "alice@example.com", None).await?;
//! let bob = app
//!     .registry
//!     .register(&app.session, "bob@example.com", Some(&alice.referral_code))
//!     .await?;
//!
//! let stats = app.registry.referral_stats(&alice.id).await?.unwrap();
//! assert_eq!(stats.count, 1);
//! assert_eq!(bob.position, 2);
//! # Ok(())
//! # }
//! ```

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod latency;
pub mod referral;
pub mod registry;
pub mod session;
pub mod storage;
pub mod verification;

pub use app::WaitlistApp;
pub use clock::{Clock, ManualClock, SystemClock, Timestamp};
pub use config::AppConfig;
pub use error::{Error, Result};
pub use referral::{Milestone, MilestoneProgress, RandomReferralCodes, ReferralCodes};
pub use registry::{QueueStats, ReferralStats, User, WaitlistRegistry};
pub use session::UserSession;
pub use storage::{FileStore, KeyValueStore, MemoryStore, Repository, SecureStorage};
pub use verification::{
    OtpDelivery, OtpIssued, VerificationSession, VerificationState, VerificationStatus,
};
