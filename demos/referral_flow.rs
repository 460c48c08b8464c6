//! Walks through a referral chain and an email verification.
//!
//! - Three users join, the later two through the first one's referral code
//! - The referrer's queue position and referral stats are printed
//! - A fixed development code is sent, mistyped once, then verified

use std::sync::Arc;

use waitlist::verification::{SendOtpResponse, VerifyOtpResponse};
use waitlist::{AppConfig, ManualClock, MemoryStore, WaitlistApp};

#[tokio::main]
async fn main() -> waitlist::Result<()> {
    println!("Waitlist: Referral Flow Example");
    println!("===============================\n");

    let mut config = AppConfig::default();
    config.verification.fixed_code = Some("111111".to_string());
    config.verification.log_codes = false;

    let app = WaitlistApp::new(
        &config,
        Arc::new(MemoryStore::new()),
        Arc::new(ManualClock::new(1_700_000_000_000)),
    );
    let registry = &app.registry;

    let ada = registry.register(&app.session, "ada@example.com", None).await?;
    println!("ada joined at #{} with code {}", ada.position, ada.referral_code);

    for email in ["grace@example.com", "linus@example.com"] {
        let user = registry
            .register(&app.session, email, Some(&ada.referral_code))
            .await?;
        println!("{} joined at #{} via ada", user.email, user.position);
    }

    if let Some(queue) = registry.queue_position(&ada.id).await? {
        println!(
            "\nada is now #{} of {} with {} referrals",
            queue.position, queue.total, queue.referral_count
        );
    }

    if let Some(stats) = registry.referral_stats(&ada.id).await? {
        println!("Referred by {}:", stats.code);
        for referred in &stats.users {
            println!("  {}", referred.email);
        }
        if let Some(progress) = app.milestone_progress(stats.count) {
            println!(
                "Next reward at {}: {} ({:.0}%)",
                progress.next.count, progress.next.reward, progress.percent
            );
        }
    }

    println!("\n--- Verification ---");
    let sent = SendOtpResponse::from(app.verification.send_otp("ada@example.com").await);
    println!("send:   {}", sent.message);

    let typo = VerifyOtpResponse::from(app.verification.verify_otp("ada@example.com", "111112").await);
    println!("verify: {}", typo.message);

    let verified =
        VerifyOtpResponse::from(app.verification.verify_otp("ada@example.com", "111111").await);
    println!("verify: {}", verified.message);

    Ok(())
}
