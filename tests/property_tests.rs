use std::sync::Arc;

use proptest::prelude::*;
use waitlist::referral::mask_email;
use waitlist::registry::ranking::{apply_referral_bonus, rank_of};
use waitlist::{AppConfig, ManualClock, MemoryStore, User, WaitlistApp};

fn user(idx: usize, position: u64, referral_count: u64) -> User {
    User {
        id: format!("u{idx}"),
        email: format!("u{idx}@example.com"),
        referral_code: format!("SV-{idx:06}"),
        referred_by: None,
        referral_count,
        position,
        verified: true,
        joined_at: idx as u64,
    }
}

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .expect("runtime")
}

proptest! {
    #[test]
    fn referral_bonus_stays_in_bounds(
        position in 1u64..10_000,
        referral_count in 0u64..100,
        max_bonus in 0u64..20,
    ) {
        let mut referrer = user(0, position, referral_count);
        apply_referral_bonus(&mut referrer, max_bonus);

        prop_assert_eq!(referrer.referral_count, referral_count + 1);
        prop_assert!(referrer.position >= 1);
        prop_assert!(referrer.position <= position);
        prop_assert!(position - referrer.position <= max_bonus);
    }

    #[test]
    fn ranks_form_a_permutation(
        entries in prop::collection::vec((1u64..500, 0u64..50), 1..40),
    ) {
        let users: Vec<User> = entries
            .iter()
            .enumerate()
            .map(|(idx, &(position, count))| user(idx, position, count))
            .collect();

        let mut ranks: Vec<u64> = users
            .iter()
            .map(|u| rank_of(&users, &u.id).unwrap())
            .collect();
        ranks.sort_unstable();

        let expected: Vec<u64> = (1..=users.len() as u64).collect();
        prop_assert_eq!(ranks, expected);
    }

    #[test]
    fn equal_scores_keep_insertion_order(count in 2usize..30, score_position in 1u64..100) {
        let users: Vec<User> = (0..count).map(|idx| user(idx, score_position, 0)).collect();

        for (idx, u) in users.iter().enumerate() {
            prop_assert_eq!(rank_of(&users, &u.id), Some(idx as u64 + 1));
        }
    }

    #[test]
    fn masking_keeps_domain(local in "[a-z]{3,12}", domain in "[a-z]{1,8}\\.[a-z]{2,3}") {
        let masked = mask_email(&format!("{local}@{domain}"));
        prop_assert_eq!(masked, format!("{}***@{}", &local[..3], domain));
    }

    #[test]
    fn positions_are_unique_and_positive(referrals in prop::collection::vec(any::<Option<prop::sample::Index>>(), 1..15)) {
        let app = WaitlistApp::new(
            &AppConfig::default(),
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
        );

        runtime().block_on(async {
            let mut registered: Vec<User> = Vec::new();
            for (idx, referral) in referrals.iter().enumerate() {
                let code = referral
                    .as_ref()
                    .filter(|_| !registered.is_empty())
                    .map(|pick| registered[pick.index(registered.len())].referral_code.clone());
                let user = app
                    .registry
                    .register(&app.session, &format!("p{idx}@example.com"), code.as_deref())
                    .await
                    .unwrap();
                registered.push(user);
            }

            let mut ranks = Vec::new();
            for user in &registered {
                let stats = app.registry.queue_position(&user.id).await.unwrap().unwrap();
                assert!(stats.position > 3000);
                assert_eq!(stats.total, 3000 + registered.len() as u64);
                ranks.push(stats.position);
            }
            ranks.sort_unstable();
            ranks.dedup();
            assert_eq!(ranks.len(), registered.len());
        });
    }
}
