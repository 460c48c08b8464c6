//! Queue scoring.
//!
//! Two weightings coexist. Ranking uses `position - referral_count * 2`; the
//! position itself is lowered by `min(referral_count, cap)` whenever a
//! referral lands. Both are kept exactly as observed.

use super::User;

/// Weight of one referral in the ranking score.
pub const REFERRAL_SCORE_WEIGHT: i64 = 2;

/// Ranking score; lower ranks first.
pub fn score(user: &User) -> i64 {
    let position = i64::try_from(user.position).unwrap_or(i64::MAX);
    let referrals = i64::try_from(user.referral_count).unwrap_or(i64::MAX);
    position.saturating_sub(referrals.saturating_mul(REFERRAL_SCORE_WEIGHT))
}

/// Returns the 1-based rank of `user_id`, or `None` if absent.
///
/// The sort is stable: equal scores keep insertion order.
pub fn rank_of(users: &[User], user_id: &str) -> Option<u64> {
    let mut order: Vec<&User> = users.iter().collect();
    order.sort_by_key(|u| score(u));

    order
        .iter()
        .position(|u| u.id == user_id)
        .map(|idx| idx as u64 + 1)
}

/// Records a landed referral on `referrer`: bumps its count and lowers its
/// position by `min(referral_count, max_bonus)`, floored at 1.
pub fn apply_referral_bonus(referrer: &mut User, max_bonus: u64) {
    referrer.referral_count += 1;
    let bonus = referrer.referral_count.min(max_bonus);
    referrer.position = referrer.position.saturating_sub(bonus).max(1);
}
