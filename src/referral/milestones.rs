use serde::{Deserialize, Serialize};

/// A referral count that unlocks a reward.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Milestone {
    /// Referrals required.
    pub count: u64,
    /// Reward description.
    pub reward: String,
}

impl Milestone {
    pub fn new(count: u64, reward: impl Into<String>) -> Self {
        Self {
            count,
            reward: reward.into(),
        }
    }

    /// The built-in milestone ladder.
    pub fn defaults() -> Vec<Milestone> {
        vec![
            Milestone::new(1, "Priority queue boost"),
            Milestone::new(3, "Early beta access"),
            Milestone::new(5, "Founding member badge"),
            Milestone::new(10, "Three months free"),
            Milestone::new(25, "Lifetime access"),
        ]
    }
}

/// Where a referral count sits on the milestone ladder.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MilestoneProgress {
    /// First milestone above the count, or the last one once all are reached.
    pub next: Milestone,
    /// Percentage toward `next`, capped at 100.
    pub percent: f64,
    /// Referrals still needed for `next`; zero once every milestone is reached.
    pub remaining: u64,
    /// Milestones already reached.
    pub achieved: Vec<Milestone>,
}

impl MilestoneProgress {
    /// Returns true when every milestone has been reached.
    pub fn all_unlocked(&self) -> bool {
        self.remaining == 0
    }
}

/// Computes progress of `referral_count` along `milestones`.
///
/// Returns `None` for an empty ladder.
pub fn progress(milestones: &[Milestone], referral_count: u64) -> Option<MilestoneProgress> {
    let last = milestones.last()?;
    let next = milestones
        .iter()
        .find(|m| m.count > referral_count)
        .unwrap_or(last)
        .clone();

    let percent = ((referral_count as f64 / next.count as f64) * 100.0).min(100.0);
    let achieved = milestones
        .iter()
        .filter(|m| referral_count >= m.count)
        .cloned()
        .collect();

    Some(MilestoneProgress {
        remaining: next.count.saturating_sub(referral_count),
        next,
        percent,
        achieved,
    })
}
