use serde::{Deserialize, Serialize};

/// Rewards granted for a finished session. Computed once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", from = "RewardWire")]
pub struct RewardResult {
    stars: u8,
    xp_earned: u32,
    coins_earned: u32,
    accuracy: f64,
    leveled_up: bool,
}

impl RewardResult {
    /// Builds a reward, clamping stars into `1..=3` and accuracy into `[0, 1]`.
    #[must_use]
    pub fn new(
        stars: u8,
        xp_earned: u32,
        coins_earned: u32,
        accuracy: f64,
        leveled_up: bool,
    ) -> Self {
        let accuracy = if accuracy.is_finite() {
            accuracy.clamp(0.0, 1.0)
        } else {
            0.0
        };
        Self {
            stars: stars.clamp(1, 3),
            xp_earned,
            coins_earned,
            accuracy,
            leveled_up,
        }
    }

    #[must_use]
    pub fn stars(&self) -> u8 {
        self.stars
    }

    #[must_use]
    pub fn xp_earned(&self) -> u32 {
        self.xp_earned
    }

    #[must_use]
    pub fn coins_earned(&self) -> u32 {
        self.coins_earned
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.leveled_up
    }
}

/// Reward as providers send it; deserialization clamps through `RewardResult::new`.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RewardWire {
    stars: u8,
    xp_earned: u32,
    coins_earned: u32,
    accuracy: f64,
    leveled_up: bool,
}

impl From<RewardWire> for RewardResult {
    fn from(wire: RewardWire) -> Self {
        Self::new(
            wire.stars,
            wire.xp_earned,
            wire.coins_earned,
            wire.accuracy,
            wire.leveled_up,
        )
    }
}

/// Fraction of answered questions that were correct; `0.0` when nothing was answered.
#[must_use]
pub fn accuracy(answered: u32, correct: u32) -> f64 {
    if answered == 0 {
        return 0.0;
    }
    f64::from(correct.min(answered)) / f64::from(answered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stars_are_clamped_to_valid_range() {
        assert_eq!(RewardResult::new(0, 0, 0, 0.0, false).stars(), 1);
        assert_eq!(RewardResult::new(9, 0, 0, 1.0, false).stars(), 3);
    }

    #[test]
    fn provider_json_is_clamped_on_read() {
        let json = r#"{"stars":0,"xpEarned":20,"coinsEarned":5,"accuracy":1.4,"leveledUp":false}"#;
        let reward: RewardResult = serde_json::from_str(json).unwrap();
        assert_eq!(reward.stars(), 1);
        assert_eq!(reward.accuracy(), 1.0);
        assert_eq!(reward.xp_earned(), 20);
    }

    #[test]
    fn accuracy_handles_empty_sessions() {
        assert_eq!(accuracy(0, 0), 0.0);
        assert_eq!(accuracy(4, 3), 0.75);
        assert_eq!(accuracy(2, 5), 1.0);
    }
}
