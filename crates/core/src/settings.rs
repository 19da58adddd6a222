use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::model::{RewardResult, accuracy};

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum SettingsError {
    #[error("base step must be positive and finite, got {provided}")]
    InvalidBaseStep { provided: f64 },

    #[error("gap range must satisfy 0 <= min <= max, got [{min}, {max}]")]
    InvalidGapRange { min: f64, max: f64 },

    #[error("x bounds must satisfy 0 <= min < max <= 100, got [{min}, {max}]")]
    InvalidXBounds { min: f64, max: f64 },

    #[error("{field} must be non-negative and finite, got {provided}")]
    NegativeValue { field: &'static str, provided: f64 },

    #[error("star thresholds must satisfy 0 < two <= three <= 1")]
    InvalidStarThresholds,

    #[error("xp per level must be > 0")]
    InvalidXpPerLevel,
}

//
// ─── TRAIL SETTINGS ────────────────────────────────────────────────────────────
//

/// Geometry constants for the procedurally laid-out trail.
///
/// Vertical values are in track pixels; horizontal values are percent of the
/// track width.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrailSettings {
    top_padding: f64,
    bottom_padding: f64,
    base_step: f64,
    gap_min: f64,
    gap_max: f64,
    gap_salt: f64,
    milestone_extra_gap: f64,
    swing_amplitude: f64,
    x_jitter: f64,
    x_salt: f64,
    x_min: f64,
    x_max: f64,
}

impl Default for TrailSettings {
    fn default() -> Self {
        Self {
            top_padding: 56.0,
            bottom_padding: 72.0,
            base_step: 92.0,
            gap_min: 0.0,
            gap_max: 26.0,
            gap_salt: 1.618,
            milestone_extra_gap: 24.0,
            swing_amplitude: 24.0,
            x_jitter: 5.0,
            x_salt: 4.2,
            x_min: 16.0,
            x_max: 84.0,
        }
    }
}

impl TrailSettings {
    /// Creates custom trail settings.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError` when a step is not positive, the gap range is
    /// inverted, or the horizontal bounds fall outside `[0, 100]`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        top_padding: f64,
        bottom_padding: f64,
        base_step: f64,
        gap_min: f64,
        gap_max: f64,
        milestone_extra_gap: f64,
        swing_amplitude: f64,
        x_jitter: f64,
        x_min: f64,
        x_max: f64,
    ) -> Result<Self, SettingsError> {
        if !base_step.is_finite() || base_step <= 0.0 {
            return Err(SettingsError::InvalidBaseStep {
                provided: base_step,
            });
        }
        if !(gap_min.is_finite() && gap_max.is_finite()) || gap_min < 0.0 || gap_min > gap_max {
            return Err(SettingsError::InvalidGapRange {
                min: gap_min,
                max: gap_max,
            });
        }
        if !(x_min.is_finite() && x_max.is_finite()) || x_min < 0.0 || x_max > 100.0 || x_min >= x_max
        {
            return Err(SettingsError::InvalidXBounds {
                min: x_min,
                max: x_max,
            });
        }
        for (field, value) in [
            ("top padding", top_padding),
            ("bottom padding", bottom_padding),
            ("milestone extra gap", milestone_extra_gap),
            ("swing amplitude", swing_amplitude),
            ("x jitter", x_jitter),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(SettingsError::NegativeValue {
                    field,
                    provided: value,
                });
            }
        }

        let defaults = Self::default();
        Ok(Self {
            top_padding,
            bottom_padding,
            base_step,
            gap_min,
            gap_max,
            gap_salt: defaults.gap_salt,
            milestone_extra_gap,
            swing_amplitude,
            x_jitter,
            x_salt: defaults.x_salt,
            x_min,
            x_max,
        })
    }

    #[must_use]
    pub fn top_padding(&self) -> f64 {
        self.top_padding
    }

    #[must_use]
    pub fn bottom_padding(&self) -> f64 {
        self.bottom_padding
    }

    #[must_use]
    pub fn base_step(&self) -> f64 {
        self.base_step
    }

    #[must_use]
    pub fn gap_min(&self) -> f64 {
        self.gap_min
    }

    #[must_use]
    pub fn gap_max(&self) -> f64 {
        self.gap_max
    }

    #[must_use]
    pub fn gap_salt(&self) -> f64 {
        self.gap_salt
    }

    #[must_use]
    pub fn milestone_extra_gap(&self) -> f64 {
        self.milestone_extra_gap
    }

    #[must_use]
    pub fn swing_amplitude(&self) -> f64 {
        self.swing_amplitude
    }

    #[must_use]
    pub fn x_jitter(&self) -> f64 {
        self.x_jitter
    }

    #[must_use]
    pub fn x_salt(&self) -> f64 {
        self.x_salt
    }

    #[must_use]
    pub fn x_min(&self) -> f64 {
        self.x_min
    }

    #[must_use]
    pub fn x_max(&self) -> f64 {
        self.x_max
    }
}

//
// ─── REWARD RULES ──────────────────────────────────────────────────────────────
//

/// Local reward rules, mirroring what the content provider grants.
///
/// The engine always trusts the provider's `RewardResult`; these rules back
/// the in-memory provider and offline previews.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RewardRules {
    three_star_accuracy: f64,
    two_star_accuracy: f64,
    xp_per_correct: u32,
    xp_per_star: u32,
    coins_per_star: u32,
    xp_per_level: u32,
}

impl Default for RewardRules {
    fn default() -> Self {
        Self {
            three_star_accuracy: 0.9,
            two_star_accuracy: 0.6,
            xp_per_correct: 10,
            xp_per_star: 5,
            coins_per_star: 5,
            xp_per_level: 100,
        }
    }
}

impl RewardRules {
    /// Creates custom reward rules.
    ///
    /// # Errors
    ///
    /// Returns `SettingsError::InvalidStarThresholds` when the thresholds are
    /// not ordered inside `(0, 1]`, or `InvalidXpPerLevel` for a zero level size.
    pub fn new(
        three_star_accuracy: f64,
        two_star_accuracy: f64,
        xp_per_correct: u32,
        xp_per_star: u32,
        coins_per_star: u32,
        xp_per_level: u32,
    ) -> Result<Self, SettingsError> {
        let ordered = two_star_accuracy > 0.0
            && two_star_accuracy <= three_star_accuracy
            && three_star_accuracy <= 1.0;
        if !ordered {
            return Err(SettingsError::InvalidStarThresholds);
        }
        if xp_per_level == 0 {
            return Err(SettingsError::InvalidXpPerLevel);
        }
        Ok(Self {
            three_star_accuracy,
            two_star_accuracy,
            xp_per_correct,
            xp_per_star,
            coins_per_star,
            xp_per_level,
        })
    }

    #[must_use]
    pub fn stars_for(&self, accuracy: f64) -> u8 {
        if accuracy >= self.three_star_accuracy {
            3
        } else if accuracy >= self.two_star_accuracy {
            2
        } else {
            1
        }
    }

    /// Computes the reward for a session given the learner's xp before it.
    #[must_use]
    pub fn estimate(&self, answered: u32, correct: u32, prior_xp: u32) -> RewardResult {
        let accuracy = accuracy(answered, correct);
        let stars = self.stars_for(accuracy);
        let xp = correct
            .min(answered)
            .saturating_mul(self.xp_per_correct)
            .saturating_add(u32::from(stars).saturating_mul(self.xp_per_star));
        let coins = u32::from(stars).saturating_mul(self.coins_per_star);
        let leveled_up =
            prior_xp / self.xp_per_level != prior_xp.saturating_add(xp) / self.xp_per_level;
        RewardResult::new(stars, xp, coins, accuracy, leveled_up)
    }
}
