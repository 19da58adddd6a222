use std::env;
use std::str::FromStr;

use quest_core::microcopy::DEFAULT_MAX_CHARS;

/// Tunables for the session engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Questions requested when a session starts.
    pub batch_size: u32,
    pub microcopy_max_chars: usize,
    /// Every n-th consecutive correct answer is celebrated.
    pub streak_celebration_every: u32,
    pub celebration_cooldown_secs: u32,
    pub remediation_enabled: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            batch_size: 8,
            microcopy_max_chars: DEFAULT_MAX_CHARS,
            streak_celebration_every: 3,
            celebration_cooldown_secs: 4,
            remediation_enabled: true,
        }
    }
}

impl EngineConfig {
    /// Defaults overridden by `QUEST_BATCH_SIZE`, `QUEST_MICROCOPY_MAX_CHARS`
    /// and `QUEST_CELEBRATION_COOLDOWN_SECS`.
    ///
    /// Absent or unparsable values keep the default.
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            batch_size: read_env("QUEST_BATCH_SIZE")
                .filter(|size| *size > 0)
                .unwrap_or(defaults.batch_size),
            microcopy_max_chars: read_env("QUEST_MICROCOPY_MAX_CHARS")
                .unwrap_or(defaults.microcopy_max_chars),
            celebration_cooldown_secs: read_env("QUEST_CELEBRATION_COOLDOWN_SECS")
                .unwrap_or(defaults.celebration_cooldown_secs),
            ..defaults
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: u32) -> Self {
        self.batch_size = batch_size;
        self
    }

    #[must_use]
    pub fn with_remediation(mut self, enabled: bool) -> Self {
        self.remediation_enabled = enabled;
        self
    }

    #[must_use]
    pub fn with_celebration_cooldown_secs(mut self, secs: u32) -> Self {
        self.celebration_cooldown_secs = secs;
        self
    }
}

fn read_env<T: FromStr>(key: &str) -> Option<T> {
    parse_value(env::var(key).ok().as_deref())
}

fn parse_value<T: FromStr>(raw: Option<&str>) -> Option<T> {
    raw.map(str::trim)
        .filter(|value| !value.is_empty())
        .and_then(|value| value.parse().ok())
}
