use serde::{Deserialize, Serialize};

/// Energy reading as reported by the energy collaborator.
///
/// The engine never computes energy itself; it only stores the latest value
/// returned by the collaborator and gates on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnergyStatus {
    pub value: i32,
    pub max: i32,
    #[serde(default)]
    pub seconds_until_playable: u32,
}

impl EnergyStatus {
    #[must_use]
    pub fn new(value: i32, max: i32, seconds_until_playable: u32) -> Self {
        Self {
            value,
            max,
            seconds_until_playable,
        }
    }

    /// A full tank of `max` energy.
    #[must_use]
    pub fn full(max: i32) -> Self {
        Self::new(max, max, 0)
    }

    /// No further attempts until a refill lands.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.value <= 0
    }
}
