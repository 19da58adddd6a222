use serde::Serialize;

/// Lifecycle phase of one session attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionPhase {
    Bootstrapping,
    Active,
    Finishing,
    Finished,
}

/// Aggregated view of session progress, useful for UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionProgress {
    /// Queue length, remediation items included.
    pub total: usize,
    pub answered: usize,
    pub correct: usize,
    pub remaining: usize,
    pub phase: SessionPhase,
}

impl SessionProgress {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.phase == SessionPhase::Finished
    }
}
