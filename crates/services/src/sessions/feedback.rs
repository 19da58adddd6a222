use serde::Serialize;

use quest_core::{Tone, compose_microcopy};

/// Line shown under the question after an answer is recorded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FeedbackMessage {
    pub tone: Tone,
    pub text: String,
    /// The item's explanation, only attached to wrong answers.
    pub explanation: Option<String>,
}

impl FeedbackMessage {
    pub(crate) fn compose(
        seed: &str,
        tone: Tone,
        max_chars: usize,
        explanation: Option<String>,
    ) -> Self {
        let explanation = match tone {
            Tone::Encouragement => explanation,
            Tone::Success | Tone::SuccessWithStreak => None,
        };
        Self {
            tone,
            text: compose_microcopy(seed, tone, max_chars),
            explanation,
        }
    }

    #[must_use]
    pub fn is_celebration(&self) -> bool {
        self.tone == Tone::SuccessWithStreak
    }
}
