use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quest_core::model::{
    Answer, Difficulty, LessonId, QuestionItem, QuestionRef, ResultTag, RewardResult, SessionId,
    SkillId, SubjectId,
};

use crate::error::ProviderError;

/// Provider-side session opened for one lesson attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionHandle {
    pub session_id: SessionId,
    pub subject_id: SubjectId,
}

/// Parameters of a question batch request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRequest {
    pub subject_id: SubjectId,
    pub lesson_id: LessonId,
    pub count: u32,
    pub focus_skill_id: Option<SkillId>,
    pub force_difficulty: Option<Difficulty>,
}

impl BatchRequest {
    #[must_use]
    pub fn lesson(subject_id: SubjectId, lesson_id: LessonId, count: u32) -> Self {
        Self {
            subject_id,
            lesson_id,
            count,
            focus_skill_id: None,
            force_difficulty: None,
        }
    }

    /// A single easy follow-up aimed at `skill`.
    #[must_use]
    pub fn remediation(subject_id: SubjectId, lesson_id: LessonId, skill: Option<SkillId>) -> Self {
        Self {
            subject_id,
            lesson_id,
            count: 1,
            focus_skill_id: skill,
            force_difficulty: Some(Difficulty::Easy),
        }
    }
}

/// One answer as reported to the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerRecord {
    pub question: QuestionRef,
    pub result: ResultTag,
    pub answer: Answer,
    /// Advisory; the provider may clamp or re-derive it.
    pub elapsed_ms: u64,
}

/// Provider acknowledgement of a recorded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnswerReceipt {
    pub skill_id: Option<SkillId>,
    pub streak_correct: u32,
    /// Provider verdict; only meaningful for answers recorded as `Ungraded`.
    pub correct: Option<bool>,
}

/// Source of lessons, questions and rewards.
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Open a provider session for a lesson.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::NotFound` for an unknown lesson, or transport errors.
    async fn start_session(&self, lesson_id: &LessonId) -> Result<SessionHandle, ProviderError>;

    /// Fetch up to `request.count` questions.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport or lookup failures.
    async fn fetch_question_batch(
        &self,
        request: &BatchRequest,
    ) -> Result<Vec<QuestionItem>, ProviderError>;

    /// Record one answer and return the provider's view of it.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failures or an unknown session.
    async fn record_answer(&self, record: &AnswerRecord) -> Result<AnswerReceipt, ProviderError>;

    /// Close the session and grant rewards.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failures or an unknown session.
    async fn finish_session(
        &self,
        session_id: &SessionId,
        total_questions: u32,
        correct_count: u32,
    ) -> Result<RewardResult, ProviderError>;
}
