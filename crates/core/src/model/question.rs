use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::model::ids::{QuestionId, SessionId, SkillId};

//
// ─── QUESTION TYPES ────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionType {
    Select,
    TrueFalse,
    FillBlank,
    DragDrop,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChoiceOption {
    pub id: String,
    pub label: String,
}

/// One item that must be dropped onto one target.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DragPair {
    pub item_id: String,
    pub target_id: String,
}

/// Type-specific payload of a question.
///
/// Only the fields relevant to the question's type are populated; a SELECT
/// question without `correct_option_id` cannot be graded locally.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct QuestionMetadata {
    pub prompt: String,
    pub options: Vec<ChoiceOption>,
    pub correct_option_id: Option<String>,
    pub pairs: Vec<DragPair>,
    pub skill_id: Option<SkillId>,
    pub difficulty: Difficulty,
}

/// A question as served by the content provider.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionItem {
    pub question_id: QuestionId,
    pub template_id: String,
    pub variant_id: String,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    #[serde(default)]
    pub metadata: QuestionMetadata,
    #[serde(default)]
    pub explanation: Option<String>,
}

impl QuestionItem {
    /// Reference used when reporting an answer for this item.
    #[must_use]
    pub fn question_ref(&self, session_id: &SessionId) -> QuestionRef {
        QuestionRef {
            session_id: session_id.clone(),
            question_id: self.question_id.clone(),
            template_id: self.template_id.clone(),
            variant_id: self.variant_id.clone(),
        }
    }
}

/// Identifies one served question inside one session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuestionRef {
    pub session_id: SessionId,
    pub question_id: QuestionId,
    pub template_id: String,
    pub variant_id: String,
}

//
// ─── ANSWERS ───────────────────────────────────────────────────────────────────
//

/// What the learner submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Answer {
    Select { option_id: String },
    TrueFalse { value: bool },
    FillBlank { text: String },
    /// Item id → target id. Items left unassigned are simply absent.
    DragDrop { assignments: HashMap<String, String> },
}

/// Local grading tag attached to a recorded answer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultTag {
    Correct,
    Incorrect,
    /// The item carried no usable answer key.
    Skipped,
    /// Grading is left to the provider.
    Ungraded,
}

impl ResultTag {
    #[must_use]
    pub fn is_correct(self) -> bool {
        matches!(self, ResultTag::Correct)
    }
}
