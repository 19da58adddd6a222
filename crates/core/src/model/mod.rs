mod energy;
mod ids;
mod path;
mod question;
mod reward;

pub use energy::EnergyStatus;
pub use ids::{EventId, LessonId, ParseIdError, QuestionId, SessionId, SkillId, SubjectId, UnitId};
pub use path::{
    Event, EventKind, EventStatus, Lesson, Node, NodeKind, NodeRef, PathPriority, PathSnapshot,
    SessionMetadata, Unit,
};
pub use question::{
    Answer, ChoiceOption, Difficulty, DragPair, QuestionItem, QuestionMetadata, QuestionRef,
    QuestionType, ResultTag,
};
pub use reward::{RewardResult, accuracy};
