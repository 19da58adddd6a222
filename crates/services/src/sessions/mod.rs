mod evaluate;
mod feedback;
mod progress;
mod service;
mod workflow;

// Public API of the session subsystem.
pub use crate::error::SessionError;
pub use evaluate::evaluate;
pub use feedback::FeedbackMessage;
pub use progress::{SessionPhase, SessionProgress};
pub use service::{
    AdaptiveSession, Advance, EntryKey, EntryKind, FinishStep, GradedAnswer, PendingSubmit,
    QueueEntry, Rejection, RemediationRequest,
};
pub use workflow::{RefillOutcome, SessionLoopService, SubmitOutcome, SubmitReport};
