#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod path_service;
pub mod sessions;

pub use quest_core::Clock;
pub use sessions as session;

pub use config::EngineConfig;
pub use error::SessionError;
pub use path_service::PathService;

pub use sessions::{
    AdaptiveSession, Advance, EntryKey, EntryKind, FeedbackMessage, QueueEntry, RefillOutcome,
    Rejection, SessionLoopService, SessionPhase, SessionProgress, SubmitOutcome, SubmitReport,
};
