#![forbid(unsafe_code)]

//! Contracts for the collaborators the session engine talks to, plus
//! in-memory implementations for tests and the demo host.

pub mod content;
pub mod energy;
pub mod error;
pub mod memory;

pub use content::{AnswerReceipt, AnswerRecord, BatchRequest, ContentProvider, SessionHandle};
pub use energy::EnergyService;
pub use error::ProviderError;
pub use memory::{InMemoryContentProvider, InMemoryEnergy, Operation};
