//! Shared error types for the services crate.

use thiserror::Error;

use providers::ProviderError;

/// Errors emitted by session services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum SessionError {
    #[error("no questions available for session")]
    Empty,
    #[error("session has not started")]
    NotStarted,
    #[error(transparent)]
    Provider(#[from] ProviderError),
}
