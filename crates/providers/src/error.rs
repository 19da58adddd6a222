use thiserror::Error;

/// Errors surfaced by content and energy collaborators.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum ProviderError {
    #[error("not found")]
    NotFound,

    #[error("request rejected: {0}")]
    Rejected(String),

    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("request timed out")]
    Timeout,
}
