use async_trait::async_trait;

use quest_core::model::EnergyStatus;

use crate::error::ProviderError;

/// Owner of the learner's energy balance.
///
/// Every call returns the balance after the operation; callers never compute
/// energy themselves.
#[async_trait]
pub trait EnergyService: Send + Sync {
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failures.
    async fn get_status(&self) -> Result<EnergyStatus, ProviderError>;

    /// Deduct the fixed wrong-answer cost.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError` on transport failures.
    async fn consume_wrong_answer(&self) -> Result<EnergyStatus, ProviderError>;

    /// Refill once the wait timer has run out.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Rejected` while the timer is still running.
    async fn refill_with_wait(&self) -> Result<EnergyStatus, ProviderError>;

    /// Refill immediately by spending coins.
    ///
    /// # Errors
    ///
    /// Returns `ProviderError::Rejected` when the learner cannot afford it.
    async fn refill_with_coins(&self) -> Result<EnergyStatus, ProviderError>;
}
