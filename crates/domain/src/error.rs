//! Domain error types.

use thiserror::Error;

use crate::interaction::InteractionError;
use crate::publisher::PublishError;
use crate::repository::RepositoryError;
use crate::transaction::TransactionError;

/// Errors that can occur during domain operations.
///
/// `Transaction` and `Interaction` are invariant violations: the operation
/// was rejected and nothing changed. The remaining variants are
/// infrastructure failures that abort the operation as a whole.
#[derive(Debug, Error)]
pub enum DomainError {
    /// An error occurred in the transaction aggregate.
    #[error("Transaction error: {0}")]
    Transaction(TransactionError),

    /// A biller interaction could not be read.
    #[error("Interaction error: {0}")]
    Interaction(#[from] InteractionError),

    /// Aggregate not found.
    #[error("Aggregate not found: {aggregate_type} with id {aggregate_id}")]
    AggregateNotFound {
        aggregate_type: &'static str,
        aggregate_id: String,
    },

    /// The repository failed or rejected a stale write.
    #[error("Repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// An event could not be published.
    #[error("Publish error: {0}")]
    Publish(#[from] PublishError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl DomainError {
    /// Returns true if the caller's request broke a domain rule.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(
            self,
            DomainError::Transaction(_) | DomainError::Interaction(_)
        )
    }

    /// Returns true if the operation lost a race with another writer.
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            DomainError::Repository(RepositoryError::ConcurrencyConflict { .. })
        )
    }

    /// Message safe to show to callers.
    ///
    /// Rule violations are described in full; infrastructure failures are not.
    pub fn public_message(&self) -> String {
        match self {
            DomainError::Transaction(_)
            | DomainError::Interaction(_)
            | DomainError::AggregateNotFound { .. } => self.to_string(),
            _ if self.is_conflict() => "Transaction was modified concurrently".to_string(),
            _ => "Internal error".to_string(),
        }
    }
}
