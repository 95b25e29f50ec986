//! Billing error types.

use std::time::Duration;

use common::AggregateId;
use domain::{BillerName, DomainError, InteractionError, Status, TransactionError};
use thiserror::Error;

/// Why a biller could not be reached.
///
/// These never cross into the aggregate as-is: the processor maps every
/// variant to the Aborted transition.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BillerServiceError {
    /// The breaker for this biller is open; no call was made.
    #[error("Circuit breaker open for {biller}")]
    BreakerOpen { biller: BillerName },

    /// The call did not complete in time.
    #[error("Call to {biller} timed out after {after:?}")]
    Timeout { biller: BillerName, after: Duration },

    /// The biller's client reported a failure.
    #[error("Biller {biller} failed: {message}")]
    Client { biller: BillerName, message: String },
}

impl BillerServiceError {
    /// Short label used in metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            BillerServiceError::BreakerOpen { .. } => "breaker_open",
            BillerServiceError::Timeout { .. } => "timeout",
            BillerServiceError::Client { .. } => "client_error",
        }
    }

    pub fn biller(&self) -> BillerName {
        match self {
            BillerServiceError::BreakerOpen { biller }
            | BillerServiceError::Timeout { biller, .. }
            | BillerServiceError::Client { biller, .. } => *biller,
        }
    }
}

/// Errors returned by the transaction processor.
#[derive(Debug, Error)]
pub enum ProcessorError {
    /// No gateway is registered for the biller.
    #[error("Unknown biller: {0}")]
    UnknownBiller(BillerName),

    #[error("Transaction not found: {0}")]
    TransactionNotFound(AggregateId),

    /// A rebill operation referenced a transaction that does not exist.
    #[error("Previous transaction not found: {0}")]
    PreviousTransactionNotFound(AggregateId),

    /// A rebill operation referenced a transaction that was not approved.
    #[error("Previous transaction {transaction_id} is {status}, expected Approved")]
    PreviousTransactionNotApproved {
        transaction_id: AggregateId,
        status: Status,
    },

    /// Domain error.
    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),
}

impl From<TransactionError> for ProcessorError {
    fn from(e: TransactionError) -> Self {
        ProcessorError::Domain(DomainError::from(e))
    }
}

impl From<InteractionError> for ProcessorError {
    fn from(e: InteractionError) -> Self {
        ProcessorError::Domain(DomainError::from(e))
    }
}

impl ProcessorError {
    /// Returns true if the caller's request was rejected by a rule.
    pub fn is_rejection(&self) -> bool {
        match self {
            ProcessorError::Domain(e) => e.is_invariant_violation(),
            _ => true,
        }
    }

    /// Message safe to show to callers.
    pub fn public_message(&self) -> String {
        match self {
            ProcessorError::Domain(e) => e.public_message(),
            other => other.to_string(),
        }
    }
}

/// Convenience type alias for processor results.
pub type Result<T> = std::result::Result<T, ProcessorError>;

#[cfg(test)]
mod tests {
    use super::*;
    use domain::PublishError;
    use event_store::EventStoreError;

    #[test]
    fn test_reason_labels() {
        let biller = BillerName::Rocketgate;
        assert_eq!(
            BillerServiceError::BreakerOpen { biller }.reason(),
            "breaker_open"
        );
        assert_eq!(
            BillerServiceError::Timeout {
                biller,
                after: Duration::from_secs(1)
            }
            .reason(),
            "timeout"
        );
        assert_eq!(
            BillerServiceError::Client {
                biller,
                message: "503".to_string()
            }
            .biller(),
            biller
        );
    }

    #[test]
    fn test_public_message_hides_infrastructure() {
        let error = ProcessorError::from(DomainError::from(PublishError::EventStore(
            EventStoreError::Storage("disk full".to_string()),
        )));
        assert!(!error.is_rejection());
        assert_eq!(error.public_message(), "Internal error");
    }

    #[test]
    fn test_public_message_itemises_rejections() {
        let error = ProcessorError::from(TransactionError::MainPurchaseNotFound);
        assert!(error.is_rejection());
        assert!(error.public_message().to_lowercase().contains("main purchase"));

        let error = ProcessorError::UnknownBiller(BillerName::Epoch);
        assert_eq!(error.public_message(), "Unknown biller: epoch");
    }
}
