//! Classification error types.

use std::time::Duration;

use domain::InteractionError;
use thiserror::Error;

/// Errors raised while resolving a classification.
///
/// None of these reach callers of `ErrorClassifier`; they are logged and
/// replaced by the default bundle.
#[derive(Debug, Error)]
pub enum ClassificationError {
    /// The lookup table could not be queried.
    #[error("Lookup failed: {0}")]
    Lookup(String),

    /// The lookup did not answer in time.
    #[error("Lookup timed out after {0:?}")]
    Timeout(Duration),

    /// A payload needed for the criteria could not be read.
    #[error("Criteria error: {0}")]
    Criteria(#[from] InteractionError),
}
