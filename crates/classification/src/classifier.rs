//! Classifier that never fails.

use std::sync::Arc;
use std::time::Duration;

use common::{BreakerSettings, CircuitBreaker};
use domain::{BillerInteraction, BillerName, Transaction};
use failsafe::Error as FailsafeError;
use failsafe::futures::CircuitBreaker as _;

use crate::classification::ErrorClassification;
use crate::criteria::MappingCriteria;
use crate::error::ClassificationError;
use crate::lookup::ClassificationLookup;

/// Timeout and breaker parameters for the classification lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifierSettings {
    pub timeout: Duration,
    pub breaker: BreakerSettings,
}

impl Default for ClassifierSettings {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(2000),
            breaker: BreakerSettings::default(),
        }
    }
}

/// Resolves declined exchanges to error classifications.
///
/// Every failure mode (no criteria, unreadable payload, lookup miss, lookup
/// error, timeout, open breaker) resolves to the default bundle so that
/// classification never blocks finalizing a transaction.
#[derive(Clone)]
pub struct ErrorClassifier {
    lookup: Arc<dyn ClassificationLookup>,
    timeout: Duration,
    breaker: CircuitBreaker,
}

impl ErrorClassifier {
    pub fn new(lookup: Arc<dyn ClassificationLookup>, settings: ClassifierSettings) -> Self {
        Self {
            lookup,
            timeout: settings.timeout,
            breaker: settings.breaker.build(),
        }
    }

    /// Returns true if the lookup breaker currently permits calls.
    pub fn is_lookup_available(&self) -> bool {
        self.breaker.is_call_permitted()
    }

    /// Classifies a finished transaction.
    ///
    /// Returns `None` unless the transaction is declined or aborted.
    #[tracing::instrument(skip(self, transaction), fields(status = %transaction.status()))]
    pub async fn classify(&self, transaction: &Transaction) -> Option<ErrorClassification> {
        if !transaction.status().needs_classification() {
            return None;
        }

        let Some(biller) = transaction.biller() else {
            return Some(fallback(None, "no_biller"));
        };

        let exchange = transaction.latest_exchange();
        Some(
            self.classify_exchange(biller, exchange.request.as_ref(), exchange.response.as_ref())
                .await,
        )
    }

    /// Classifies one request/response exchange with a biller.
    pub async fn classify_exchange(
        &self,
        biller: BillerName,
        request: Option<&BillerInteraction>,
        response: Option<&BillerInteraction>,
    ) -> ErrorClassification {
        match MappingCriteria::build(biller, request, response) {
            Ok(Some(criteria)) => self.resolve(criteria).await,
            Ok(None) => fallback(None, "no_criteria"),
            Err(e) => {
                tracing::warn!(%biller, error = %e, "Could not read classification criteria");
                fallback(None, "invalid_payload")
            }
        }
    }

    /// Looks up the classification for the given criteria.
    pub async fn resolve(&self, criteria: MappingCriteria) -> ErrorClassification {
        if criteria.is_empty() {
            return fallback(Some(criteria), "empty_criteria");
        }

        let lookup = Arc::clone(&self.lookup);
        let timeout = self.timeout;
        let key = criteria.clone();
        let result = self
            .breaker
            .call(async move {
                match tokio::time::timeout(timeout, lookup.resolve(&key)).await {
                    Ok(resolved) => resolved,
                    Err(_) => Err(ClassificationError::Timeout(timeout)),
                }
            })
            .await;

        match result {
            Ok(Some(record)) => ErrorClassification::from_record(record, Some(criteria)),
            Ok(None) => {
                tracing::debug!(biller = %criteria.biller(), "No classification matches criteria");
                fallback(Some(criteria), "no_match")
            }
            Err(FailsafeError::Rejected) => {
                tracing::warn!(biller = %criteria.biller(), "Classification breaker open");
                fallback(Some(criteria), "breaker_open")
            }
            Err(FailsafeError::Inner(e)) => {
                tracing::warn!(biller = %criteria.biller(), error = %e, "Classification lookup failed");
                fallback(Some(criteria), "lookup_error")
            }
        }
    }
}

fn fallback(criteria: Option<MappingCriteria>, reason: &'static str) -> ErrorClassification {
    metrics::counter!("error_classification_fallback_total", "reason" => reason).increment(1);
    ErrorClassification::default_for(criteria)
}
