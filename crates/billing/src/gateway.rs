//! Per-biller call protection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use common::{BreakerSettings, CircuitBreaker};
use domain::{BillerName, BillerResponse};
use failsafe::Error as FailsafeError;
use failsafe::futures::CircuitBreaker as _;

use crate::client::{BillerClient, BillerCommand};
use crate::error::BillerServiceError;

/// Outcome of dispatching a command to a biller.
#[derive(Debug, Clone)]
pub enum Dispatch {
    /// The biller answered. The answer may still be a decline.
    Response(BillerResponse),
    /// The biller could not be reached or did not answer in time.
    Unavailable(BillerServiceError),
}

/// A biller client behind a timeout and a circuit breaker.
#[derive(Clone)]
pub struct BillerGateway {
    biller: BillerName,
    client: Arc<dyn BillerClient>,
    breaker: CircuitBreaker,
    timeout: Duration,
}

impl BillerGateway {
    pub fn new(client: Arc<dyn BillerClient>, timeout: Duration, breaker: BreakerSettings) -> Self {
        Self {
            biller: client.biller(),
            client,
            breaker: breaker.build(),
            timeout,
        }
    }

    pub fn biller(&self) -> BillerName {
        self.biller
    }

    /// Returns true if the breaker currently permits calls.
    pub fn is_available(&self) -> bool {
        self.breaker.is_call_permitted()
    }

    /// Sends a command to the biller.
    ///
    /// An open breaker short-circuits without touching the client. Timeouts
    /// and client errors count as breaker failures; declines do not.
    #[tracing::instrument(skip(self, command), fields(biller = %self.biller, transaction_id = %command.transaction_id))]
    pub async fn dispatch(&self, command: &BillerCommand) -> Dispatch {
        let client = Arc::clone(&self.client);
        let biller = self.biller;
        let timeout = self.timeout;
        let command = command.clone();
        let requested_at = Utc::now();
        let start = Instant::now();

        let result = self
            .breaker
            .call(async move {
                metrics::counter!("biller_calls_total", "biller" => biller.as_str()).increment(1);
                match tokio::time::timeout(timeout, client.execute(&command)).await {
                    Ok(answer) => answer,
                    Err(_) => Err(BillerServiceError::Timeout {
                        biller,
                        after: timeout,
                    }),
                }
            })
            .await;

        match result {
            Ok(response) => {
                metrics::histogram!("biller_call_duration_seconds", "biller" => biller.as_str())
                    .record(start.elapsed().as_secs_f64());
                tracing::info!(outcome = ?response.outcome, "Biller answered");
                Dispatch::Response(response.with_timing(requested_at, Utc::now()))
            }
            Err(FailsafeError::Rejected) => {
                unavailable(BillerServiceError::BreakerOpen { biller })
            }
            Err(FailsafeError::Inner(e)) => {
                metrics::histogram!("biller_call_duration_seconds", "biller" => biller.as_str())
                    .record(start.elapsed().as_secs_f64());
                unavailable(e)
            }
        }
    }
}

fn unavailable(error: BillerServiceError) -> Dispatch {
    tracing::warn!(error = %error, "Biller unavailable");
    metrics::counter!(
        "biller_unavailable_total",
        "biller" => error.biller().as_str(),
        "reason" => error.reason()
    )
    .increment(1);
    Dispatch::Unavailable(error)
}

/// Gateways keyed by biller.
#[derive(Clone, Default)]
pub struct BillerGateways {
    gateways: HashMap<BillerName, BillerGateway>,
}

impl BillerGateways {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a gateway, replacing any previous one for the same biller.
    pub fn register(&mut self, gateway: BillerGateway) {
        self.gateways.insert(gateway.biller(), gateway);
    }

    pub fn get(&self, biller: BillerName) -> Option<&BillerGateway> {
        self.gateways.get(&biller)
    }

    /// Returns the registered billers in name order.
    pub fn billers(&self) -> Vec<BillerName> {
        let mut billers: Vec<_> = self.gateways.keys().copied().collect();
        billers.sort();
        billers
    }
}
