//! Biller wire client seam and an in-memory implementation.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use common::{AggregateId, SiteId};
use domain::{
    Aggregate, BillerChargeSettings, BillerName, BillerResponse, ChargeInformation, PaymentType,
    Transaction,
};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tokio::sync::Mutex;

use crate::error::BillerServiceError;

/// What the biller is asked to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum BillerOperation {
    Charge,
    RebillUpdate,
    CancelRebill,
    CompleteThreeD,
}

/// Everything a wire client needs to build its request.
#[derive(Debug, Clone, Serialize)]
pub struct BillerCommand {
    pub transaction_id: AggregateId,
    pub operation: BillerOperation,
    pub biller: BillerName,
    pub site_id: SiteId,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub charge: Option<ChargeInformation>,
    #[serde(skip_serializing)]
    pub settings: BillerChargeSettings,
    /// Caller-supplied payment or member data.
    pub payment: Map<String, Value>,
    /// Biller-issued handles from earlier operations.
    pub subsequent_operation_fields: Map<String, Value>,
}

impl BillerCommand {
    /// Builds a command from a created transaction.
    ///
    /// Returns `None` if the transaction was never created.
    pub fn from_transaction(
        operation: BillerOperation,
        transaction: &Transaction,
        payment: Map<String, Value>,
    ) -> Option<Self> {
        Some(Self {
            transaction_id: transaction.id()?,
            operation,
            biller: transaction.biller()?,
            site_id: transaction.site_id()?,
            payment_type: transaction.payment_type()?,
            payment_method: transaction.payment_method().map(str::to_string),
            charge: transaction.charge().cloned(),
            settings: transaction.settings()?.clone(),
            payment,
            subsequent_operation_fields: transaction.subsequent_operation_fields().clone(),
        })
    }

    /// Replaces the forwarded handles.
    pub fn with_subsequent_operation_fields(mut self, fields: Map<String, Value>) -> Self {
        self.subsequent_operation_fields = fields;
        self
    }
}

/// Wire client for one biller.
///
/// Implementations own the wire format. A declined payment is a successful
/// call with a declined outcome; errors mean the biller could not answer.
#[async_trait]
pub trait BillerClient: Send + Sync {
    /// The biller this client talks to.
    fn biller(&self) -> BillerName;

    /// Sends the command and returns the biller's answer.
    async fn execute(&self, command: &BillerCommand) -> Result<BillerResponse, BillerServiceError>;
}

#[derive(Debug, Default)]
struct InMemoryBillerState {
    replies: VecDeque<Result<BillerResponse, String>>,
    calls: Vec<BillerCommand>,
    fail_on_execute: bool,
    delay: Option<Duration>,
}

/// In-memory biller client for testing.
///
/// Answers with scripted replies in order, then approves everything.
#[derive(Debug, Clone)]
pub struct InMemoryBillerClient {
    biller: BillerName,
    state: Arc<Mutex<InMemoryBillerState>>,
}

impl InMemoryBillerClient {
    /// Creates a new in-memory client for the given biller.
    pub fn new(biller: BillerName) -> Self {
        Self {
            biller,
            state: Arc::new(Mutex::new(InMemoryBillerState::default())),
        }
    }

    /// Queues a reply for a later call.
    pub async fn push_reply(&self, reply: BillerResponse) {
        self.state.lock().await.replies.push_back(Ok(reply));
    }

    /// Queues a client failure for a later call.
    pub async fn push_failure(&self, message: impl Into<String>) {
        self.state.lock().await.replies.push_back(Err(message.into()));
    }

    /// Configures the client to fail every call.
    pub async fn set_fail_on_execute(&self, fail: bool) {
        self.state.lock().await.fail_on_execute = fail;
    }

    /// Delays every call.
    pub async fn set_delay(&self, delay: Duration) {
        self.state.lock().await.delay = Some(delay);
    }

    /// Returns the number of calls that reached the client.
    pub async fn call_count(&self) -> usize {
        self.state.lock().await.calls.len()
    }

    /// Returns the commands received so far.
    pub async fn calls(&self) -> Vec<BillerCommand> {
        self.state.lock().await.calls.clone()
    }

    fn default_reply(command: &BillerCommand, sequence: usize) -> BillerResponse {
        let request = json!({
            "transactionId": command.transaction_id.to_string(),
            "operation": command.operation,
        });
        let response = json!({
            "transactionId": format!("{}-{:04}", command.biller, sequence),
            "status": "approved",
        });
        BillerResponse::approved(request.to_string(), response.to_string())
    }
}

#[async_trait]
impl BillerClient for InMemoryBillerClient {
    fn biller(&self) -> BillerName {
        self.biller
    }

    async fn execute(&self, command: &BillerCommand) -> Result<BillerResponse, BillerServiceError> {
        let delay = {
            let mut state = self.state.lock().await;
            state.calls.push(command.clone());
            state.delay
        };

        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state.lock().await;
        if state.fail_on_execute {
            return Err(BillerServiceError::Client {
                biller: self.biller,
                message: "Simulated biller failure".to_string(),
            });
        }

        let sequence = state.calls.len();
        match state.replies.pop_front() {
            Some(Ok(reply)) => Ok(reply),
            Some(Err(message)) => Err(BillerServiceError::Client {
                biller: self.biller,
                message,
            }),
            None => Ok(Self::default_reply(command, sequence)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domain::{
        Currency, DomainEventPublisher, InMemoryRepository, Money, NewChargeTransaction,
        ResponseOutcome, RocketgateSettings, TransactionEvent, TransactionService,
    };

    async fn transaction() -> Transaction {
        let publisher: DomainEventPublisher<TransactionEvent> = DomainEventPublisher::new();
        let service = TransactionService::new(InMemoryRepository::new(), Arc::new(publisher));
        let cmd = NewChargeTransaction::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            ChargeInformation::new(Money::from_cents(1497), Currency::new("USD"), 30),
            BillerChargeSettings::Rocketgate(RocketgateSettings::new("1000", "secret")),
        );
        service.create_charge(cmd).await.unwrap().aggregate
    }

    #[tokio::test]
    async fn test_command_from_transaction() {
        let transaction = transaction().await;
        let mut payment = Map::new();
        payment.insert("cardToken".to_string(), Value::from("tok"));

        let command =
            BillerCommand::from_transaction(BillerOperation::Charge, &transaction, payment)
                .unwrap();

        assert_eq!(command.transaction_id, transaction.id().unwrap());
        assert_eq!(command.biller, BillerName::Rocketgate);
        assert!(command.charge.is_some());
        assert_eq!(command.payment["cardToken"], "tok");

        let json = serde_json::to_value(&command).unwrap();
        assert!(json.get("settings").is_none());
        assert_eq!(json["operation"], "charge");
    }

    #[tokio::test]
    async fn test_uncreated_transaction_has_no_command() {
        let command =
            BillerCommand::from_transaction(BillerOperation::Charge, &Transaction::default(), Map::new());
        assert!(command.is_none());
    }

    #[tokio::test]
    async fn test_scripted_replies_then_default() {
        let transaction = transaction().await;
        let command =
            BillerCommand::from_transaction(BillerOperation::Charge, &transaction, Map::new())
                .unwrap();
        let client = InMemoryBillerClient::new(BillerName::Rocketgate);
        client
            .push_reply(BillerResponse::declined("{}", r#"{"reasonCode": "105"}"#))
            .await;
        client.push_failure("connection reset").await;

        let first = client.execute(&command).await.unwrap();
        assert_eq!(first.outcome, ResponseOutcome::Declined);

        let second = client.execute(&command).await;
        assert!(matches!(second, Err(BillerServiceError::Client { .. })));

        let third = client.execute(&command).await.unwrap();
        assert_eq!(third.outcome, ResponseOutcome::Approved);
        assert_eq!(client.call_count().await, 3);
    }

    #[tokio::test]
    async fn test_fail_on_execute() {
        let transaction = transaction().await;
        let command =
            BillerCommand::from_transaction(BillerOperation::Charge, &transaction, Map::new())
                .unwrap();
        let client = InMemoryBillerClient::new(BillerName::Rocketgate);
        client.set_fail_on_execute(true).await;

        assert!(client.execute(&command).await.is_err());
        assert_eq!(client.calls().await.len(), 1);
    }
}
