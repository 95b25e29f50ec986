//! Transaction service providing a simplified API for transaction operations.

use std::sync::Arc;

use common::AggregateId;

use crate::command::{CommandHandler, CommandResult};
use crate::error::DomainError;
use crate::publisher::DomainEventPublisher;
use crate::repository::TransactionRepository;

use super::{
    AbortTransaction, ApplyBillerResponse, NewCancelRebill, NewChargeTransaction, NewRebillUpdate,
    NewSale, RecordRequest, Transaction, TransactionError, TransactionEvent, UpdateExisting,
    UpdateSubsequentOperationFields,
};

impl From<TransactionError> for DomainError {
    fn from(e: TransactionError) -> Self {
        DomainError::Transaction(e)
    }
}

/// Service for managing transactions.
///
/// Provides a high-level API for transaction operations, wrapping the command
/// handler and providing convenient methods for common operations.
pub struct TransactionService<R: TransactionRepository> {
    handler: CommandHandler<R, Transaction>,
}

impl<R: TransactionRepository> TransactionService<R> {
    /// Creates a new transaction service.
    pub fn new(repository: R, publisher: Arc<DomainEventPublisher<TransactionEvent>>) -> Self {
        Self {
            handler: CommandHandler::new(repository, publisher),
        }
    }

    /// Sets how many times a conflicting save is retried before surfacing.
    pub fn with_max_conflict_retries(mut self, retries: u32) -> Self {
        self.handler = self.handler.with_max_conflict_retries(retries);
        self
    }

    /// Returns a reference to the underlying command handler.
    pub fn handler(&self) -> &CommandHandler<R, Transaction> {
        &self.handler
    }

    /// Loads a transaction, returning None if it doesn't exist.
    pub async fn get_transaction(&self, id: AggregateId) -> Result<Option<Transaction>, DomainError> {
        self.handler.load(id).await
    }

    /// Opens a charge transaction.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id, biller = %cmd.biller))]
    pub async fn create_charge(
        &self,
        cmd: NewChargeTransaction,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .create(cmd.transaction_id, |transaction| transaction.create_charge(&cmd))
            .await?;
        record_created(&result);
        Ok(result)
    }

    /// Opens a rebill update transaction.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id, biller = %cmd.biller))]
    pub async fn create_rebill_update(
        &self,
        cmd: NewRebillUpdate,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .create(cmd.transaction_id, |transaction| {
                transaction.create_rebill_update(&cmd)
            })
            .await?;
        record_created(&result);
        Ok(result)
    }

    /// Opens a rebill cancellation transaction.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id, biller = %cmd.biller))]
    pub async fn create_cancel_rebill(
        &self,
        cmd: NewCancelRebill,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .create(cmd.transaction_id, |transaction| {
                transaction.create_cancel_rebill(&cmd)
            })
            .await?;
        record_created(&result);
        Ok(result)
    }

    /// Opens one charge transaction per sale item, main purchase first.
    #[tracing::instrument(skip(self, cmd), fields(biller = %cmd.biller))]
    pub async fn create_sale(
        &self,
        cmd: NewSale,
    ) -> Result<Vec<CommandResult<Transaction>>, DomainError> {
        let mut results = Vec::with_capacity(cmd.sale.cross_sales().len() + 1);
        for charge in cmd.charges() {
            results.push(self.create_charge(charge).await?);
        }
        Ok(results)
    }

    /// Records a request sent to the biller.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id))]
    pub async fn record_request(
        &self,
        cmd: RecordRequest,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        self.handler
            .execute(cmd.transaction_id, |transaction| {
                transaction.record_request(&cmd.payload)
            })
            .await
    }

    /// Applies a biller's answer.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id, outcome = ?cmd.response.outcome))]
    pub async fn apply_biller_response(
        &self,
        cmd: ApplyBillerResponse,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .execute(cmd.transaction_id, |transaction| {
                transaction.apply_biller_response(&cmd.response)
            })
            .await?;
        record_transitions(&result);
        Ok(result)
    }

    /// Aborts a transaction whose biller call never completed.
    #[tracing::instrument(skip(self))]
    pub async fn abort(
        &self,
        cmd: AbortTransaction,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .execute(cmd.transaction_id, |transaction| transaction.abort(&cmd.reason))
            .await?;
        record_transitions(&result);
        Ok(result)
    }

    /// Applies a biller answer to a transaction that must still be pending.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id, outcome = ?cmd.response.outcome))]
    pub async fn update_existing(
        &self,
        cmd: UpdateExisting,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        let result = self
            .handler
            .execute(cmd.transaction_id, |transaction| {
                transaction.update_existing(&cmd.response)
            })
            .await?;
        record_transitions(&result);
        Ok(result)
    }

    /// Stores biller-issued handles for later operations.
    #[tracing::instrument(skip(self, cmd), fields(transaction_id = %cmd.transaction_id))]
    pub async fn update_subsequent_operation_fields(
        &self,
        cmd: UpdateSubsequentOperationFields,
    ) -> Result<CommandResult<Transaction>, DomainError> {
        self.handler
            .execute(cmd.transaction_id, |transaction| {
                transaction.update_subsequent_operation_fields(cmd.fields.clone())
            })
            .await
    }
}

fn record_created(result: &CommandResult<Transaction>) {
    metrics::counter!(
        "transactions_created_total",
        "type" => result.aggregate.transaction_type().as_str()
    )
    .increment(1);
}

fn record_transitions(result: &CommandResult<Transaction>) {
    for status in result.events.iter().filter_map(TransactionEvent::new_status) {
        tracing::info!(status = %status, "Transaction status updated");
        metrics::counter!("transaction_status_transitions_total", "status" => status.as_str())
            .increment(1);
    }
}
