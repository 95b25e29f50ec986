//! Transaction orchestration.

use classification::ErrorClassifier;
use common::AggregateId;
use domain::{
    AbortTransaction, Aggregate, ApplyBillerResponse, CommandResult, NewCancelRebill,
    NewChargeTransaction, NewRebillUpdate, Status, Transaction, TransactionError,
    TransactionRepository, TransactionService, UpdateExisting,
};
use serde_json::{Map, Value};

use crate::client::{BillerCommand, BillerOperation};
use crate::error::{ProcessorError, Result};
use crate::gateway::{BillerGateway, BillerGateways, Dispatch};
use crate::requests::{
    CancelRebillRequest, ChargeRequest, CompleteThreeDRequest, PostbackRequest,
    RebillUpdateRequest, SaleRequest,
};
use crate::view::TransactionView;

const CROSS_SALE_SKIPPED: &str = "Main purchase was not approved";

/// How a biller answer is applied to the aggregate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Apply {
    /// First answer for a freshly created transaction.
    Response,
    /// Answer for a transaction looked up by id; it must still be pending.
    Existing,
}

/// Drives transactions through their biller calls.
///
/// Each operation creates or loads the aggregate, dispatches one command
/// through the biller's gateway, applies the answer (or aborts when the biller
/// is unavailable) and returns the outward view, classified when declined or
/// aborted.
pub struct TransactionProcessor<R: TransactionRepository> {
    service: TransactionService<R>,
    gateways: BillerGateways,
    classifier: ErrorClassifier,
}

impl<R: TransactionRepository> TransactionProcessor<R> {
    pub fn new(
        service: TransactionService<R>,
        gateways: BillerGateways,
        classifier: ErrorClassifier,
    ) -> Self {
        Self {
            service,
            gateways,
            classifier,
        }
    }

    pub fn service(&self) -> &TransactionService<R> {
        &self.service
    }

    pub fn gateways(&self) -> &BillerGateways {
        &self.gateways
    }

    /// Charges a single purchase.
    #[tracing::instrument(skip(self, request), fields(biller = %request.biller, site_id = %request.site_id))]
    pub async fn charge(&self, request: ChargeRequest) -> Result<TransactionView> {
        let gateway = self.gateway(request.biller)?;
        self.charge_with(gateway, request.to_command(), &request.payment)
            .await
    }

    /// Charges a sale, main purchase first.
    ///
    /// Cross-sales are only sent to the biller if the main purchase was
    /// approved; otherwise they are created and aborted.
    ///
    /// A main purchase still waiting on a 3-D Secure challenge counts as not
    /// approved. Its cross-sales are aborted for good and completing the
    /// challenge later does not revive them.
    #[tracing::instrument(skip(self, request), fields(biller = %request.biller, site_id = %request.site_id))]
    pub async fn sale(&self, request: SaleRequest) -> Result<Vec<TransactionView>> {
        let gateway = self.gateway(request.biller)?;
        let sale = request.to_command()?;

        let mut charges = sale.charges().into_iter();
        let Some(main) = charges.next() else {
            return Err(TransactionError::MainPurchaseNotFound.into());
        };

        let main_view = self.charge_with(gateway, main, &request.payment).await?;
        let main_approved = main_view.status.is_approved();
        let mut views = vec![main_view];

        for charge in charges {
            let view = if main_approved {
                self.charge_with(gateway, charge, &request.payment).await?
            } else {
                let id = charge.transaction_id;
                self.service.create_charge(charge).await?;
                let result = self
                    .service
                    .abort(AbortTransaction::new(id, CROSS_SALE_SKIPPED))
                    .await?;
                self.view(&result.aggregate).await?
            };
            views.push(view);
        }

        Ok(views)
    }

    /// Changes the rebill of an approved charge.
    #[tracing::instrument(skip(self, request), fields(previous_transaction_id = %request.previous_transaction_id))]
    pub async fn update_rebill(&self, request: RebillUpdateRequest) -> Result<TransactionView> {
        let previous = self.approved(request.previous_transaction_id).await?;
        let biller = created(previous.biller())?;
        let gateway = self.gateway(biller)?;

        let cmd = NewRebillUpdate {
            payment_method: previous.payment_method().map(str::to_string),
            ..NewRebillUpdate::new(
                request.previous_transaction_id,
                created(previous.site_id())?,
                biller,
                created(previous.payment_type())?,
                request.charge,
                created(previous.settings())?.clone(),
            )
        };
        let result = self.service.create_rebill_update(cmd).await?;

        let command = command(BillerOperation::RebillUpdate, &result.aggregate, request.payment)?
            .with_subsequent_operation_fields(previous.subsequent_operation_fields().clone());
        self.dispatch(gateway, command, Apply::Response).await
    }

    /// Stops the rebill of an approved charge.
    #[tracing::instrument(skip(self, request), fields(previous_transaction_id = %request.previous_transaction_id))]
    pub async fn cancel_rebill(&self, request: CancelRebillRequest) -> Result<TransactionView> {
        let previous = self.approved(request.previous_transaction_id).await?;
        let biller = created(previous.biller())?;
        let gateway = self.gateway(biller)?;

        let cmd = NewCancelRebill {
            payment_method: previous.payment_method().map(str::to_string),
            ..NewCancelRebill::new(
                request.previous_transaction_id,
                created(previous.site_id())?,
                biller,
                created(previous.payment_type())?,
                created(previous.settings())?.clone(),
            )
        };
        let result = self.service.create_cancel_rebill(cmd).await?;

        let command = command(BillerOperation::CancelRebill, &result.aggregate, Map::new())?
            .with_subsequent_operation_fields(previous.subsequent_operation_fields().clone());
        self.dispatch(gateway, command, Apply::Response).await
    }

    /// Sends the challenge result of a pending 3-D Secure transaction.
    #[tracing::instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    pub async fn complete_three_d(&self, request: CompleteThreeDRequest) -> Result<TransactionView> {
        let transaction = self.existing(request.transaction_id).await?;
        if !transaction.status().is_pending() {
            return Err(TransactionError::PreviousTransactionShouldBePending {
                status: transaction.status(),
            }
            .into());
        }

        let gateway = self.gateway(created(transaction.biller())?)?;
        let command = command(BillerOperation::CompleteThreeD, &transaction, request.fields)?;
        self.dispatch(gateway, command, Apply::Existing).await
    }

    /// Applies an answer the biller pushed asynchronously.
    #[tracing::instrument(skip(self, request), fields(transaction_id = %request.transaction_id))]
    pub async fn apply_postback(&self, request: PostbackRequest) -> Result<TransactionView> {
        self.existing(request.transaction_id).await?;
        let result = self
            .service
            .apply_biller_response(ApplyBillerResponse::new(
                request.transaction_id,
                request.response,
            ))
            .await?;
        self.view(&result.aggregate).await
    }

    /// Returns the view of a transaction, if it exists.
    pub async fn find(&self, transaction_id: AggregateId) -> Result<Option<TransactionView>> {
        match self.service.get_transaction(transaction_id).await? {
            Some(transaction) => Ok(Some(self.view(&transaction).await?)),
            None => Ok(None),
        }
    }

    fn gateway(&self, biller: domain::BillerName) -> Result<&BillerGateway> {
        self.gateways
            .get(biller)
            .ok_or(ProcessorError::UnknownBiller(biller))
    }

    async fn charge_with(
        &self,
        gateway: &BillerGateway,
        cmd: NewChargeTransaction,
        payment: &Map<String, Value>,
    ) -> Result<TransactionView> {
        let result = self.service.create_charge(cmd).await?;
        let command = command(BillerOperation::Charge, &result.aggregate, payment.clone())?;
        self.dispatch(gateway, command, Apply::Response).await
    }

    async fn dispatch(
        &self,
        gateway: &BillerGateway,
        command: BillerCommand,
        apply: Apply,
    ) -> Result<TransactionView> {
        let id = command.transaction_id;
        let result: CommandResult<Transaction> = match gateway.dispatch(&command).await {
            Dispatch::Response(response) => match apply {
                Apply::Response => {
                    self.service
                        .apply_biller_response(ApplyBillerResponse::new(id, response))
                        .await?
                }
                Apply::Existing => {
                    self.service
                        .update_existing(UpdateExisting::new(id, response))
                        .await?
                }
            },
            Dispatch::Unavailable(error) => {
                self.service
                    .abort(AbortTransaction::new(id, error.to_string()))
                    .await?
            }
        };

        self.view(&result.aggregate).await
    }

    async fn view(&self, transaction: &Transaction) -> Result<TransactionView> {
        let classification = self.classifier.classify(transaction).await;
        if let Some(classification) = &classification {
            tracing::info!(
                transaction_id = ?transaction.id(),
                group_decline = %classification.group_decline,
                "Transaction classified"
            );
        }
        TransactionView::build(transaction, classification)
    }

    async fn existing(&self, transaction_id: AggregateId) -> Result<Transaction> {
        self.service
            .get_transaction(transaction_id)
            .await?
            .ok_or(ProcessorError::TransactionNotFound(transaction_id))
    }

    async fn approved(&self, transaction_id: AggregateId) -> Result<Transaction> {
        let previous = self
            .service
            .get_transaction(transaction_id)
            .await?
            .ok_or(ProcessorError::PreviousTransactionNotFound(transaction_id))?;

        if previous.status() != Status::Approved {
            return Err(ProcessorError::PreviousTransactionNotApproved {
                transaction_id,
                status: previous.status(),
            });
        }
        Ok(previous)
    }
}

fn created<T>(value: Option<T>) -> Result<T> {
    value.ok_or_else(|| TransactionError::NotCreated.into())
}

fn command(
    operation: BillerOperation,
    transaction: &Transaction,
    payment: Map<String, Value>,
) -> Result<BillerCommand> {
    created(BillerCommand::from_transaction(operation, transaction, payment))
}
