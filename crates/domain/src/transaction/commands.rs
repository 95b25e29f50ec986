//! Transaction commands.

use common::{AggregateId, SiteId};
use serde_json::{Map, Value};

use crate::command::Command;

use super::{
    BillerChargeSettings, BillerName, BillerResponse, ChargeInformation, PaymentType, Sale,
    SaleCharge, Transaction, TransactionError,
};

/// Command to open a charge transaction.
#[derive(Debug, Clone)]
pub struct NewChargeTransaction {
    pub transaction_id: AggregateId,
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub charge: ChargeInformation,
    pub settings: BillerChargeSettings,
}

impl NewChargeTransaction {
    /// Creates a new charge command with a generated transaction ID.
    pub fn new(
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        charge: ChargeInformation,
        settings: BillerChargeSettings,
    ) -> Self {
        Self {
            transaction_id: AggregateId::new(),
            site_id,
            biller,
            payment_type,
            payment_method: None,
            charge,
            settings,
        }
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }
}

impl Command for NewChargeTransaction {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to change the rebill of a previous charge.
#[derive(Debug, Clone)]
pub struct NewRebillUpdate {
    pub transaction_id: AggregateId,
    pub previous_transaction_id: AggregateId,
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub charge: ChargeInformation,
    pub settings: BillerChargeSettings,
}

impl NewRebillUpdate {
    pub fn new(
        previous_transaction_id: AggregateId,
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        charge: ChargeInformation,
        settings: BillerChargeSettings,
    ) -> Self {
        Self {
            transaction_id: AggregateId::new(),
            previous_transaction_id,
            site_id,
            biller,
            payment_type,
            payment_method: None,
            charge,
            settings,
        }
    }
}

impl Command for NewRebillUpdate {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to stop the rebill of a previous charge.
#[derive(Debug, Clone)]
pub struct NewCancelRebill {
    pub transaction_id: AggregateId,
    pub previous_transaction_id: AggregateId,
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub settings: BillerChargeSettings,
}

impl NewCancelRebill {
    pub fn new(
        previous_transaction_id: AggregateId,
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        settings: BillerChargeSettings,
    ) -> Self {
        Self {
            transaction_id: AggregateId::new(),
            previous_transaction_id,
            site_id,
            biller,
            payment_type,
            payment_method: None,
            settings,
        }
    }
}

impl Command for NewCancelRebill {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to open every charge of a sale.
#[derive(Debug, Clone)]
pub struct NewSale {
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub sale: Sale,
    pub settings: BillerChargeSettings,
}

impl NewSale {
    /// Validates the charge set and builds the command.
    pub fn new(
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        charges: Vec<SaleCharge>,
        settings: BillerChargeSettings,
    ) -> Result<Self, TransactionError> {
        Ok(Self {
            biller,
            payment_type,
            payment_method: None,
            sale: Sale::new(site_id, charges)?,
            settings,
        })
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    /// One charge command per sale item, main purchase first.
    pub fn charges(&self) -> Vec<NewChargeTransaction> {
        self.sale
            .items()
            .map(|item| NewChargeTransaction {
                transaction_id: AggregateId::new(),
                site_id: item.site_id,
                biller: self.biller,
                payment_type: self.payment_type,
                payment_method: self.payment_method.clone(),
                charge: item.charge.clone(),
                settings: self.settings.clone(),
            })
            .collect()
    }
}

/// Command to record a request sent to the biller.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub transaction_id: AggregateId,
    pub payload: String,
}

impl RecordRequest {
    pub fn new(transaction_id: AggregateId, payload: impl Into<String>) -> Self {
        Self {
            transaction_id,
            payload: payload.into(),
        }
    }
}

impl Command for RecordRequest {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to apply a biller's answer.
#[derive(Debug, Clone)]
pub struct ApplyBillerResponse {
    pub transaction_id: AggregateId,
    pub response: BillerResponse,
}

impl ApplyBillerResponse {
    pub fn new(transaction_id: AggregateId, response: BillerResponse) -> Self {
        Self {
            transaction_id,
            response,
        }
    }
}

impl Command for ApplyBillerResponse {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to abort a transaction whose biller call never completed.
#[derive(Debug, Clone)]
pub struct AbortTransaction {
    pub transaction_id: AggregateId,
    pub reason: String,
}

impl AbortTransaction {
    pub fn new(transaction_id: AggregateId, reason: impl Into<String>) -> Self {
        Self {
            transaction_id,
            reason: reason.into(),
        }
    }
}

impl Command for AbortTransaction {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to apply a biller answer to an existing transaction looked up by id
/// (3-D Secure completion, postback).
#[derive(Debug, Clone)]
pub struct UpdateExisting {
    pub transaction_id: AggregateId,
    pub response: BillerResponse,
}

impl UpdateExisting {
    pub fn new(transaction_id: AggregateId, response: BillerResponse) -> Self {
        Self {
            transaction_id,
            response,
        }
    }
}

impl Command for UpdateExisting {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}

/// Command to store biller-issued handles on a transaction.
#[derive(Debug, Clone)]
pub struct UpdateSubsequentOperationFields {
    pub transaction_id: AggregateId,
    pub fields: Map<String, Value>,
}

impl UpdateSubsequentOperationFields {
    pub fn new(transaction_id: AggregateId, fields: Map<String, Value>) -> Self {
        Self {
            transaction_id,
            fields,
        }
    }
}

impl Command for UpdateSubsequentOperationFields {
    type Aggregate = Transaction;

    fn aggregate_id(&self) -> AggregateId {
        self.transaction_id
    }
}
