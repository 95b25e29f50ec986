//! Inbound requests accepted by the transaction processor.

use common::{AggregateId, SiteId};
use domain::{
    BillerChargeSettings, BillerName, BillerResponse, ChargeInformation, NewChargeTransaction,
    NewSale, PaymentType, SaleCharge, TransactionError,
};
use serde_json::{Map, Value};

/// A single purchase.
#[derive(Debug, Clone)]
pub struct ChargeRequest {
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub charge: ChargeInformation,
    pub settings: BillerChargeSettings,
    /// Card or member data forwarded to the biller.
    pub payment: Map<String, Value>,
}

impl ChargeRequest {
    pub fn new(
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        charge: ChargeInformation,
        settings: BillerChargeSettings,
    ) -> Self {
        Self {
            site_id,
            biller,
            payment_type,
            payment_method: None,
            charge,
            settings,
            payment: Map::new(),
        }
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub fn with_payment(mut self, payment: Map<String, Value>) -> Self {
        self.payment = payment;
        self
    }

    pub(crate) fn to_command(&self) -> NewChargeTransaction {
        NewChargeTransaction {
            payment_method: self.payment_method.clone(),
            ..NewChargeTransaction::new(
                self.site_id,
                self.biller,
                self.payment_type,
                self.charge.clone(),
                self.settings.clone(),
            )
        }
    }
}

/// A main purchase with optional cross-sales, all on one biller.
#[derive(Debug, Clone)]
pub struct SaleRequest {
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    pub charges: Vec<SaleCharge>,
    pub settings: BillerChargeSettings,
    pub payment: Map<String, Value>,
}

impl SaleRequest {
    pub fn new(
        site_id: SiteId,
        biller: BillerName,
        payment_type: PaymentType,
        charges: Vec<SaleCharge>,
        settings: BillerChargeSettings,
    ) -> Self {
        Self {
            site_id,
            biller,
            payment_type,
            payment_method: None,
            charges,
            settings,
            payment: Map::new(),
        }
    }

    pub fn with_payment_method(mut self, payment_method: impl Into<String>) -> Self {
        self.payment_method = Some(payment_method.into());
        self
    }

    pub(crate) fn to_command(&self) -> Result<NewSale, TransactionError> {
        let sale = NewSale::new(
            self.site_id,
            self.biller,
            self.payment_type,
            self.charges.clone(),
            self.settings.clone(),
        )?;
        Ok(match &self.payment_method {
            Some(method) => sale.with_payment_method(method.clone()),
            None => sale,
        })
    }
}

/// Changes the rebill of an approved charge.
#[derive(Debug, Clone)]
pub struct RebillUpdateRequest {
    pub previous_transaction_id: AggregateId,
    pub charge: ChargeInformation,
    pub payment: Map<String, Value>,
}

impl RebillUpdateRequest {
    pub fn new(previous_transaction_id: AggregateId, charge: ChargeInformation) -> Self {
        Self {
            previous_transaction_id,
            charge,
            payment: Map::new(),
        }
    }
}

/// Stops the rebill of an approved charge.
#[derive(Debug, Clone, Copy)]
pub struct CancelRebillRequest {
    pub previous_transaction_id: AggregateId,
}

impl CancelRebillRequest {
    pub fn new(previous_transaction_id: AggregateId) -> Self {
        Self {
            previous_transaction_id,
        }
    }
}

/// Finishes a 3-D Secure challenge on a pending transaction.
#[derive(Debug, Clone)]
pub struct CompleteThreeDRequest {
    pub transaction_id: AggregateId,
    /// Challenge result returned by the issuer (e.g. PaRes).
    pub fields: Map<String, Value>,
}

impl CompleteThreeDRequest {
    pub fn new(transaction_id: AggregateId, fields: Map<String, Value>) -> Self {
        Self {
            transaction_id,
            fields,
        }
    }
}

/// An asynchronous answer pushed by the biller.
#[derive(Debug, Clone)]
pub struct PostbackRequest {
    pub transaction_id: AggregateId,
    pub response: BillerResponse,
}

impl PostbackRequest {
    pub fn new(transaction_id: AggregateId, response: BillerResponse) -> Self {
        Self {
            transaction_id,
            response,
        }
    }
}
