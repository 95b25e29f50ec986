//! Outward representation of a transaction.

use classification::ErrorClassification;
use common::AggregateId;
use domain::{
    Aggregate, BillerArtifacts, BillerName, PaymentType, Status, ThreeDsArtifacts, Transaction, TransactionError,
    TransactionType,
};
use serde::Serialize;

use crate::error::Result;

/// What callers see of a transaction.
///
/// The classification is present only for declined or aborted transactions
/// where one was computed. 3-D Secure artifacts are present only while the
/// transaction waits for a challenge. The outcome is already committed when a
/// view is built, so unreadable payloads show up as missing artifacts.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionView {
    pub transaction_id: AggregateId,
    pub status: Status,
    pub transaction_type: TransactionType,
    pub biller: Option<BillerName>,
    pub payment_type: Option<PaymentType>,
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_classification: Option<ErrorClassification>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_d: Option<ThreeDsArtifacts>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub card_hash: Option<String>,
}

impl TransactionView {
    pub fn build(
        transaction: &Transaction,
        classification: Option<ErrorClassification>,
    ) -> Result<Self> {
        let transaction_id = transaction.id().ok_or(TransactionError::NotCreated)?;
        let artifacts = transaction.artifacts().unwrap_or_else(|error| {
            tracing::warn!(
                transaction_id = %transaction_id,
                error = %error,
                "Unreadable biller payload, showing no artifacts"
            );
            BillerArtifacts::default()
        });
        let status = transaction.status();

        let three_d = Some(artifacts.three_d)
            .filter(|three_d| status.is_pending() && !three_d.is_empty());
        let error_classification = classification.filter(|_| status.needs_classification());

        Ok(Self {
            transaction_id,
            status,
            transaction_type: transaction.transaction_type(),
            biller: transaction.biller(),
            payment_type: transaction.payment_type(),
            payment_method: transaction.payment_method().map(str::to_string),
            error_classification,
            three_d,
            card_hash: artifacts.card_hash,
        })
    }
}
