//! Transaction domain events.

use chrono::{DateTime, Utc};
use common::{AggregateId, SiteId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::DomainEvent;
use crate::interaction::BillerInteraction;

use super::{
    BillerChargeSettings, BillerName, ChargeInformation, PaymentType, Status, TransactionType,
};

/// Events that can occur on a transaction aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum TransactionEvent {
    /// A charge, rebill update or rebill cancellation was opened.
    TransactionCreated(TransactionCreatedData),

    /// A request was sent to the biller.
    BillerInteractionAdded(BillerInteractionAddedData),

    /// The biller's answer finalized the transaction.
    StatusUpdated(StatusUpdatedData),

    /// The biller asked for a strong-authentication challenge.
    AuthenticationRequested(AuthenticationRequestedData),

    /// Biller-issued handles were stored for later operations.
    SubsequentOperationFieldsUpdated(SubsequentOperationFieldsUpdatedData),
}

impl DomainEvent for TransactionEvent {
    fn event_type(&self) -> &'static str {
        match self {
            TransactionEvent::TransactionCreated(_) => "TransactionCreated",
            TransactionEvent::BillerInteractionAdded(_) => "BillerInteractionAdded",
            TransactionEvent::StatusUpdated(_) => "StatusUpdated",
            TransactionEvent::AuthenticationRequested(_) => "AuthenticationRequested",
            TransactionEvent::SubsequentOperationFieldsUpdated(_) => {
                "SubsequentOperationFieldsUpdated"
            }
        }
    }

    fn aggregate_id(&self) -> AggregateId {
        match self {
            TransactionEvent::TransactionCreated(data) => data.transaction_id,
            TransactionEvent::BillerInteractionAdded(data) => data.transaction_id,
            TransactionEvent::StatusUpdated(data) => data.transaction_id,
            TransactionEvent::AuthenticationRequested(data) => data.transaction_id,
            TransactionEvent::SubsequentOperationFieldsUpdated(data) => data.transaction_id,
        }
    }

    fn occurred_on(&self) -> DateTime<Utc> {
        match self {
            TransactionEvent::TransactionCreated(data) => data.created_at,
            TransactionEvent::BillerInteractionAdded(data) => data.occurred_on,
            TransactionEvent::StatusUpdated(data) => data.occurred_on,
            TransactionEvent::AuthenticationRequested(data) => data.occurred_on,
            TransactionEvent::SubsequentOperationFieldsUpdated(data) => data.occurred_on,
        }
    }
}

/// Data for TransactionCreated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionCreatedData {
    pub transaction_id: AggregateId,
    pub transaction_type: TransactionType,
    pub site_id: SiteId,
    pub biller: BillerName,
    pub payment_type: PaymentType,
    pub payment_method: Option<String>,
    /// Absent for rebill cancellations.
    pub charge: Option<ChargeInformation>,
    pub settings: BillerChargeSettings,
    pub previous_transaction_id: Option<AggregateId>,
    pub created_at: DateTime<Utc>,
}

/// Data for BillerInteractionAdded event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BillerInteractionAddedData {
    pub transaction_id: AggregateId,
    pub interaction: BillerInteraction,
    pub occurred_on: DateTime<Utc>,
}

/// Data for StatusUpdated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdatedData {
    pub transaction_id: AggregateId,
    pub previous_status: Status,
    pub status: Status,
    pub request: Option<BillerInteraction>,
    pub response: BillerInteraction,
    pub code: Option<String>,
    pub reason: Option<String>,
    pub subsequent_operation_fields: Option<Map<String, Value>>,
    pub occurred_on: DateTime<Utc>,
}

/// Data for AuthenticationRequested event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthenticationRequestedData {
    pub transaction_id: AggregateId,
    pub request: Option<BillerInteraction>,
    pub response: BillerInteraction,
    pub subsequent_operation_fields: Option<Map<String, Value>>,
    pub occurred_on: DateTime<Utc>,
}

/// Data for SubsequentOperationFieldsUpdated event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubsequentOperationFieldsUpdatedData {
    pub transaction_id: AggregateId,
    pub fields: Map<String, Value>,
    pub occurred_on: DateTime<Utc>,
}

// Event constructors
impl TransactionEvent {
    /// Creates a BillerInteractionAdded event.
    pub fn biller_interaction_added(
        transaction_id: AggregateId,
        interaction: BillerInteraction,
    ) -> Self {
        TransactionEvent::BillerInteractionAdded(BillerInteractionAddedData {
            transaction_id,
            interaction,
            occurred_on: Utc::now(),
        })
    }

    /// Creates a SubsequentOperationFieldsUpdated event.
    pub fn subsequent_operation_fields_updated(
        transaction_id: AggregateId,
        fields: Map<String, Value>,
    ) -> Self {
        TransactionEvent::SubsequentOperationFieldsUpdated(SubsequentOperationFieldsUpdatedData {
            transaction_id,
            fields,
            occurred_on: Utc::now(),
        })
    }

    /// Returns the status this event moved the transaction to, if any.
    pub fn new_status(&self) -> Option<Status> {
        match self {
            TransactionEvent::TransactionCreated(_) => Some(Status::Pending),
            TransactionEvent::StatusUpdated(data) => Some(data.status),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_envelope_serialization() {
        let id = AggregateId::new();
        let event = TransactionEvent::biller_interaction_added(
            id,
            BillerInteraction::request(Some("{}".to_string()), Utc::now()),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "BillerInteractionAdded");
        assert_eq!(json["data"]["interaction"]["interaction_type"], "request");

        let back: TransactionEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back.event_type(), "BillerInteractionAdded");
        assert_eq!(back.aggregate_id(), id);
    }

    #[test]
    fn test_new_status() {
        let event = TransactionEvent::subsequent_operation_fields_updated(
            AggregateId::new(),
            Map::new(),
        );
        assert_eq!(event.new_status(), None);
    }
}
