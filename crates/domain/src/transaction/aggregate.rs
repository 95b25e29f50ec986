//! Transaction aggregate implementation.

use chrono::{DateTime, Utc};
use common::{AggregateId, SiteId};
use event_store::Version;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::aggregate::Aggregate;
use crate::interaction::{
    self, BillerArtifacts, BillerInteraction, BillerTransaction, Exchange, InteractionError,
    ThreeDsSummary,
};

use super::{
    BillerChargeSettings, BillerName, BillerResponse, ChargeInformation, NewCancelRebill,
    NewChargeTransaction, NewRebillUpdate, PaymentType, ResponseOutcome, Status, TransactionError,
    TransactionEvent, TransactionType,
    events::{AuthenticationRequestedData, StatusUpdatedData, TransactionCreatedData},
};

/// Transaction aggregate root.
///
/// One purchase attempt, rebill update or rebill cancellation against a
/// single biller, with the full log of wire exchanges that drove it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Transaction {
    id: Option<AggregateId>,

    /// Current version for optimistic concurrency.
    #[serde(default)]
    version: Version,

    transaction_type: TransactionType,
    site_id: Option<SiteId>,
    biller: Option<BillerName>,
    payment_type: Option<PaymentType>,
    payment_method: Option<String>,
    status: Status,
    charge: Option<ChargeInformation>,
    settings: Option<BillerChargeSettings>,

    /// Append-only; never reordered in place.
    interactions: Vec<BillerInteraction>,

    previous_transaction_id: Option<AggregateId>,
    subsequent_operation_fields: Map<String, Value>,
    response_code: Option<String>,
    response_reason: Option<String>,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
}

impl Aggregate for Transaction {
    type Event = TransactionEvent;
    type Error = TransactionError;

    fn aggregate_type() -> &'static str {
        "Transaction"
    }

    fn id(&self) -> Option<AggregateId> {
        self.id
    }

    fn version(&self) -> Version {
        self.version
    }

    fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    fn apply(&mut self, event: Self::Event) {
        match event {
            TransactionEvent::TransactionCreated(data) => self.apply_created(data),
            TransactionEvent::BillerInteractionAdded(data) => {
                self.interactions.push(data.interaction);
                self.updated_at = Some(data.occurred_on);
            }
            TransactionEvent::StatusUpdated(data) => self.apply_status_updated(data),
            TransactionEvent::AuthenticationRequested(data) => {
                self.interactions.extend(data.request);
                self.interactions.push(data.response);
                self.merge_fields(data.subsequent_operation_fields);
                self.updated_at = Some(data.occurred_on);
            }
            TransactionEvent::SubsequentOperationFieldsUpdated(data) => {
                self.merge_fields(Some(data.fields));
                self.updated_at = Some(data.occurred_on);
            }
        }
    }
}

// Query methods
impl Transaction {
    pub fn transaction_type(&self) -> TransactionType {
        self.transaction_type
    }

    pub fn site_id(&self) -> Option<SiteId> {
        self.site_id
    }

    pub fn biller(&self) -> Option<BillerName> {
        self.biller
    }

    pub fn payment_type(&self) -> Option<PaymentType> {
        self.payment_type
    }

    pub fn payment_method(&self) -> Option<&str> {
        self.payment_method.as_deref()
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn charge(&self) -> Option<&ChargeInformation> {
        self.charge.as_ref()
    }

    pub fn settings(&self) -> Option<&BillerChargeSettings> {
        self.settings.as_ref()
    }

    /// Interactions in append order.
    pub fn interactions(&self) -> &[BillerInteraction] {
        &self.interactions
    }

    pub fn previous_transaction_id(&self) -> Option<AggregateId> {
        self.previous_transaction_id
    }

    pub fn subsequent_operation_fields(&self) -> &Map<String, Value> {
        &self.subsequent_operation_fields
    }

    /// Code the biller gave with its final answer.
    pub fn response_code(&self) -> Option<&str> {
        self.response_code.as_deref()
    }

    pub fn response_reason(&self) -> Option<&str> {
        self.response_reason.as_deref()
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// Returns true if the transaction is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

// Reconciliation
impl Transaction {
    /// Interactions ordered by creation time.
    pub fn sorted_interactions(&self) -> Vec<BillerInteraction> {
        interaction::sort_interactions(&self.interactions)
    }

    /// Request/response pairs, matched positionally.
    pub fn biller_transactions(&self) -> Result<Vec<BillerTransaction>, InteractionError> {
        match self.biller {
            Some(biller) => interaction::pair_interactions(biller, &self.interactions),
            None => Ok(Vec::new()),
        }
    }

    /// The latest response and the request paired with it.
    pub fn latest_exchange(&self) -> Exchange {
        interaction::latest_exchange(&self.interactions)
    }

    pub fn three_d_secure_summary(&self) -> Result<ThreeDsSummary, InteractionError> {
        match self.biller {
            Some(biller) => interaction::three_d_secure_summary(biller, &self.interactions),
            None => Ok(ThreeDsSummary::default()),
        }
    }

    pub fn artifacts(&self) -> Result<BillerArtifacts, InteractionError> {
        match self.biller {
            Some(biller) => interaction::extract_artifacts(biller, &self.interactions),
            None => Ok(BillerArtifacts::default()),
        }
    }
}

// Command methods (return events)
impl Transaction {
    /// Opens a charge.
    pub fn create_charge(
        &self,
        cmd: &NewChargeTransaction,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        self.ensure_new()?;
        ensure_settings_match(cmd.biller, &cmd.settings)?;
        cmd.charge.validate()?;

        Ok(vec![TransactionEvent::TransactionCreated(
            TransactionCreatedData {
                transaction_id: cmd.transaction_id,
                transaction_type: TransactionType::Charge,
                site_id: cmd.site_id,
                biller: cmd.biller,
                payment_type: cmd.payment_type,
                payment_method: cmd.payment_method.clone(),
                charge: Some(cmd.charge.clone()),
                settings: cmd.settings.clone(),
                previous_transaction_id: None,
                created_at: Utc::now(),
            },
        )])
    }

    /// Opens a rebill update referencing a previous charge.
    pub fn create_rebill_update(
        &self,
        cmd: &NewRebillUpdate,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        self.ensure_new()?;
        ensure_settings_match(cmd.biller, &cmd.settings)?;
        cmd.charge.validate()?;

        Ok(vec![TransactionEvent::TransactionCreated(
            TransactionCreatedData {
                transaction_id: cmd.transaction_id,
                transaction_type: TransactionType::RebillUpdate,
                site_id: cmd.site_id,
                biller: cmd.biller,
                payment_type: cmd.payment_type,
                payment_method: cmd.payment_method.clone(),
                charge: Some(cmd.charge.clone()),
                settings: cmd.settings.clone(),
                previous_transaction_id: Some(cmd.previous_transaction_id),
                created_at: Utc::now(),
            },
        )])
    }

    /// Opens a rebill cancellation referencing a previous charge.
    pub fn create_cancel_rebill(
        &self,
        cmd: &NewCancelRebill,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        self.ensure_new()?;
        ensure_settings_match(cmd.biller, &cmd.settings)?;

        Ok(vec![TransactionEvent::TransactionCreated(
            TransactionCreatedData {
                transaction_id: cmd.transaction_id,
                transaction_type: TransactionType::CancelRebill,
                site_id: cmd.site_id,
                biller: cmd.biller,
                payment_type: cmd.payment_type,
                payment_method: cmd.payment_method.clone(),
                charge: None,
                settings: cmd.settings.clone(),
                previous_transaction_id: Some(cmd.previous_transaction_id),
                created_at: Utc::now(),
            },
        )])
    }

    /// Records a request sent to the biller.
    pub fn record_request(&self, payload: &str) -> Result<Vec<TransactionEvent>, TransactionError> {
        let id = self.ensure_pending()?;

        Ok(vec![TransactionEvent::biller_interaction_added(
            id,
            BillerInteraction::request(Some(payload.to_string()), Utc::now()),
        )])
    }

    /// Applies a biller's answer.
    ///
    /// Approved and declined answers finalize the transaction. A pending
    /// answer keeps it open for a strong-authentication challenge.
    pub fn apply_biller_response(
        &self,
        response: &BillerResponse,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        let id = self.ensure_pending()?;
        Ok(vec![self.response_event(id, response)])
    }

    /// Finalizes a transaction whose biller call never completed.
    ///
    /// The recorded response is synthetic and carries no payload.
    pub fn abort(&self, reason: &str) -> Result<Vec<TransactionEvent>, TransactionError> {
        let id = self.ensure_pending()?;
        let now = Utc::now();

        Ok(vec![TransactionEvent::StatusUpdated(StatusUpdatedData {
            transaction_id: id,
            previous_status: self.status,
            status: Status::Aborted,
            request: None,
            response: BillerInteraction::synthetic_response(now),
            code: None,
            reason: Some(reason.to_string()),
            subsequent_operation_fields: None,
            occurred_on: now,
        })])
    }

    /// Applies a biller answer to a transaction looked up by id.
    ///
    /// The transaction must still be pending.
    pub fn update_existing(
        &self,
        response: &BillerResponse,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        let id = self.id.ok_or(TransactionError::NotCreated)?;
        if !self.status.is_pending() {
            return Err(TransactionError::PreviousTransactionShouldBePending {
                status: self.status,
            });
        }

        Ok(vec![self.response_event(id, response)])
    }

    /// Stores biller-issued handles for later operations.
    pub fn update_subsequent_operation_fields(
        &self,
        fields: Map<String, Value>,
    ) -> Result<Vec<TransactionEvent>, TransactionError> {
        let id = self.ensure_pending()?;
        Ok(vec![TransactionEvent::subsequent_operation_fields_updated(
            id, fields,
        )])
    }

    fn response_event(&self, id: AggregateId, response: &BillerResponse) -> TransactionEvent {
        let request = response
            .request_payload
            .clone()
            .map(|payload| BillerInteraction::request(Some(payload), response.requested_at));
        let answer =
            BillerInteraction::response(response.response_payload.clone(), response.responded_at);

        match response.outcome {
            ResponseOutcome::Pending => {
                TransactionEvent::AuthenticationRequested(AuthenticationRequestedData {
                    transaction_id: id,
                    request,
                    response: answer,
                    subsequent_operation_fields: response.subsequent_operation_fields.clone(),
                    occurred_on: Utc::now(),
                })
            }
            outcome => TransactionEvent::StatusUpdated(StatusUpdatedData {
                transaction_id: id,
                previous_status: self.status,
                status: outcome.status(),
                request,
                response: answer,
                code: response.code.clone(),
                reason: response.reason.clone(),
                subsequent_operation_fields: response.subsequent_operation_fields.clone(),
                occurred_on: Utc::now(),
            }),
        }
    }

    fn ensure_new(&self) -> Result<(), TransactionError> {
        if self.id.is_some() {
            return Err(TransactionError::AlreadyCreated);
        }
        Ok(())
    }

    fn ensure_pending(&self) -> Result<AggregateId, TransactionError> {
        let id = self.id.ok_or(TransactionError::NotCreated)?;
        if self.status.is_terminal() {
            return Err(TransactionError::AlreadyProcessed {
                status: self.status,
            });
        }
        Ok(id)
    }
}

// Event application
impl Transaction {
    fn apply_created(&mut self, data: TransactionCreatedData) {
        self.id = Some(data.transaction_id);
        self.transaction_type = data.transaction_type;
        self.site_id = Some(data.site_id);
        self.biller = Some(data.biller);
        self.payment_type = Some(data.payment_type);
        self.payment_method = data.payment_method;
        self.status = Status::Pending;
        self.charge = data.charge;
        self.settings = Some(data.settings);
        self.previous_transaction_id = data.previous_transaction_id;
        self.created_at = Some(data.created_at);
        self.updated_at = Some(data.created_at);
    }

    fn apply_status_updated(&mut self, data: StatusUpdatedData) {
        self.interactions.extend(data.request);
        self.interactions.push(data.response);
        self.status = data.status;
        self.response_code = data.code;
        self.response_reason = data.reason;
        self.merge_fields(data.subsequent_operation_fields);
        self.updated_at = Some(data.occurred_on);
    }

    fn merge_fields(&mut self, fields: Option<Map<String, Value>>) {
        if let Some(fields) = fields {
            self.subsequent_operation_fields.extend(fields);
        }
    }
}

fn ensure_settings_match(
    biller: BillerName,
    settings: &BillerChargeSettings,
) -> Result<(), TransactionError> {
    if settings.biller() != biller {
        return Err(TransactionError::MismatchedChargeSettings {
            biller,
            settings: settings.biller(),
        });
    }
    Ok(())
}
