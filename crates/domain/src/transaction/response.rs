//! Normalized biller responses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Status;

/// What the biller decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResponseOutcome {
    Approved,
    Declined,
    /// A strong-authentication challenge must be completed first.
    Pending,
}

impl ResponseOutcome {
    /// The status a transaction moves to on this outcome.
    pub fn status(&self) -> Status {
        match self {
            ResponseOutcome::Approved => Status::Approved,
            ResponseOutcome::Declined => Status::Declined,
            ResponseOutcome::Pending => Status::Pending,
        }
    }
}

/// A biller's answer together with the wire exchange that produced it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BillerResponse {
    pub outcome: ResponseOutcome,
    pub request_payload: Option<String>,
    pub response_payload: Option<String>,
    pub requested_at: DateTime<Utc>,
    pub responded_at: DateTime<Utc>,
    pub code: Option<String>,
    pub reason: Option<String>,
    /// Biller-issued handles to keep for later operations.
    pub subsequent_operation_fields: Option<Map<String, Value>>,
}

impl BillerResponse {
    pub fn new(
        outcome: ResponseOutcome,
        request_payload: Option<String>,
        response_payload: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            outcome,
            request_payload,
            response_payload,
            requested_at: now,
            responded_at: now,
            code: None,
            reason: None,
            subsequent_operation_fields: None,
        }
    }

    pub fn approved(request_payload: impl Into<String>, response_payload: impl Into<String>) -> Self {
        Self::new(
            ResponseOutcome::Approved,
            Some(request_payload.into()),
            Some(response_payload.into()),
        )
    }

    pub fn declined(request_payload: impl Into<String>, response_payload: impl Into<String>) -> Self {
        Self::new(
            ResponseOutcome::Declined,
            Some(request_payload.into()),
            Some(response_payload.into()),
        )
    }

    pub fn pending(request_payload: impl Into<String>, response_payload: impl Into<String>) -> Self {
        Self::new(
            ResponseOutcome::Pending,
            Some(request_payload.into()),
            Some(response_payload.into()),
        )
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    pub fn with_timing(mut self, requested_at: DateTime<Utc>, responded_at: DateTime<Utc>) -> Self {
        self.requested_at = requested_at;
        self.responded_at = responded_at;
        self
    }

    pub fn with_subsequent_operation_fields(mut self, fields: Map<String, Value>) -> Self {
        self.subsequent_operation_fields = Some(fields);
        self
    }
}
