//! Biller interactions and their reconciliation.
//!
//! A `BillerInteraction` is the audit record of one wire exchange with a
//! biller. Payloads are kept verbatim; reading them is deferred to the
//! reconciliation functions in this module, which parse each payload as a
//! JSON object.

mod artifacts;
mod fields;
mod reconciliation;

pub use artifacts::{
    BillerArtifacts, ThreeDsArtifacts, ThreeDsSummary, authentication_required,
    extract_artifacts, latest_field, three_d_secure_requested, three_d_secure_summary,
};
pub use fields::{AuthRequiredField, BillerFields, fields_for};
pub use reconciliation::{
    BillerTransaction, Exchange, latest_exchange, pair_interactions, partition,
    sort_interactions,
};

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

/// Errors raised while reading interactions.
#[derive(Debug, Error)]
pub enum InteractionError {
    /// The payload is not a JSON object.
    #[error("Invalid biller interaction payload: {reason}")]
    InvalidPayload { reason: String },

    /// The interaction type is neither request nor response.
    #[error("Invalid biller interaction type: {0}")]
    InvalidType(String),
}

/// Direction of a wire exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InteractionType {
    Request,
    Response,
}

impl InteractionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            InteractionType::Request => "request",
            InteractionType::Response => "response",
        }
    }
}

impl FromStr for InteractionType {
    type Err = InteractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "request" => Ok(InteractionType::Request),
            "response" => Ok(InteractionType::Response),
            other => Err(InteractionError::InvalidType(other.to_string())),
        }
    }
}

/// Immutable record of one request or response exchanged with a biller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillerInteraction {
    interaction_type: InteractionType,
    payload: Option<String>,
    created_at: DateTime<Utc>,
}

impl BillerInteraction {
    pub fn request(payload: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            interaction_type: InteractionType::Request,
            payload,
            created_at,
        }
    }

    pub fn response(payload: Option<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            interaction_type: InteractionType::Response,
            payload,
            created_at,
        }
    }

    /// A response recorded for a call that never reached the biller.
    pub fn synthetic_response(created_at: DateTime<Utc>) -> Self {
        Self::response(None, created_at)
    }

    /// Rebuilds an interaction from its stored parts.
    pub fn from_raw(
        interaction_type: &str,
        payload: Option<String>,
        created_at: DateTime<Utc>,
    ) -> Result<Self, InteractionError> {
        Ok(Self {
            interaction_type: interaction_type.parse()?,
            payload,
            created_at,
        })
    }

    pub fn interaction_type(&self) -> InteractionType {
        self.interaction_type
    }

    pub fn payload(&self) -> Option<&str> {
        self.payload.as_deref()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_request(&self) -> bool {
        self.interaction_type == InteractionType::Request
    }

    pub fn is_response(&self) -> bool {
        self.interaction_type == InteractionType::Response
    }

    /// Returns true if there is nothing to read in the payload.
    pub fn is_empty(&self) -> bool {
        self.payload.as_deref().is_none_or(|p| p.trim().is_empty())
    }

    /// Parses the payload as a JSON object.
    ///
    /// An absent or blank payload is `Ok(None)`.
    pub fn parsed_payload(&self) -> Result<Option<Map<String, Value>>, InteractionError> {
        let Some(raw) = self.payload.as_deref().filter(|p| !p.trim().is_empty()) else {
            return Ok(None);
        };

        let value: Value =
            serde_json::from_str(raw).map_err(|e| InteractionError::InvalidPayload {
                reason: e.to_string(),
            })?;

        match value {
            Value::Object(map) => Ok(Some(map)),
            other => Err(InteractionError::InvalidPayload {
                reason: format!("expected a JSON object, got {}", json_kind(&other)),
            }),
        }
    }

    /// Returns a top-level payload field rendered as a string.
    ///
    /// Null and empty-string values count as absent.
    pub fn field(&self, name: &str) -> Result<Option<String>, InteractionError> {
        Ok(self
            .parsed_payload()?
            .and_then(|map| map.get(name).and_then(value_as_string)))
    }
}

fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
