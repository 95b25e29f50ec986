//! Strong-authentication detection and artifact extraction.

use serde::{Deserialize, Serialize};

use crate::transaction::BillerName;

use super::fields::is_truthy;
use super::reconciliation::read;
use super::{BillerInteraction, InteractionError, fields_for, partition, sort_interactions};

/// Returns true if the first request started a 3-D Secure flow.
pub fn three_d_secure_requested(
    biller: BillerName,
    interactions: &[BillerInteraction],
) -> Result<bool, InteractionError> {
    let Some(flag) = fields_for(biller).three_d_request_flag else {
        return Ok(false);
    };

    let sorted = sort_interactions(interactions);
    let Some(first_request) = sorted.iter().find(|i| i.is_request()) else {
        return Ok(false);
    };

    Ok(first_request
        .field(flag)?
        .is_some_and(|value| is_truthy(&value)))
}

/// Returns true if the response asks for a challenge step.
pub fn authentication_required(
    biller: BillerName,
    response: &BillerInteraction,
) -> Result<bool, InteractionError> {
    let Some(auth) = fields_for(biller).auth_required else {
        return Ok(false);
    };

    Ok(response
        .field(auth.field)?
        .is_some_and(|value| auth.values.contains(&value.as_str())))
}

/// Whether strong authentication was asked for, and whether it actually happened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsSummary {
    pub requested: bool,
    pub challenged: bool,
}

pub fn three_d_secure_summary(
    biller: BillerName,
    interactions: &[BillerInteraction],
) -> Result<ThreeDsSummary, InteractionError> {
    let requested = three_d_secure_requested(biller, interactions)?;

    let mut challenged = false;
    for response in interactions.iter().filter(|i| i.is_response()) {
        if authentication_required(biller, response)? {
            challenged = true;
            break;
        }
    }

    Ok(ThreeDsSummary {
        requested,
        challenged,
    })
}

/// Returns the value of `field` from the latest response carrying it.
pub fn latest_field(
    interactions: &[BillerInteraction],
    field: &str,
) -> Result<Option<String>, InteractionError> {
    let sorted = sort_interactions(interactions);
    let (_, responses) = partition(&sorted);

    let mut latest = None;
    for response in responses {
        if let Some(value) = response.field(field)? {
            latest = Some(value);
        }
    }
    Ok(latest)
}

/// Step-up data a caller needs to finish a 3-D Secure challenge.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThreeDsArtifacts {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_up_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_up_jwt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_collection_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub device_collection_jwt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acs_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pareq: Option<String>,
}

impl ThreeDsArtifacts {
    pub fn is_empty(&self) -> bool {
        self == &ThreeDsArtifacts::default()
    }
}

/// Everything worth surfacing from a transaction's responses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillerArtifacts {
    pub card_hash: Option<String>,
    pub card_description: Option<String>,
    pub biller_transaction_id: Option<String>,
    pub three_d: ThreeDsArtifacts,
}

/// Scans responses in order; for each artifact the last response carrying it wins.
///
/// This lets a 3-D Secure completion response override what the initial
/// exchange reported.
pub fn extract_artifacts(
    biller: BillerName,
    interactions: &[BillerInteraction],
) -> Result<BillerArtifacts, InteractionError> {
    let fields = fields_for(biller);
    let sorted = sort_interactions(interactions);
    let (_, responses) = partition(&sorted);

    let mut artifacts = BillerArtifacts::default();
    for response in responses {
        overwrite(&mut artifacts.card_hash, read(response, fields.card_hash)?);
        overwrite(
            &mut artifacts.card_description,
            read(response, fields.card_description)?,
        );
        overwrite(
            &mut artifacts.biller_transaction_id,
            read(response, fields.transaction_id)?,
        );

        let three_d = &mut artifacts.three_d;
        overwrite(&mut three_d.step_up_url, read(response, fields.step_up_url)?);
        overwrite(&mut three_d.step_up_jwt, read(response, fields.step_up_jwt)?);
        overwrite(
            &mut three_d.device_collection_url,
            read(response, fields.device_collection_url)?,
        );
        overwrite(
            &mut three_d.device_collection_jwt,
            read(response, fields.device_collection_jwt)?,
        );
        overwrite(&mut three_d.acs_url, read(response, fields.acs_url)?);
        overwrite(&mut three_d.pareq, read(response, fields.pareq)?);
    }

    Ok(artifacts)
}

fn overwrite(slot: &mut Option<String>, value: Option<String>) {
    if value.is_some() {
        *slot = value;
    }
}
