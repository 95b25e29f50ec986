//! Ordering and pairing of a transaction's interaction log.

use crate::transaction::BillerName;

use super::{BillerInteraction, InteractionError, fields_for};

/// Orders interactions by creation time.
///
/// The sort is stable: interactions created at the same instant keep the
/// order in which they were appended.
pub fn sort_interactions(interactions: &[BillerInteraction]) -> Vec<BillerInteraction> {
    let mut sorted = interactions.to_vec();
    sorted.sort_by_key(|interaction| interaction.created_at());
    sorted
}

/// Splits an already sorted log into requests and responses, keeping order.
pub fn partition(
    sorted: &[BillerInteraction],
) -> (Vec<&BillerInteraction>, Vec<&BillerInteraction>) {
    sorted.iter().partition(|interaction| interaction.is_request())
}

/// One request and the response paired with it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BillerTransaction {
    pub request: BillerInteraction,
    /// None for a trailing request that never got an answer.
    pub response: Option<BillerInteraction>,
    pub biller_transaction_id: Option<String>,
    pub kind: Option<String>,
}

/// Pairs the i-th request with the i-th response after sorting.
///
/// Pairing is positional; there is no correlation id in the payloads.
pub fn pair_interactions(
    biller: BillerName,
    interactions: &[BillerInteraction],
) -> Result<Vec<BillerTransaction>, InteractionError> {
    let fields = fields_for(biller);
    let sorted = sort_interactions(interactions);
    let (requests, responses) = partition(&sorted);

    requests
        .into_iter()
        .enumerate()
        .map(|(index, request)| -> Result<BillerTransaction, InteractionError> {
            let response = responses.get(index).map(|r| (*r).clone());

            let (biller_transaction_id, kind) = match &response {
                Some(response) => (
                    read(response, fields.transaction_id)?,
                    read(response, fields.transaction_kind)?,
                ),
                None => (None, None),
            };

            Ok(BillerTransaction {
                request: request.clone(),
                response,
                biller_transaction_id,
                kind,
            })
        })
        .collect()
}

/// The most recent response and the request paired with it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Exchange {
    pub request: Option<BillerInteraction>,
    pub response: Option<BillerInteraction>,
}

/// Returns the latest response and its positional request.
///
/// A synthetic abort with no request yields `request: None`.
pub fn latest_exchange(interactions: &[BillerInteraction]) -> Exchange {
    let sorted = sort_interactions(interactions);
    let (requests, responses) = partition(&sorted);

    let Some(index) = responses.len().checked_sub(1) else {
        return Exchange::default();
    };

    Exchange {
        request: requests.get(index).map(|r| (*r).clone()),
        response: responses.get(index).map(|r| (*r).clone()),
    }
}

pub(crate) fn read(
    interaction: &BillerInteraction,
    field: Option<&'static str>,
) -> Result<Option<String>, InteractionError> {
    match field {
        Some(name) => interaction.field(name),
        None => Ok(None),
    }
}
