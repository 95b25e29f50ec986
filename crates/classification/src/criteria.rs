//! Per-biller mapping criteria.

use domain::{BillerInteraction, BillerName, InteractionError};
use serde::{Deserialize, Serialize};

/// Key fields read from a declined exchange, used to look up a classification.
///
/// Each biller reports declines differently, so each variant carries only the
/// fields its classification table is keyed by. Billers with no table have no
/// variant.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "biller", rename_all = "lowercase")]
pub enum MappingCriteria {
    Rocketgate {
        merchant_id: String,
        reason_code: String,
        bank_response_code: String,
    },
    Netbilling {
        processor: String,
        auth_message: String,
    },
    Qysso {
        reply_code: String,
    },
}

impl MappingCriteria {
    /// Builds criteria from the latest response and its paired request.
    ///
    /// Returns `Ok(None)` for billers without a classification table. A
    /// missing or empty payload is not an error: the fields it would have
    /// supplied are left empty and the degraded case is logged. A response
    /// that is absent or synthetic empties every field.
    pub fn build(
        biller: BillerName,
        request: Option<&BillerInteraction>,
        response: Option<&BillerInteraction>,
    ) -> Result<Option<Self>, InteractionError> {
        let response = response.filter(|r| !r.is_empty());
        let request = match response {
            Some(_) => request.filter(|r| !r.is_empty()),
            None => None,
        };

        if response.is_none() {
            tracing::warn!(%biller, "Building classification criteria without a response payload");
        }

        let criteria = match biller {
            BillerName::Rocketgate => {
                if response.is_some() && request.is_none() {
                    tracing::warn!(%biller, "Building classification criteria without a request payload");
                }
                Some(MappingCriteria::Rocketgate {
                    merchant_id: read(request, "merchantID")?,
                    reason_code: read(response, "reasonCode")?,
                    bank_response_code: read(response, "bankResponseCode")?,
                })
            }
            BillerName::Netbilling => Some(MappingCriteria::Netbilling {
                processor: read(response, "processor")?,
                auth_message: read(response, "auth_msg")?,
            }),
            BillerName::Qysso => Some(MappingCriteria::Qysso {
                reply_code: read(response, "Reply")?,
            }),
            BillerName::Epoch | BillerName::Pumapay | BillerName::Legacy => None,
        };

        Ok(criteria)
    }

    /// Returns the biller these criteria belong to.
    pub fn biller(&self) -> BillerName {
        match self {
            MappingCriteria::Rocketgate { .. } => BillerName::Rocketgate,
            MappingCriteria::Netbilling { .. } => BillerName::Netbilling,
            MappingCriteria::Qysso { .. } => BillerName::Qysso,
        }
    }

    /// Returns the field values in table-key order.
    pub fn values(&self) -> Vec<&str> {
        match self {
            MappingCriteria::Rocketgate {
                merchant_id,
                reason_code,
                bank_response_code,
            } => vec![merchant_id, reason_code, bank_response_code],
            MappingCriteria::Netbilling {
                processor,
                auth_message,
            } => vec![processor, auth_message],
            MappingCriteria::Qysso { reply_code } => vec![reply_code],
        }
    }

    /// Returns true if every field is empty.
    pub fn is_empty(&self) -> bool {
        self.values().iter().all(|v| v.is_empty())
    }
}

fn read(interaction: Option<&BillerInteraction>, field: &str) -> Result<String, InteractionError> {
    match interaction {
        Some(interaction) => Ok(interaction.field(field)?.unwrap_or_default()),
        None => Ok(String::new()),
    }
}
