//! Per-biller payload field names.

use crate::transaction::BillerName;

/// A response field whose value signals that a challenge step took place.
#[derive(Debug, Clone, Copy)]
pub struct AuthRequiredField {
    pub field: &'static str,
    pub values: &'static [&'static str],
}

/// Where each logical datum lives in a biller's payloads.
#[derive(Debug, Clone, Copy, Default)]
pub struct BillerFields {
    /// Request flag marking a purchase started as a 3-D Secure flow.
    pub three_d_request_flag: Option<&'static str>,
    pub auth_required: Option<AuthRequiredField>,
    pub transaction_id: Option<&'static str>,
    pub transaction_kind: Option<&'static str>,
    pub card_hash: Option<&'static str>,
    pub card_description: Option<&'static str>,
    pub step_up_url: Option<&'static str>,
    pub step_up_jwt: Option<&'static str>,
    pub device_collection_url: Option<&'static str>,
    pub device_collection_jwt: Option<&'static str>,
    pub acs_url: Option<&'static str>,
    pub pareq: Option<&'static str>,
}

const ROCKETGATE: BillerFields = BillerFields {
    three_d_request_flag: Some("use3DSecure"),
    auth_required: Some(AuthRequiredField {
        field: "reasonCode",
        values: &["202", "228"],
    }),
    transaction_id: Some("guidNo"),
    transaction_kind: Some("transactionType"),
    card_hash: Some("cardHash"),
    card_description: Some("cardDescription"),
    step_up_url: Some("_3DSECURE_STEP_UP_URL"),
    step_up_jwt: Some("_3DSECURE_STEP_UP_JWT"),
    device_collection_url: Some("_3DSECURE_DEVICE_COLLECTION_URL"),
    device_collection_jwt: Some("_3DSECURE_DEVICE_COLLECTION_JWT"),
    acs_url: Some("acsURL"),
    pareq: Some("PAREQ"),
};

const NETBILLING: BillerFields = BillerFields {
    three_d_request_flag: None,
    auth_required: None,
    transaction_id: Some("trans_id"),
    transaction_kind: Some("tran_type"),
    card_hash: None,
    card_description: None,
    step_up_url: None,
    step_up_jwt: None,
    device_collection_url: None,
    device_collection_jwt: None,
    acs_url: None,
    pareq: None,
};

const QYSSO: BillerFields = BillerFields {
    three_d_request_flag: None,
    auth_required: Some(AuthRequiredField {
        field: "Reply",
        values: &["553"],
    }),
    transaction_id: Some("TransID"),
    transaction_kind: None,
    card_hash: None,
    card_description: None,
    step_up_url: Some("D3Redirect"),
    step_up_jwt: None,
    device_collection_url: None,
    device_collection_jwt: None,
    acs_url: None,
    pareq: None,
};

const EPOCH: BillerFields = BillerFields {
    three_d_request_flag: None,
    auth_required: None,
    transaction_id: Some("transaction_id"),
    transaction_kind: None,
    card_hash: None,
    card_description: None,
    step_up_url: None,
    step_up_jwt: None,
    device_collection_url: None,
    device_collection_jwt: None,
    acs_url: None,
    pareq: None,
};

const PUMAPAY: BillerFields = BillerFields {
    three_d_request_flag: None,
    auth_required: None,
    transaction_id: Some("transactionId"),
    transaction_kind: None,
    card_hash: None,
    card_description: None,
    step_up_url: None,
    step_up_jwt: None,
    device_collection_url: None,
    device_collection_jwt: None,
    acs_url: None,
    pareq: None,
};

const LEGACY: BillerFields = BillerFields {
    three_d_request_flag: None,
    auth_required: None,
    transaction_id: None,
    transaction_kind: None,
    card_hash: None,
    card_description: None,
    step_up_url: None,
    step_up_jwt: None,
    device_collection_url: None,
    device_collection_jwt: None,
    acs_url: None,
    pareq: None,
};

/// Returns the field table for a biller.
pub fn fields_for(biller: BillerName) -> &'static BillerFields {
    match biller {
        BillerName::Rocketgate => &ROCKETGATE,
        BillerName::Netbilling => &NETBILLING,
        BillerName::Epoch => &EPOCH,
        BillerName::Qysso => &QYSSO,
        BillerName::Pumapay => &PUMAPAY,
        BillerName::Legacy => &LEGACY,
    }
}

/// Flag values count as set when they are truthy strings or JSON `true`.
pub(crate) fn is_truthy(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes"
    )
}
