//! Classification read model and the default bundle.

use serde::{Deserialize, Serialize};

use crate::criteria::MappingCriteria;

pub const DEFAULT_GROUP_DECLINE: &str = "9999";
pub const DEFAULT_ERROR_TYPE: &str = "Error";
pub const DEFAULT_GROUP_MESSAGE: &str = "Generic decline";
pub const DEFAULT_RECOMMENDED_ACTION: &str = "Contact support";

/// One row of a classification table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassificationRecord {
    pub group_decline: String,
    pub error_type: String,
    pub group_message: String,
    pub recommended_action: String,
}

impl ClassificationRecord {
    pub fn new(
        group_decline: impl Into<String>,
        error_type: impl Into<String>,
        group_message: impl Into<String>,
        recommended_action: impl Into<String>,
    ) -> Self {
        Self {
            group_decline: group_decline.into(),
            error_type: error_type.into(),
            group_message: group_message.into(),
            recommended_action: recommended_action.into(),
        }
    }

    /// The record used when no row matches.
    pub fn default_bundle() -> Self {
        Self::new(
            DEFAULT_GROUP_DECLINE,
            DEFAULT_ERROR_TYPE,
            DEFAULT_GROUP_MESSAGE,
            DEFAULT_RECOMMENDED_ACTION,
        )
    }
}

/// Human-facing explanation of a decline.
///
/// The criteria are kept for traceability only and are not part of the
/// classification's identity as far as callers are concerned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub group_decline: String,
    pub error_type: String,
    pub group_message: String,
    pub recommended_action: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub criteria: Option<MappingCriteria>,
}

impl ErrorClassification {
    /// Builds a classification from a matched table row.
    pub fn from_record(record: ClassificationRecord, criteria: Option<MappingCriteria>) -> Self {
        Self {
            group_decline: record.group_decline,
            error_type: record.error_type,
            group_message: record.group_message,
            recommended_action: record.recommended_action,
            criteria,
        }
    }

    /// Builds the default bundle.
    pub fn default_for(criteria: Option<MappingCriteria>) -> Self {
        Self::from_record(ClassificationRecord::default_bundle(), criteria)
    }

    /// Returns true if this is the default bundle.
    pub fn is_default(&self) -> bool {
        self.record() == ClassificationRecord::default_bundle()
    }

    /// Returns the classification without its criteria.
    pub fn record(&self) -> ClassificationRecord {
        ClassificationRecord::new(
            self.group_decline.clone(),
            self.error_type.clone(),
            self.group_message.clone(),
            self.recommended_action.clone(),
        )
    }
}
