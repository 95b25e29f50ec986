//! Biller-specific charge settings.

use serde::{Deserialize, Serialize};

use super::BillerName;

/// Credentials and options a biller needs to run a charge.
///
/// One variant per biller; each carries only its own fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "biller", rename_all = "lowercase")]
pub enum BillerChargeSettings {
    Rocketgate(RocketgateSettings),
    Netbilling(NetbillingSettings),
    Epoch(EpochSettings),
    Qysso(QyssoSettings),
    Pumapay(PumapaySettings),
    Legacy(LegacySettings),
}

impl BillerChargeSettings {
    /// Returns the biller these settings belong to.
    pub fn biller(&self) -> BillerName {
        match self {
            BillerChargeSettings::Rocketgate(_) => BillerName::Rocketgate,
            BillerChargeSettings::Netbilling(_) => BillerName::Netbilling,
            BillerChargeSettings::Epoch(_) => BillerName::Epoch,
            BillerChargeSettings::Qysso(_) => BillerName::Qysso,
            BillerChargeSettings::Pumapay(_) => BillerName::Pumapay,
            BillerChargeSettings::Legacy(_) => BillerName::Legacy,
        }
    }

    /// Returns true if the charge should go through strong authentication.
    pub fn uses_three_d(&self) -> bool {
        match self {
            BillerChargeSettings::Rocketgate(settings) => settings.use_three_d,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RocketgateSettings {
    pub merchant_id: String,
    pub merchant_password: String,
    pub merchant_site_id: Option<String>,
    pub shared_secret: Option<String>,
    #[serde(default)]
    pub use_three_d: bool,
}

impl RocketgateSettings {
    pub fn new(merchant_id: impl Into<String>, merchant_password: impl Into<String>) -> Self {
        Self {
            merchant_id: merchant_id.into(),
            merchant_password: merchant_password.into(),
            merchant_site_id: None,
            shared_secret: None,
            use_three_d: false,
        }
    }

    pub fn with_three_d(mut self, use_three_d: bool) -> Self {
        self.use_three_d = use_three_d;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetbillingSettings {
    pub account_id: String,
    pub site_tag: String,
    pub merchant_password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpochSettings {
    pub client_id: String,
    pub client_key: String,
    pub client_verification_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QyssoSettings {
    pub company_num: String,
    pub personal_hash_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PumapaySettings {
    pub api_key: String,
    pub business_id: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacySettings {
    pub product_id: String,
    pub return_url: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_report_their_biller() {
        let settings = BillerChargeSettings::Netbilling(NetbillingSettings {
            account_id: "acc".to_string(),
            site_tag: "tag".to_string(),
            merchant_password: "pw".to_string(),
        });
        assert_eq!(settings.biller(), BillerName::Netbilling);
        assert!(!settings.uses_three_d());
    }

    #[test]
    fn test_serialization_is_tagged_by_biller() {
        let settings = BillerChargeSettings::Rocketgate(
            RocketgateSettings::new("1000", "secret").with_three_d(true),
        );

        let json = serde_json::to_value(&settings).unwrap();
        assert_eq!(json["biller"], "rocketgate");
        assert_eq!(json["merchant_id"], "1000");

        let back: BillerChargeSettings = serde_json::from_value(json).unwrap();
        assert!(back.uses_three_d());
    }
}
