//! Value objects for the transaction domain.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::TransactionError;

/// External billing provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillerName {
    Rocketgate,
    Netbilling,
    Epoch,
    Qysso,
    Pumapay,
    Legacy,
}

impl BillerName {
    /// Every supported biller.
    pub const ALL: [BillerName; 6] = [
        BillerName::Rocketgate,
        BillerName::Netbilling,
        BillerName::Epoch,
        BillerName::Qysso,
        BillerName::Pumapay,
        BillerName::Legacy,
    ];

    /// Returns the biller's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            BillerName::Rocketgate => "rocketgate",
            BillerName::Netbilling => "netbilling",
            BillerName::Epoch => "epoch",
            BillerName::Qysso => "qysso",
            BillerName::Pumapay => "pumapay",
            BillerName::Legacy => "legacy",
        }
    }
}

impl std::fmt::Display for BillerName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for BillerName {
    type Err = TransactionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lowered = s.trim().to_ascii_lowercase();
        BillerName::ALL
            .into_iter()
            .find(|biller| biller.as_str() == lowered)
            .ok_or_else(|| TransactionError::UnknownBiller(s.to_string()))
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentType {
    Cc,
    Checks,
    Ewallet,
    Banktransfer,
    Cryptocurrency,
}

impl PaymentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentType::Cc => "cc",
            PaymentType::Checks => "checks",
            PaymentType::Ewallet => "ewallet",
            PaymentType::Banktransfer => "banktransfer",
            PaymentType::Cryptocurrency => "cryptocurrency",
        }
    }
}

impl std::fmt::Display for PaymentType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The kind of operation a transaction represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum TransactionType {
    #[default]
    Charge,
    RebillUpdate,
    CancelRebill,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Charge => "charge",
            TransactionType::RebillUpdate => "rebillUpdate",
            TransactionType::CancelRebill => "cancelRebill",
        }
    }
}

impl std::fmt::Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Money amount represented in cents to avoid floating point issues.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a new Money amount from cents.
    pub fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    /// Returns the amount in cents.
    pub fn cents(&self) -> i64 {
        self.0
    }

    /// Returns true if the amount is positive.
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }
}

impl std::fmt::Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.0.abs() / 100, self.0.abs() % 100)
    }
}

/// ISO 4217 currency code.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Currency(String);

impl Currency {
    pub fn new(code: impl Into<String>) -> Self {
        Self(code.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns true for a three-letter upper-case code.
    pub fn is_valid(&self) -> bool {
        self.0.len() == 3 && self.0.chars().all(|c| c.is_ascii_uppercase())
    }
}

impl std::fmt::Display for Currency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Recurring charge attached to an initial charge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RebillSchedule {
    pub amount: Money,
    pub frequency_days: u32,
    pub start_delay_days: u32,
}

impl RebillSchedule {
    pub fn new(amount: Money, frequency_days: u32, start_delay_days: u32) -> Self {
        Self {
            amount,
            frequency_days,
            start_delay_days,
        }
    }
}

/// What the customer is charged, now and later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChargeInformation {
    pub amount: Money,
    pub currency: Currency,
    pub initial_days: u32,
    pub rebill: Option<RebillSchedule>,
}

impl ChargeInformation {
    /// Creates a one-off charge.
    pub fn new(amount: Money, currency: Currency, initial_days: u32) -> Self {
        Self {
            amount,
            currency,
            initial_days,
            rebill: None,
        }
    }

    /// Attaches a rebill schedule.
    pub fn with_rebill(mut self, rebill: RebillSchedule) -> Self {
        self.rebill = Some(rebill);
        self
    }

    /// Checks the charge against every rule and reports all violations at once.
    ///
    /// A zero initial-days period with a rebill schedule is reported on its own
    /// as `InvalidInitialDays`.
    pub fn validate(&self) -> Result<(), TransactionError> {
        if self.initial_days == 0 && self.rebill.is_some() {
            return Err(TransactionError::InvalidInitialDays {
                initial_days: self.initial_days,
            });
        }

        let mut violations = Vec::new();

        if !self.amount.is_positive() {
            violations.push(format!("amount must be positive, got {}", self.amount));
        }
        if !self.currency.is_valid() {
            violations.push(format!(
                "currency must be a three-letter upper-case code, got '{}'",
                self.currency
            ));
        }
        if let Some(rebill) = &self.rebill {
            if !rebill.amount.is_positive() {
                violations.push(format!(
                    "rebill amount must be positive, got {}",
                    rebill.amount
                ));
            }
            if rebill.frequency_days == 0 {
                violations.push("rebill frequency must be at least one day".to_string());
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(TransactionError::InvalidChargeInformation(violations))
        }
    }
}
