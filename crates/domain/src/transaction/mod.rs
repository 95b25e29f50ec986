//! Transaction aggregate and related types.

mod aggregate;
mod commands;
mod events;
mod response;
mod sale;
mod service;
mod settings;
mod status;
mod value_objects;

pub use aggregate::Transaction;
pub use commands::*;
pub use events::{
    AuthenticationRequestedData, BillerInteractionAddedData, StatusUpdatedData,
    SubsequentOperationFieldsUpdatedData, TransactionCreatedData, TransactionEvent,
};
pub use response::{BillerResponse, ResponseOutcome};
pub use sale::{Sale, SaleCharge, SaleItem};
pub use service::TransactionService;
pub use settings::{
    BillerChargeSettings, EpochSettings, LegacySettings, NetbillingSettings, PumapaySettings,
    QyssoSettings, RocketgateSettings,
};
pub use status::Status;
pub use value_objects::{
    BillerName, ChargeInformation, Currency, Money, PaymentType, RebillSchedule, TransactionType,
};

use thiserror::Error;

/// Errors that can occur during transaction operations.
///
/// Every variant is an invariant violation: the operation is rejected and
/// nothing is mutated.
#[derive(Debug, Error)]
pub enum TransactionError {
    /// The transaction already reached a terminal status.
    #[error("Transaction already processed: status is {status}")]
    AlreadyProcessed { status: Status },

    /// An update by id targeted a transaction that is no longer pending.
    #[error("Previous transaction should be pending: status is {status}")]
    PreviousTransactionShouldBePending { status: Status },

    /// Transaction is already created.
    #[error("Transaction already created")]
    AlreadyCreated,

    /// The command needs a created transaction.
    #[error("Transaction not created")]
    NotCreated,

    /// A rebill schedule was given with a zero initial-days period.
    #[error("Invalid initial days: {initial_days} is not allowed with a rebill schedule")]
    InvalidInitialDays { initial_days: u32 },

    /// One or more charge rules were violated.
    #[error("Invalid charge information: {}", .0.join("; "))]
    InvalidChargeInformation(Vec<String>),

    /// A sale has no main purchase.
    #[error("Main purchase not found")]
    MainPurchaseNotFound,

    /// A sale flags more than one main purchase.
    #[error("Not allowed more than one main purchase: found {count}")]
    MoreThanOneMainPurchase { count: usize },

    /// A cross-sale charge has no site.
    #[error("Cross-sale at position {index} is missing a site id")]
    MissingCrossSaleSiteId { index: usize },

    /// The charge settings belong to a different biller.
    #[error("Charge settings for {settings} cannot be used with biller {biller}")]
    MismatchedChargeSettings {
        biller: BillerName,
        settings: BillerName,
    },

    /// The biller name is not supported.
    #[error("Unknown biller: {0}")]
    UnknownBiller(String),
}
