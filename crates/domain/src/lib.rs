//! Domain layer for the payment transaction core.
//!
//! This crate provides:
//! - Aggregate and DomainEvent traits
//! - The synchronous domain event publisher and its persistence subscriber
//! - Repositories with optimistic concurrency and the CommandHandler unit of work
//! - The Transaction aggregate with its status state machine
//! - Biller interactions and their reconciliation

pub mod aggregate;
pub mod command;
pub mod error;
pub mod interaction;
pub mod publisher;
pub mod repository;
pub mod transaction;

pub use aggregate::{Aggregate, DomainEvent};
pub use command::{Command, CommandHandler, CommandResult, DEFAULT_MAX_CONFLICT_RETRIES};
pub use error::DomainError;
pub use interaction::{
    BillerArtifacts, BillerInteraction, BillerTransaction, Exchange, InteractionError,
    InteractionType, ThreeDsArtifacts, ThreeDsSummary,
};
pub use publisher::{
    DomainEventPublisher, DomainEventSubscriber, PersistDomainEventSubscriber, PublishError,
};
pub use repository::{InMemoryRepository, Repository, RepositoryError, TransactionRepository};
pub use transaction::{
    AbortTransaction, ApplyBillerResponse, BillerChargeSettings, BillerName, BillerResponse,
    ChargeInformation, Currency, EpochSettings, LegacySettings, Money, NetbillingSettings,
    NewCancelRebill, NewChargeTransaction, NewRebillUpdate, NewSale, PaymentType,
    PumapaySettings, QyssoSettings, RebillSchedule, RecordRequest, ResponseOutcome,
    RocketgateSettings, Sale, SaleCharge, SaleItem, Status, Transaction, TransactionError,
    TransactionEvent, TransactionService, TransactionType, UpdateExisting,
    UpdateSubsequentOperationFields,
};
