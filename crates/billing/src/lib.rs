//! Biller dispatch and transaction orchestration.
//!
//! Every biller call goes through a `BillerGateway`, which applies a timeout
//! and a per-biller circuit breaker. An open breaker, a timeout or a client
//! error all surface as `Dispatch::Unavailable`, which the
//! `TransactionProcessor` turns into the Aborted transition.

pub mod builder;
pub mod client;
pub mod config;
pub mod error;
pub mod gateway;
pub mod processor;
pub mod requests;
pub mod telemetry;
pub mod view;

pub use builder::ProcessorBuilder;
pub use client::{BillerClient, BillerCommand, BillerOperation, InMemoryBillerClient};
pub use config::{ConfigError, GatewayConfig, LogFormat};
pub use error::{BillerServiceError, ProcessorError, Result};
pub use gateway::{BillerGateway, BillerGateways, Dispatch};
pub use processor::TransactionProcessor;
pub use requests::{
    CancelRebillRequest, ChargeRequest, CompleteThreeDRequest, PostbackRequest,
    RebillUpdateRequest, SaleRequest,
};
pub use view::TransactionView;
