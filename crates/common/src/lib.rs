//! Shared identifier types and call-protection primitives for the payment
//! transaction core.

mod breaker;
mod types;

pub use breaker::{BreakerSettings, CircuitBreaker};
pub use types::{AggregateId, SiteId};
