//! Append-only store for domain events.
//!
//! Events raised by aggregates are wrapped in a [`StoredEvent`] and appended
//! to an [`EventStore`] exactly once, in publish order. The store never
//! mutates or removes what it has recorded.

pub mod error;
pub mod event;
pub mod memory;
pub mod query;
pub mod store;

pub use common::AggregateId;
pub use error::{EventStoreError, Result};
pub use event::{EventId, EventPosition, StoredEvent, StoredEventBuilder, Version};
pub use memory::InMemoryEventStore;
pub use query::EventQuery;
pub use store::{EventStore, EventStoreExt};
