use async_trait::async_trait;

use crate::{AggregateId, EventPosition, EventQuery, Result, StoredEvent};

/// Core trait for event store implementations.
///
/// An event store is append-only: every event is recorded exactly once and
/// keeps its position in the global append order. All implementations must
/// be thread-safe (Send + Sync).
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Appends a single event and returns its position.
    ///
    /// A failure here is fatal to the operation that raised the event.
    async fn append(&self, event: StoredEvent) -> Result<EventPosition>;

    /// Appends a batch of events as one step: either every event is
    /// recorded, in order, or none is.
    ///
    /// Returns the position of the last event, or None for an empty batch.
    async fn append_all(&self, events: Vec<StoredEvent>) -> Result<Option<EventPosition>>;

    /// Retrieves all events for a specific aggregate, in append order.
    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>>;

    /// Retrieves events matching a query, in append order.
    async fn query_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>>;
}

/// Extension trait providing convenience methods for event stores.
#[async_trait]
pub trait EventStoreExt: EventStore {
    /// Checks if an aggregate has any recorded events.
    async fn aggregate_exists(&self, aggregate_id: AggregateId) -> Result<bool> {
        Ok(!self.events_for_aggregate(aggregate_id).await?.is_empty())
    }

    /// Returns the event type names recorded for an aggregate, in order.
    async fn event_types_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<String>> {
        Ok(self
            .events_for_aggregate(aggregate_id)
            .await?
            .into_iter()
            .map(|event| event.event_type)
            .collect())
    }
}

// Blanket implementation for all EventStore implementations
impl<T: EventStore + ?Sized> EventStoreExt for T {}
