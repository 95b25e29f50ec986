use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    AggregateId, EventPosition, EventQuery, EventStoreError, Result, StoredEvent,
    store::EventStore,
};

/// In-memory event store implementation for testing.
///
/// Events are kept in append order; an event's position is its 1-based
/// index in that order.
#[derive(Clone, Default)]
pub struct InMemoryEventStore {
    events: Arc<RwLock<Vec<StoredEvent>>>,
    fail_on_append: Arc<AtomicBool>,
}

impl InMemoryEventStore {
    /// Creates a new empty in-memory event store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the total number of events stored.
    pub async fn event_count(&self) -> usize {
        self.events.read().await.len()
    }

    /// Makes every subsequent append fail with a storage error.
    pub fn set_fail_on_append(&self, fail: bool) {
        self.fail_on_append.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl EventStore for InMemoryEventStore {
    async fn append(&self, event: StoredEvent) -> Result<EventPosition> {
        self.append_all(vec![event])
            .await?
            .ok_or_else(|| EventStoreError::Storage("nothing was appended".to_string()))
    }

    async fn append_all(&self, events: Vec<StoredEvent>) -> Result<Option<EventPosition>> {
        if self.fail_on_append.load(Ordering::SeqCst) {
            return Err(EventStoreError::Storage(
                "event store is unavailable".to_string(),
            ));
        }

        let mut store = self.events.write().await;

        for (index, event) in events.iter().enumerate() {
            let seen = store
                .iter()
                .chain(&events[..index])
                .any(|e| e.event_id == event.event_id);
            if seen {
                return Err(EventStoreError::DuplicateEvent(event.event_id));
            }
        }

        let appended = events.len() as u64;
        store.extend(events);
        metrics::counter!("event_store_appends_total").increment(appended);
        Ok((appended > 0).then(|| EventPosition::new(store.len() as u64)))
    }

    async fn events_for_aggregate(&self, aggregate_id: AggregateId) -> Result<Vec<StoredEvent>> {
        let store = self.events.read().await;
        Ok(store
            .iter()
            .filter(|e| e.aggregate_id == aggregate_id)
            .cloned()
            .collect())
    }

    async fn query_events(&self, query: EventQuery) -> Result<Vec<StoredEvent>> {
        let store = self.events.read().await;
        let offset = query.offset.unwrap_or(0);
        let limit = query.limit.unwrap_or(usize::MAX);

        Ok(store
            .iter()
            .filter(|e| query.matches(e))
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }
}
