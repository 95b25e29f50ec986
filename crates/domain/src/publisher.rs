//! Synchronous domain event dispatch.
//!
//! Events raised by an aggregate are handed to every interested subscriber,
//! in registration order, before the triggering operation completes. There is
//! no queue: a subscriber failure propagates straight back to the caller.
//!
//! Durable subscribers run after every other subscriber has accepted the
//! events, so nothing is recorded for an operation that is going to fail.

use std::sync::Arc;

use async_trait::async_trait;
use event_store::{EventStore, EventStoreError, StoredEvent};
use thiserror::Error;

use crate::aggregate::DomainEvent;

/// Errors raised while publishing an event.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The event store rejected the event.
    #[error("Event store error: {0}")]
    EventStore(#[from] EventStoreError),

    /// The event could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A subscriber failed for its own reasons.
    #[error("Subscriber {subscriber} failed: {message}")]
    Subscriber {
        subscriber: &'static str,
        message: String,
    },
}

/// Receives published events.
#[async_trait]
pub trait DomainEventSubscriber<E: DomainEvent>: Send + Sync {
    /// Name used in logs.
    fn name(&self) -> &'static str;

    /// Returns true if this subscriber wants the event.
    fn is_subscribed_to(&self, event: &E) -> bool;

    /// Handles one event.
    async fn handle(&self, event: &E) -> Result<(), PublishError>;

    /// True for subscribers that record events permanently.
    fn is_durable(&self) -> bool {
        false
    }

    /// Handles the events of one operation, in order.
    async fn handle_all(&self, events: &[&E]) -> Result<(), PublishError> {
        for event in events {
            self.handle(event).await?;
        }
        Ok(())
    }
}

/// Dispatches events to subscribers wired once at startup.
///
/// Built explicitly by the composition root and shared behind an `Arc`.
/// It is intentionally not `Clone`.
pub struct DomainEventPublisher<E: DomainEvent> {
    subscribers: Vec<Arc<dyn DomainEventSubscriber<E>>>,
}

impl<E: DomainEvent> Default for DomainEventPublisher<E> {
    fn default() -> Self {
        Self {
            subscribers: Vec::new(),
        }
    }
}

impl<E: DomainEvent> DomainEventPublisher<E> {
    /// Creates a publisher with no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a subscriber. Subscribers are never de-duplicated or removed.
    pub fn subscribe(&mut self, subscriber: Arc<dyn DomainEventSubscriber<E>>) {
        tracing::debug!(subscriber = subscriber.name(), "Subscriber registered");
        self.subscribers.push(subscriber);
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Delivers an event to every interested subscriber.
    ///
    /// Stops at the first failing subscriber.
    pub async fn publish(&self, event: &E) -> Result<(), PublishError> {
        self.publish_all(std::slice::from_ref(event)).await
    }

    /// Delivers the events of one operation.
    ///
    /// Every event goes to the other subscribers first, in registration order.
    /// Durable subscribers then receive the whole batch at once.
    pub async fn publish_all(&self, events: &[E]) -> Result<(), PublishError> {
        let (durable, transient): (Vec<_>, Vec<_>) = self
            .subscribers
            .iter()
            .partition(|subscriber| subscriber.is_durable());

        for event in events {
            for subscriber in &transient {
                if subscriber.is_subscribed_to(event) {
                    subscriber
                        .handle(event)
                        .await
                        .inspect_err(|error| log_failure(subscriber.name(), event, error))?;
                }
            }
        }

        for subscriber in &durable {
            let wanted: Vec<&E> = events
                .iter()
                .filter(|event| subscriber.is_subscribed_to(event))
                .collect();
            if let Some(first) = wanted.first() {
                subscriber
                    .handle_all(&wanted)
                    .await
                    .inspect_err(|error| log_failure(subscriber.name(), *first, error))?;
            }
        }

        for event in events {
            metrics::counter!("domain_events_published_total", "event_type" => event.event_type())
                .increment(1);
        }
        Ok(())
    }
}

fn log_failure<E: DomainEvent>(subscriber: &str, event: &E, error: &PublishError) {
    tracing::error!(
        subscriber,
        event_type = event.event_type(),
        aggregate_id = %event.aggregate_id(),
        error = %error,
        "Subscriber failed to handle event"
    );
}

/// Appends every published event to an event store.
pub struct PersistDomainEventSubscriber<S: EventStore> {
    store: S,
}

impl<S: EventStore> PersistDomainEventSubscriber<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }
}

#[async_trait]
impl<S, E> DomainEventSubscriber<E> for PersistDomainEventSubscriber<S>
where
    S: EventStore + 'static,
    E: DomainEvent,
{
    fn name(&self) -> &'static str {
        "persist_domain_event"
    }

    fn is_subscribed_to(&self, _event: &E) -> bool {
        true
    }

    async fn handle(&self, event: &E) -> Result<(), PublishError> {
        <Self as DomainEventSubscriber<E>>::handle_all(self, &[event]).await
    }

    fn is_durable(&self) -> bool {
        true
    }

    async fn handle_all(&self, events: &[&E]) -> Result<(), PublishError> {
        let stored = events
            .iter()
            .map(|event| to_stored(*event))
            .collect::<Result<Vec<_>, _>>()?;

        let position = self.store.append_all(stored).await?;
        tracing::debug!(
            count = events.len(),
            position = ?position,
            "Events persisted"
        );
        Ok(())
    }
}

fn to_stored<E: DomainEvent>(event: &E) -> Result<StoredEvent, PublishError> {
    StoredEvent::builder()
        .event_type(event.event_type())
        .aggregate_id(event.aggregate_id())
        .occurred_on(event.occurred_on())
        .payload(event)?
        .try_build()
        .ok_or_else(|| PublishError::Subscriber {
            subscriber: "persist_domain_event",
            message: "stored event is incomplete".to_string(),
        })
}
