//! Composition root for the transaction processor.

use std::sync::Arc;

use classification::{ClassificationLookup, ErrorClassifier, InMemoryClassificationTable};
use domain::{
    DomainEventPublisher, DomainEventSubscriber, PersistDomainEventSubscriber,
    TransactionEvent, TransactionRepository, TransactionService,
};
use event_store::EventStore;

use crate::client::BillerClient;
use crate::config::GatewayConfig;
use crate::gateway::{BillerGateway, BillerGateways};
use crate::processor::TransactionProcessor;

/// Wires subscribers, gateways and the classifier once at startup.
pub struct ProcessorBuilder {
    config: GatewayConfig,
    clients: Vec<Arc<dyn BillerClient>>,
    lookup: Option<Arc<dyn ClassificationLookup>>,
    subscribers: Vec<Arc<dyn DomainEventSubscriber<TransactionEvent>>>,
}

impl ProcessorBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            clients: Vec::new(),
            lookup: None,
            subscribers: Vec::new(),
        }
    }

    /// Starts from configuration read from the environment.
    pub fn from_env() -> Self {
        Self::new(GatewayConfig::from_env())
    }

    /// Registers the wire client for one biller.
    pub fn with_client(mut self, client: Arc<dyn BillerClient>) -> Self {
        self.clients.push(client);
        self
    }

    /// Sets the classification table. Without one every decline gets the default bundle.
    pub fn with_classification_lookup(mut self, lookup: Arc<dyn ClassificationLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Persists every published event to the store.
    pub fn with_event_store<S: EventStore + 'static>(self, store: S) -> Self {
        self.with_subscriber(Arc::new(PersistDomainEventSubscriber::new(store)))
    }

    pub fn with_subscriber(
        mut self,
        subscriber: Arc<dyn DomainEventSubscriber<TransactionEvent>>,
    ) -> Self {
        self.subscribers.push(subscriber);
        self
    }

    pub fn build<R: TransactionRepository>(self, repository: R) -> TransactionProcessor<R> {
        let mut publisher = DomainEventPublisher::new();
        for subscriber in self.subscribers {
            publisher.subscribe(subscriber);
        }

        let service = TransactionService::new(repository, Arc::new(publisher))
            .with_max_conflict_retries(self.config.max_conflict_retries);

        let mut gateways = BillerGateways::new();
        for client in self.clients {
            gateways.register(BillerGateway::new(
                client,
                self.config.biller_timeout,
                self.config.breaker,
            ));
        }

        let lookup = self
            .lookup
            .unwrap_or_else(|| Arc::new(InMemoryClassificationTable::new()));
        let classifier = ErrorClassifier::new(lookup, self.config.classifier_settings());

        tracing::info!(billers = ?gateways.billers(), "Transaction processor ready");
        TransactionProcessor::new(service, gateways, classifier)
    }
}

impl Default for ProcessorBuilder {
    fn default() -> Self {
        Self::new(GatewayConfig::default())
    }
}
