//! Aggregate repositories with optimistic concurrency.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::AggregateId;
use event_store::Version;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::aggregate::Aggregate;
use crate::transaction::Transaction;

/// Errors raised by a repository.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// The stored aggregate is not at the version the writer read.
    #[error(
        "Concurrency conflict for aggregate {aggregate_id}: expected version {expected}, found {actual}"
    )]
    ConcurrencyConflict {
        aggregate_id: AggregateId,
        expected: Version,
        actual: Version,
    },

    /// The aggregate handed to the repository has never been created.
    #[error("Cannot store an aggregate without an id")]
    MissingId,

    /// The underlying storage failed.
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Storage seam for aggregates.
///
/// Absence on lookup is a normal outcome, used to tell "create" flows from
/// "update" flows.
#[async_trait]
pub trait Repository<A: Aggregate>: Send + Sync {
    /// Loads an aggregate by id.
    async fn find_by_id(&self, id: AggregateId) -> Result<Option<A>, RepositoryError>;

    /// Stores an aggregate if the stored copy is still at `expected_version`.
    ///
    /// A missing aggregate counts as `Version::initial()`.
    async fn save(&self, aggregate: &A, expected_version: Version) -> Result<(), RepositoryError>;

    /// Undoes a save that is still current.
    ///
    /// Puts `previous` back (or removes the aggregate when `previous` is
    /// None) provided the stored copy is still at `current_version`.
    async fn revert(
        &self,
        id: AggregateId,
        previous: Option<&A>,
        current_version: Version,
    ) -> Result<(), RepositoryError>;
}

/// Repository of transaction aggregates.
pub trait TransactionRepository: Repository<Transaction> {}

impl<T: Repository<Transaction>> TransactionRepository for T {}

/// In-memory repository for testing.
#[derive(Clone)]
pub struct InMemoryRepository<A> {
    items: Arc<RwLock<HashMap<AggregateId, A>>>,
    fail_on_save: Arc<AtomicBool>,
}

impl<A> Default for InMemoryRepository<A> {
    fn default() -> Self {
        Self {
            items: Arc::new(RwLock::new(HashMap::new())),
            fail_on_save: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl<A> InMemoryRepository<A> {
    /// Creates a new empty repository.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored aggregates.
    pub async fn len(&self) -> usize {
        self.items.read().await.len()
    }

    /// Returns true if nothing is stored.
    pub async fn is_empty(&self) -> bool {
        self.items.read().await.is_empty()
    }

    /// Makes every subsequent save fail with a storage error.
    pub fn set_fail_on_save(&self, fail: bool) {
        self.fail_on_save.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl<A> Repository<A> for InMemoryRepository<A>
where
    A: Aggregate + Clone + 'static,
{
    async fn find_by_id(&self, id: AggregateId) -> Result<Option<A>, RepositoryError> {
        Ok(self.items.read().await.get(&id).cloned())
    }

    async fn save(&self, aggregate: &A, expected_version: Version) -> Result<(), RepositoryError> {
        if self.fail_on_save.load(Ordering::SeqCst) {
            return Err(RepositoryError::Storage(
                "repository is unavailable".to_string(),
            ));
        }

        let id = aggregate.id().ok_or(RepositoryError::MissingId)?;
        let mut items = self.items.write().await;

        let actual = items
            .get(&id)
            .map(|stored| stored.version())
            .unwrap_or_else(Version::initial);

        if actual != expected_version {
            return Err(RepositoryError::ConcurrencyConflict {
                aggregate_id: id,
                expected: expected_version,
                actual,
            });
        }

        items.insert(id, aggregate.clone());
        Ok(())
    }

    async fn revert(
        &self,
        id: AggregateId,
        previous: Option<&A>,
        current_version: Version,
    ) -> Result<(), RepositoryError> {
        let mut items = self.items.write().await;

        let actual = items
            .get(&id)
            .map(|stored| stored.version())
            .unwrap_or_else(Version::initial);

        if actual != current_version {
            return Err(RepositoryError::ConcurrencyConflict {
                aggregate_id: id,
                expected: current_version,
                actual,
            });
        }

        match previous {
            Some(previous) => {
                items.insert(id, previous.clone());
            }
            None => {
                items.remove(&id);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::{
        BillerChargeSettings, BillerName, ChargeInformation, Currency, Money, NewChargeTransaction,
        PaymentType, RocketgateSettings,
    };
    use common::SiteId;

    fn created_transaction() -> Transaction {
        let cmd = NewChargeTransaction::new(
            SiteId::new(),
            BillerName::Rocketgate,
            PaymentType::Cc,
            ChargeInformation::new(Money::from_cents(1497), Currency::new("USD"), 30),
            BillerChargeSettings::Rocketgate(RocketgateSettings::new("merchant", "secret")),
        );
        let mut transaction = Transaction::default();
        let events = transaction.create_charge(&cmd).unwrap();
        transaction.apply_events(events);
        transaction.set_version(Version::first());
        transaction
    }

    #[tokio::test]
    async fn save_and_find() {
        let repository = InMemoryRepository::new();
        let transaction = created_transaction();
        let id = transaction.id().unwrap();

        repository
            .save(&transaction, Version::initial())
            .await
            .unwrap();

        let found = repository.find_by_id(id).await.unwrap().unwrap();
        assert_eq!(found.version(), Version::first());
        assert!(
            repository
                .find_by_id(AggregateId::new())
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn save_with_stale_version_conflicts() {
        let repository = InMemoryRepository::new();
        let transaction = created_transaction();

        repository
            .save(&transaction, Version::initial())
            .await
            .unwrap();
        let result = repository.save(&transaction, Version::initial()).await;

        assert!(matches!(
            result,
            Err(RepositoryError::ConcurrencyConflict { actual, .. }) if actual == Version::first()
        ));
    }

    #[tokio::test]
    async fn revert_removes_newly_created_aggregate() {
        let repository = InMemoryRepository::new();
        let transaction = created_transaction();
        let id = transaction.id().unwrap();

        repository
            .save(&transaction, Version::initial())
            .await
            .unwrap();
        repository
            .revert(id, None, Version::first())
            .await
            .unwrap();

        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn revert_refuses_when_another_writer_moved_on() {
        let repository = InMemoryRepository::new();
        let transaction = created_transaction();
        let id = transaction.id().unwrap();

        repository
            .save(&transaction, Version::initial())
            .await
            .unwrap();
        let result = repository.revert(id, None, Version::new(5)).await;

        assert!(matches!(
            result,
            Err(RepositoryError::ConcurrencyConflict { .. })
        ));
        assert_eq!(repository.len().await, 1);
    }

    #[tokio::test]
    async fn save_fails_when_storage_unavailable() {
        let repository = InMemoryRepository::new();
        repository.set_fail_on_save(true);

        let result = repository
            .save(&created_transaction(), Version::initial())
            .await;

        assert!(matches!(result, Err(RepositoryError::Storage(_))));
    }
}
