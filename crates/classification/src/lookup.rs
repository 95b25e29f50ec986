//! Classification table lookup.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::classification::ClassificationRecord;
use crate::criteria::MappingCriteria;
use crate::error::ClassificationError;

/// External per-biller classification table.
///
/// A miss is `Ok(None)`, not an error.
#[async_trait]
pub trait ClassificationLookup: Send + Sync {
    async fn resolve(
        &self,
        criteria: &MappingCriteria,
    ) -> Result<Option<ClassificationRecord>, ClassificationError>;
}

/// In-memory classification table for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryClassificationTable {
    rows: Arc<RwLock<HashMap<MappingCriteria, ClassificationRecord>>>,
    fail_on_resolve: Arc<AtomicBool>,
    delay_ms: Arc<AtomicU64>,
}

impl InMemoryClassificationTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a row.
    pub async fn insert(&self, criteria: MappingCriteria, record: ClassificationRecord) {
        self.rows.write().await.insert(criteria, record);
    }

    /// Returns the number of rows.
    pub async fn len(&self) -> usize {
        self.rows.read().await.len()
    }

    /// Returns true if the table has no rows.
    pub async fn is_empty(&self) -> bool {
        self.rows.read().await.is_empty()
    }

    /// Makes every lookup fail.
    pub fn set_fail_on_resolve(&self, fail: bool) {
        self.fail_on_resolve.store(fail, Ordering::SeqCst);
    }

    /// Delays every lookup.
    pub fn set_delay(&self, delay: Duration) {
        self.delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }
}

#[async_trait]
impl ClassificationLookup for InMemoryClassificationTable {
    async fn resolve(
        &self,
        criteria: &MappingCriteria,
    ) -> Result<Option<ClassificationRecord>, ClassificationError> {
        let delay = self.delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(Duration::from_millis(delay)).await;
        }

        if self.fail_on_resolve.load(Ordering::SeqCst) {
            return Err(ClassificationError::Lookup(
                "Simulated lookup failure".to_string(),
            ));
        }

        Ok(self.rows.read().await.get(criteria).cloned())
    }
}
