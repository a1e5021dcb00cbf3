//! In-process [`PriceStore`].
//!
//! Behaves like a table with a unique constraint on the record identity
//! for [`PriceStore::upsert`], and like a table without one for
//! [`PriceStore::insert`]. Backs `--dry-run` and the pipeline tests.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use mandi_sync_source_models::{PartitionKey, PriceRecord};

use crate::{DbError, PriceStore};

/// Rows held in memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    rows: Mutex<Vec<PriceRecord>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store pre-populated with `rows`.
    #[must_use]
    pub const fn with_rows(rows: Vec<PriceRecord>) -> Self {
        Self {
            rows: Mutex::new(rows),
        }
    }

    /// Returns a snapshot of every stored row.
    #[must_use]
    pub fn rows(&self) -> Vec<PriceRecord> {
        self.lock().clone()
    }

    /// Returns the partitions that currently have rows, oldest first.
    #[must_use]
    pub fn partitions(&self) -> BTreeSet<PartitionKey> {
        self.lock().iter().filter_map(partition_of).collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PriceRecord>> {
        self.rows.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn partition_of(row: &PriceRecord) -> Option<PartitionKey> {
    row.partition_value()?.parse().ok()
}

#[async_trait]
impl PriceStore for MemoryStore {
    async fn upsert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
        let mut stored = self.lock();
        for row in rows {
            let identity = row.identity();
            if let Some(existing) = stored.iter_mut().find(|r| r.identity() == identity) {
                *existing = row.clone();
            } else {
                stored.push(row.clone());
            }
        }
        drop(stored);
        Ok(())
    }

    async fn insert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
        self.lock().extend_from_slice(rows);
        Ok(())
    }

    async fn count_for_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
        let count = self
            .lock()
            .iter()
            .filter(|row| partition_of(row) == Some(partition))
            .count();
        Ok(count as u64)
    }

    async fn total_count(&self) -> Result<u64, DbError> {
        Ok(self.lock().len() as u64)
    }

    async fn earliest_partition(&self) -> Result<Option<PartitionKey>, DbError> {
        Ok(self.partitions().into_iter().next())
    }

    async fn delete_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
        let mut stored = self.lock();
        let before = stored.len();
        stored.retain(|row| partition_of(row) != Some(partition));
        let deleted = before - stored.len();
        drop(stored);
        Ok(deleted as u64)
    }
}
