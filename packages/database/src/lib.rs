#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Destination store for normalized mandi price records.
//!
//! [`PriceStore`] is the narrow interface the pipeline needs from the
//! store: exact counts, upsert keyed on the record identity, plain insert,
//! the earliest stored partition, and delete-by-partition. [`supabase`]
//! implements it over the `PostgREST` API and [`memory`] keeps rows in
//! process (dry runs and tests). [`queries`] builds the write sink and the
//! retention policy on top of the trait.

pub mod db;
pub mod memory;
pub mod queries;
pub mod supabase;

use async_trait::async_trait;
use mandi_sync_source_models::{PartitionKey, PriceRecord};

/// Errors that can occur during store operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The HTTP request to the store failed.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The store answered but rejected (part of) the request.
    #[error("Store rejected request (HTTP {status}): {message}")]
    Rejected {
        /// HTTP status of the response.
        status: u16,
        /// Error detail reported by the store.
        message: String,
    },

    /// A response body could not be decoded.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A value returned by the store has an unexpected shape.
    #[error("Data conversion error: {message}")]
    Conversion {
        /// Description of what went wrong.
        message: String,
    },
}

/// Storage operations the pipeline relies on.
///
/// Rows are unique on [`PriceRecord::identity`]; [`PriceStore::upsert`]
/// updates in place on conflict while [`PriceStore::insert`] does not
/// check.
#[async_trait]
pub trait PriceStore: Send + Sync {
    /// Inserts `rows`, replacing any stored row with the same identity.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store rejects any part of the batch.
    async fn upsert(&self, rows: &[PriceRecord]) -> Result<(), DbError>;

    /// Inserts `rows` without conflict handling.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the store rejects any part of the batch.
    async fn insert(&self, rows: &[PriceRecord]) -> Result<(), DbError>;

    /// Returns the exact number of rows stored for `partition`.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the count cannot be obtained.
    async fn count_for_partition(&self, partition: PartitionKey) -> Result<u64, DbError>;

    /// Returns the exact number of rows in the store.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the count cannot be obtained.
    async fn total_count(&self) -> Result<u64, DbError>;

    /// Returns the oldest partition with at least one row.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the query fails or returns a malformed date.
    async fn earliest_partition(&self) -> Result<Option<PartitionKey>, DbError>;

    /// Deletes every row of `partition`, returning how many were removed.
    ///
    /// # Errors
    ///
    /// Returns [`DbError`] if the delete fails.
    async fn delete_partition(&self, partition: PartitionKey) -> Result<u64, DbError>;
}
