#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Write mode and retention result types for the destination store.

use mandi_sync_source_models::PartitionKey;
use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

/// How a page is written to the store.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    AsRefStr,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum WriteMode {
    /// Insert-or-update on the record identity. Re-writing a page is a
    /// no-op, so a crash between write and progress save is harmless.
    #[default]
    Upsert,
    /// Plain insert. Cheaper, but a page re-processed after a crash
    /// produces duplicate rows.
    InsertOnly,
}

/// Result of a retention pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PruneResult {
    /// The store is under its row cap (or empty); nothing was deleted.
    Skipped {
        /// Total rows in the store.
        total: u64,
    },
    /// The oldest partition was deleted.
    Pruned {
        /// The partition that was dropped.
        partition: PartitionKey,
        /// Number of rows deleted.
        deleted: u64,
        /// Total rows in the store before the deletion.
        total_before: u64,
    },
}

impl PruneResult {
    /// Returns the number of rows deleted (zero when skipped).
    #[must_use]
    pub const fn deleted(&self) -> u64 {
        match self {
            Self::Skipped { .. } => 0,
            Self::Pruned { deleted, .. } => *deleted,
        }
    }
}
