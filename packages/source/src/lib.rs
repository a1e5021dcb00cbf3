#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Remote reader and record normalization for mandi price data.
//!
//! The [`RemoteReader`] trait fetches one page of raw records for a
//! partition. [`data_gov::DataGovClient`] implements it against the
//! data.gov.in resource API, classifying failures into the
//! [`FetchError`] variants the run loop switches on. Pages are cleaned and
//! checked against the expected partition by [`normalize::normalize_page`].

pub mod data_gov;
pub mod normalize;
pub mod parsing;
pub mod retry;

use std::collections::BTreeSet;

use async_trait::async_trait;
use mandi_sync_source_models::{PartitionKey, RawRecord};

/// Errors that can occur while constructing a source client.
#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Outcome of a failed page fetch.
///
/// The run loop retries [`FetchError::Transient`] with backoff and aborts
/// on [`FetchError::Fatal`].
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    /// Rate limiting, a server error, a timeout, a dropped connection, or
    /// a body that could not be decoded.
    #[error("{message}")]
    Transient {
        /// What went wrong.
        message: String,
        /// Leading part of the response body, when one was received.
        preview: Option<String>,
    },

    /// A client or auth error that will not go away by retrying.
    #[error("HTTP {status}: {message}")]
    Fatal {
        /// HTTP status code returned by the API.
        status: u16,
        /// What went wrong.
        message: String,
    },
}

impl FetchError {
    /// Returns `true` if the run must stop instead of retrying.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. })
    }

    /// Returns the response body preview captured with the error, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        match self {
            Self::Transient { preview, .. } => preview.as_deref(),
            Self::Fatal { .. } => None,
        }
    }
}

/// A page whose records do not all belong to the expected partition.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unexpected arrival_date value(s) {found:?}, expected only {expected}")]
pub struct IntegrityError {
    /// The partition the run targets.
    pub expected: PartitionKey,
    /// Every distinct partition value seen on the page.
    pub found: BTreeSet<String>,
}

/// Fetches pages of raw records for one partition.
#[async_trait]
pub trait RemoteReader: Send + Sync {
    /// Fetches up to `limit` records of `partition` starting at `offset`.
    ///
    /// An empty vector is a valid page and means the API had nothing at
    /// that offset (yet).
    ///
    /// # Errors
    ///
    /// Returns [`FetchError::Transient`] for retryable failures and
    /// [`FetchError::Fatal`] for non-retryable HTTP statuses.
    async fn fetch(
        &self,
        partition: PartitionKey,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<RawRecord>, FetchError>;
}
