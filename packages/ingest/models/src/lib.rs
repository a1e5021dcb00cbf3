#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Run configuration, outcome, and report types.

use std::time::Duration;

use mandi_sync_database_models::WriteMode;
use mandi_sync_source_models::PartitionKey;
use serde::{Deserialize, Serialize};

/// Tuning for one run of the sync loop. Built once at startup and shared
/// by reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunConfig {
    /// Records requested per page.
    pub page_size: u32,
    /// Maximum time to establish a connection to the API.
    pub connect_timeout: Duration,
    /// Maximum time to wait between reads of an API response.
    pub read_timeout: Duration,
    /// First delay after a failure; also the floor backoff resets to.
    pub initial_backoff: Duration,
    /// Ceiling for failure and empty-page delays.
    pub max_backoff: Duration,
    /// Relative jitter applied to every delay (`0.2` = ±20%).
    pub jitter_ratio: f64,
    /// Wall-clock budget for the whole run.
    pub max_runtime: Duration,
    /// Consecutive failures after which the run aborts.
    pub max_consecutive_errors: u32,
    /// Empty pages tolerated before the partition is considered complete.
    pub max_empty_page_retries: u32,
    /// Store size at which the oldest partition is pruned.
    pub max_total_rows: u64,
    /// Partitions kept in the local progress file.
    pub max_state_partitions: usize,
    /// Local hour before which runs target the previous day.
    pub rollover_hour: u32,
    /// IANA timezone the rollover hour is evaluated in.
    pub timezone: String,
    /// Pause after each successfully written page.
    pub success_sleep: Duration,
    /// Resume from the store's row count as well as the progress file.
    pub resume_from_store: bool,
    /// How pages are written.
    pub write_mode: WriteMode,
    /// Run retention pruning before syncing.
    pub prune: bool,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            page_size: 200,
            connect_timeout: Duration::from_secs(10),
            read_timeout: Duration::from_secs(120),
            initial_backoff: Duration::from_secs(5),
            max_backoff: Duration::from_secs(120),
            jitter_ratio: 0.2,
            max_runtime: Duration::from_secs(4 * 60 * 60),
            max_consecutive_errors: 9_999,
            max_empty_page_retries: 5,
            max_total_rows: 300_000,
            max_state_partitions: 3,
            rollover_hour: 9,
            timezone: "Asia/Kolkata".to_string(),
            success_sleep: Duration::ZERO,
            resume_from_store: true,
            write_mode: WriteMode::Upsert,
            prune: true,
        }
    }
}

/// Why a run stopped without completing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AbortReason {
    /// The API answered with a status that retrying will not fix.
    FatalUpstream {
        /// HTTP status code.
        status: u16,
    },
    /// Too many failures in a row.
    ErrorBudgetExhausted {
        /// Failures counted when the run gave up.
        consecutive_errors: u32,
    },
}

/// How a run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunOutcome {
    /// The partition was drained (enough consecutive empty pages).
    Completed,
    /// The runtime budget ran out; progress is kept for the next run.
    DeadlineReached,
    /// The run gave up.
    Aborted(AbortReason),
}

impl RunOutcome {
    /// Process exit status for this outcome.
    ///
    /// `0` for completed or deadline, `2` for a fatal upstream status, `3`
    /// for an exhausted error budget.
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Completed | Self::DeadlineReached => 0,
            Self::Aborted(AbortReason::FatalUpstream { .. }) => 2,
            Self::Aborted(AbortReason::ErrorBudgetExhausted { .. }) => 3,
        }
    }
}

/// Summary of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    /// How the run ended.
    pub outcome: RunOutcome,
    /// The partition the run targeted.
    pub partition: PartitionKey,
    /// Offset the run resumed from.
    pub start_offset: u64,
    /// Offset reached (next offset to request).
    pub final_offset: u64,
    /// Number of fetch attempts, successful or not.
    pub fetch_calls: u64,
    /// Pages normalized and written.
    pub pages_written: u64,
    /// Cleaned records across all written pages.
    pub records_cleaned: u64,
    /// Distinct rows written after in-batch dedupe.
    pub rows_written: u64,
    /// Highest consecutive-failure count reached.
    pub peak_consecutive_errors: u32,
    /// Consecutive-failure count when the run ended.
    pub consecutive_errors: u32,
    /// Empty pages received in total.
    pub empty_pages: u64,
}

impl RunReport {
    /// Creates an empty report for a run starting at `start_offset`.
    #[must_use]
    pub const fn new(partition: PartitionKey, start_offset: u64) -> Self {
        Self {
            outcome: RunOutcome::Completed,
            partition,
            start_offset,
            final_offset: start_offset,
            fetch_calls: 0,
            pages_written: 0,
            records_cleaned: 0,
            rows_written: 0,
            peak_consecutive_errors: 0,
            consecutive_errors: 0,
            empty_pages: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_distinguish_abort_reasons() {
        assert_eq!(RunOutcome::Completed.exit_code(), 0);
        assert_eq!(RunOutcome::DeadlineReached.exit_code(), 0);
        let fatal = RunOutcome::Aborted(AbortReason::FatalUpstream { status: 401 });
        let budget = RunOutcome::Aborted(AbortReason::ErrorBudgetExhausted {
            consecutive_errors: 5,
        });
        assert_eq!(fatal.exit_code(), 2);
        assert_eq!(budget.exit_code(), 3);
    }

    #[test]
    fn defaults_match_production_schedule() {
        let config = RunConfig::default();
        assert_eq!(config.page_size, 200);
        assert_eq!(config.rollover_hour, 9);
        assert!(config.initial_backoff < config.max_backoff);
        assert_eq!(config.write_mode, WriteMode::Upsert);
    }
}
