#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Resumable daily sync of mandi prices.
//!
//! [`sync_partition`] drives one run for one partition: it prunes the
//! store, resumes from the furthest known offset, then pages through the
//! API until the partition is drained, the runtime budget runs out, or the
//! run has to give up. Progress only ever moves forward after a page has
//! been written.

pub mod backoff;
pub mod config;
pub mod partition;
pub mod paths;
pub mod progress;

use std::time::Duration;

use mandi_sync_database::{DbError, PriceStore, queries};
use mandi_sync_ingest_models::{AbortReason, RunConfig, RunOutcome, RunReport};
use mandi_sync_source::normalize::normalize_page;
use mandi_sync_source::retry::truncate_chars;
use mandi_sync_source::{FetchError, IntegrityError, RemoteReader};
use mandi_sync_source_models::PartitionKey;
use tokio::time::Instant;

use crate::backoff::Backoff;
use crate::progress::{ProgressFile, ProgressState};

/// Longest response preview written to the log.
pub const LOG_PREVIEW_LEN: usize = 800;

/// Failures while preparing a run. These stop the process before any page
/// is fetched.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// The store could not be pruned or counted.
    #[error("Store error: {0}")]
    Store(#[from] DbError),
}

/// A failed attempt at one page.
#[derive(Debug, thiserror::Error)]
pub enum PageError {
    /// The API request failed.
    #[error("fetch failed: {0}")]
    Fetch(#[from] FetchError),

    /// The page contained records from another partition.
    #[error("integrity check failed: {0}")]
    Integrity(#[from] IntegrityError),

    /// The store rejected the page.
    #[error("write failed: {0}")]
    Write(#[from] DbError),
}

impl PageError {
    /// Returns the HTTP status if this failure must end the run.
    #[must_use]
    pub const fn fatal_status(&self) -> Option<u16> {
        match self {
            Self::Fetch(FetchError::Fatal { status, .. }) => Some(*status),
            _ => None,
        }
    }

    /// Returns `true` if retrying cannot help.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        self.fatal_status().is_some()
    }

    /// Returns the captured response preview, if any.
    #[must_use]
    pub fn preview(&self) -> Option<&str> {
        match self {
            Self::Fetch(e) => e.preview(),
            Self::Integrity(_) | Self::Write(_) => None,
        }
    }
}

/// Everything a run needs, built once at startup.
#[derive(Clone, Copy)]
pub struct SyncContext<'a> {
    /// Run tuning.
    pub config: &'a RunConfig,
    /// Source of pages.
    pub reader: &'a dyn RemoteReader,
    /// Destination of records.
    pub store: &'a dyn PriceStore,
    /// Local progress file.
    pub progress: &'a ProgressFile,
}

enum PageOutcome {
    Empty,
    Written { cleaned: u64, written: u64 },
}

/// Returns the offset a run should resume `partition` from: the larger of
/// the store's row count (when enabled) and the saved progress.
///
/// # Errors
///
/// Returns [`IngestError::Store`] if the store cannot be counted.
pub async fn resolve_start_offset(
    ctx: &SyncContext<'_>,
    partition: PartitionKey,
    state: &ProgressState,
) -> Result<u64, IngestError> {
    let stored = if ctx.config.resume_from_store {
        ctx.store.count_for_partition(partition).await?
    } else {
        0
    };
    let saved = state.get(&partition).copied().unwrap_or(0);

    log::debug!("Resume candidates for {partition}: store={stored} progress={saved}");

    Ok(stored.max(saved))
}

/// Syncs one partition until it is drained, the runtime budget is spent,
/// or the run aborts.
///
/// Only preparation failures are returned as errors; how the loop itself
/// ended is reported in [`RunReport::outcome`].
///
/// # Errors
///
/// Returns [`IngestError`] if pruning or the resume count fails. Progress
/// file problems are logged and never end the run.
pub async fn sync_partition(
    ctx: &SyncContext<'_>,
    partition: PartitionKey,
) -> Result<RunReport, IngestError> {
    let config = ctx.config;
    let started = Instant::now();
    let deadline = started + config.max_runtime;

    if config.prune {
        queries::prune_if_needed(ctx.store, config.max_total_rows).await?;
    }

    let mut state = ctx.progress.load();
    let start_offset = resolve_start_offset(ctx, partition, &state).await?;

    log::info!(
        "Starting mandi sync date={partition} api_date={} offset={start_offset} limit={} max_runtime_s={} resume_from_store={}",
        partition.api_filter(),
        config.page_size,
        config.max_runtime.as_secs(),
        config.resume_from_store,
    );

    let mut report = RunReport::new(partition, start_offset);
    let mut offset = start_offset;
    let mut backoff = Backoff::from_config(config);
    let mut consecutive_errors: u32 = 0;
    let mut empty_streak: u32 = 0;

    report.outcome = loop {
        let now = Instant::now();
        if now >= deadline {
            log::warn!(
                "Stopping due to max runtime: elapsed_s={} offset={offset}",
                now.duration_since(started).as_secs()
            );
            break RunOutcome::DeadlineReached;
        }

        report.fetch_calls += 1;
        match process_page(ctx, partition, offset).await {
            Ok(PageOutcome::Empty) => {
                report.empty_pages += 1;
                empty_streak += 1;
                if empty_streak >= config.max_empty_page_retries {
                    log::info!(
                        "No more records after {empty_streak} empty page(s); run complete"
                    );
                    break RunOutcome::Completed;
                }

                let delay = backoff.empty_page_delay(empty_streak);
                log::info!(
                    "Empty page at offset {offset}; retrying ({empty_streak}/{}) in {:.1}s",
                    config.max_empty_page_retries,
                    delay.as_secs_f64(),
                );
                sleep_within(delay, deadline).await;
            }
            Ok(PageOutcome::Written { cleaned, written }) => {
                offset += cleaned;
                report.final_offset = offset;
                report.pages_written += 1;
                report.records_cleaned += cleaned;
                report.rows_written += written;

                log::info!("Wrote {written} records (post-dedupe) | offset now {offset}");

                state.insert(partition, offset);
                ctx.progress.save(&state);

                empty_streak = 0;
                consecutive_errors = 0;
                backoff.reset();

                sleep_within(config.success_sleep, deadline).await;
            }
            Err(e) => {
                consecutive_errors += 1;
                report.peak_consecutive_errors =
                    report.peak_consecutive_errors.max(consecutive_errors);
                log_page_error(offset, &e);

                if let Some(status) = e.fatal_status() {
                    log::error!("offset={offset} non-retryable HTTP status {status}; aborting");
                    break RunOutcome::Aborted(AbortReason::FatalUpstream { status });
                }

                if consecutive_errors >= config.max_consecutive_errors {
                    log::error!(
                        "offset={offset} exceeded {} consecutive errors; aborting",
                        config.max_consecutive_errors
                    );
                    break RunOutcome::Aborted(AbortReason::ErrorBudgetExhausted {
                        consecutive_errors,
                    });
                }

                let delay = backoff.next_delay();
                log::warn!(
                    "Retrying offset {offset} in {:.1}s ({consecutive_errors} consecutive error(s))",
                    delay.as_secs_f64()
                );
                sleep_within(delay, deadline).await;
            }
        }
    };

    report.consecutive_errors = consecutive_errors;

    log::info!(
        "Finished {partition}: {:?} offset {start_offset} -> {offset}, {} page(s), {} record(s) cleaned, {} row(s) written, {} fetch call(s) in {:.1}s",
        report.outcome,
        report.pages_written,
        report.records_cleaned,
        report.rows_written,
        report.fetch_calls,
        started.elapsed().as_secs_f64(),
    );

    Ok(report)
}

async fn process_page(
    ctx: &SyncContext<'_>,
    partition: PartitionKey,
    offset: u64,
) -> Result<PageOutcome, PageError> {
    let raw = ctx
        .reader
        .fetch(partition, offset, ctx.config.page_size)
        .await?;
    if raw.is_empty() {
        return Ok(PageOutcome::Empty);
    }

    let cleaned = normalize_page(raw, partition)?;
    let written = queries::dedupe_and_write(ctx.store, &cleaned, ctx.config.write_mode).await?;

    Ok(PageOutcome::Written {
        cleaned: cleaned.len() as u64,
        written,
    })
}

/// Sleeps for `delay`, but never past `deadline`.
async fn sleep_within(delay: Duration, deadline: Instant) {
    let delay = delay.min(deadline.saturating_duration_since(Instant::now()));
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }
}

/// Returns the part of a response preview that may be logged.
///
/// HTML bodies (error pages from proxies and gateways) are dropped
/// entirely; anything else is cut to [`LOG_PREVIEW_LEN`] characters.
#[must_use]
pub fn loggable_preview(preview: &str) -> Option<&str> {
    let preview = preview.trim();
    if preview.is_empty() || preview.to_ascii_lowercase().contains("<html") {
        return None;
    }
    Some(truncate_chars(preview, LOG_PREVIEW_LEN))
}

fn log_page_error(offset: u64, error: &PageError) {
    match error.preview().and_then(loggable_preview) {
        Some(preview) => log::error!("offset={offset} {error} | preview: {preview}"),
        None => log::error!("offset={offset} {error}"),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::path::PathBuf;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::{Mutex, PoisonError};

    use async_trait::async_trait;
    use mandi_sync_database::memory::MemoryStore;
    use mandi_sync_source_models::{PriceRecord, RawRecord};

    use super::*;

    const SECOND: Duration = Duration::from_secs(1);

    type Reply = Result<Vec<RawRecord>, FetchError>;

    /// Replays scripted replies, then empty pages forever.
    struct ScriptedReader {
        replies: Mutex<VecDeque<Reply>>,
        calls: Mutex<Vec<(Instant, u64)>>,
    }

    impl ScriptedReader {
        fn new(replies: Vec<Reply>) -> Self {
            Self {
                replies: Mutex::new(replies.into()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn offsets(&self) -> Vec<u64> {
            let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls.iter().map(|(_, offset)| *offset).collect()
        }

        /// Whole seconds between consecutive fetches.
        fn gaps(&self) -> Vec<u64> {
            let calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            calls
                .windows(2)
                .map(|w| w[1].0.duration_since(w[0].0).as_secs())
                .collect()
        }
    }

    #[async_trait]
    impl RemoteReader for ScriptedReader {
        async fn fetch(
            &self,
            _partition: PartitionKey,
            offset: u64,
            _limit: u32,
        ) -> Result<Vec<RawRecord>, FetchError> {
            self.calls
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((Instant::now(), offset));
            self.replies
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .unwrap_or_else(|| Ok(Vec::new()))
        }
    }

    /// Rejects the first `failures` writes, then delegates.
    struct FlakyStore {
        inner: MemoryStore,
        failures: AtomicU32,
    }

    impl FlakyStore {
        fn check(&self) -> Result<(), DbError> {
            let left = self.failures.load(Ordering::SeqCst);
            if left > 0 {
                self.failures.store(left - 1, Ordering::SeqCst);
                return Err(DbError::Rejected {
                    status: 500,
                    message: "temporarily unavailable".to_string(),
                });
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PriceStore for FlakyStore {
        async fn upsert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
            self.check()?;
            self.inner.upsert(rows).await
        }

        async fn insert(&self, rows: &[PriceRecord]) -> Result<(), DbError> {
            self.check()?;
            self.inner.insert(rows).await
        }

        async fn count_for_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
            self.inner.count_for_partition(partition).await
        }

        async fn total_count(&self) -> Result<u64, DbError> {
            self.inner.total_count().await
        }

        async fn earliest_partition(&self) -> Result<Option<PartitionKey>, DbError> {
            self.inner.earliest_partition().await
        }

        async fn delete_partition(&self, partition: PartitionKey) -> Result<u64, DbError> {
            self.inner.delete_partition(partition).await
        }
    }

    fn key(s: &str) -> PartitionKey {
        s.parse().unwrap()
    }

    fn raw(market: &str, arrival_date: &str) -> RawRecord {
        match serde_json::json!({
            "state": "Maharashtra",
            "district": "Nashik",
            "market": market,
            "commodity": "Onion",
            "variety": "Red",
            "grade": "FAQ",
            "arrival_date": arrival_date,
            "modal_price": "1500",
        }) {
            serde_json::Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    fn page(markets: &[&str]) -> Reply {
        Ok(markets.iter().map(|m| raw(m, "10/01/2024")).collect())
    }

    fn transient() -> Reply {
        Err(FetchError::Transient {
            message: "HTTP 503 Service Unavailable from data.gov.in".to_string(),
            preview: Some("upstream busy".to_string()),
        })
    }

    fn scratch_progress(name: &str) -> ProgressFile {
        let dir: PathBuf = std::env::temp_dir().join(format!("mandi_sync_run_{name}"));
        let _ = std::fs::remove_dir_all(&dir);
        ProgressFile::new(dir.join("state.json"), 3)
    }

    fn quiet_config() -> RunConfig {
        RunConfig {
            jitter_ratio: 0.0,
            initial_backoff: 5 * SECOND,
            max_backoff: 120 * SECOND,
            ..RunConfig::default()
        }
    }

    #[tokio::test(start_paused = true)]
    async fn drains_partition_after_empty_pages() {
        let config = RunConfig {
            max_empty_page_retries: 2,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![page(&["A", "B"]), Ok(vec![]), Ok(vec![])]);
        let store = MemoryStore::new();
        let progress = scratch_progress("drains");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.outcome.exit_code(), 0);
        assert_eq!(report.fetch_calls, 3);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.final_offset, 2);
        assert_eq!(reader.offsets(), [0, 2, 2]);
        assert_eq!(store.rows().len(), 2);
        assert_eq!(progress.load().get(&key("2024-01-10")), Some(&2));
    }

    #[tokio::test(start_paused = true)]
    async fn backoff_grows_across_failures_and_resets_on_success() {
        let config = RunConfig {
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![
            transient(),
            transient(),
            transient(),
            page(&["A"]),
            transient(),
            page(&["B"]),
        ]);
        let store = MemoryStore::new();
        let progress = scratch_progress("backoff");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.peak_consecutive_errors, 3);
        assert_eq!(report.consecutive_errors, 0);
        assert_eq!(report.final_offset, 2);
        assert_eq!(reader.gaps(), [5, 10, 20, 0, 5, 0]);
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_status_aborts_without_retry() {
        let config = quiet_config();
        let reader = ScriptedReader::new(vec![Err(FetchError::Fatal {
            status: 401,
            message: "unauthorized".to_string(),
        })]);
        let store = MemoryStore::new();
        let progress = scratch_progress("fatal");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(
            report.outcome,
            RunOutcome::Aborted(AbortReason::FatalUpstream { status: 401 })
        );
        assert_eq!(report.outcome.exit_code(), 2);
        assert_eq!(report.fetch_calls, 1);
        assert_eq!(report.final_offset, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn error_budget_aborts_run() {
        let config = RunConfig {
            max_consecutive_errors: 3,
            ..quiet_config()
        };
        let reader = ScriptedReader::new((0..10).map(|_| transient()).collect());
        let store = MemoryStore::new();
        let progress = scratch_progress("budget");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(
            report.outcome,
            RunOutcome::Aborted(AbortReason::ErrorBudgetExhausted {
                consecutive_errors: 3
            })
        );
        assert_eq!(report.outcome.exit_code(), 3);
        assert_eq!(report.fetch_calls, 3);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_cleanly_and_caps_sleep() {
        let config = RunConfig {
            max_runtime: 30 * SECOND,
            ..quiet_config()
        };
        let reader = ScriptedReader::new((0..10).map(|_| transient()).collect());
        let store = MemoryStore::new();
        let progress = scratch_progress("deadline");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let started = Instant::now();
        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::DeadlineReached);
        assert_eq!(report.outcome.exit_code(), 0);
        // Fetches at 0s, 5s and 15s; the 20s backoff is cut to 15s.
        assert_eq!(report.fetch_calls, 3);
        assert_eq!(started.elapsed().as_secs(), 30);
        assert_eq!(reader.gaps(), [5, 10]);
    }

    #[tokio::test(start_paused = true)]
    async fn integrity_failure_refetches_same_offset() {
        let config = RunConfig {
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![
            Ok(vec![raw("A", "10/01/2024"), raw("B", "09/01/2024")]),
            page(&["A", "B"]),
        ]);
        let store = MemoryStore::new();
        let progress = scratch_progress("integrity");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(reader.offsets(), [0, 0, 2]);
        assert_eq!(report.peak_consecutive_errors, 1);
        assert_eq!(store.rows().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn write_failure_does_not_advance_offset() {
        let config = RunConfig {
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![page(&["A", "B"]), page(&["A", "B"])]);
        let store = FlakyStore {
            inner: MemoryStore::new(),
            failures: AtomicU32::new(1),
        };
        let progress = scratch_progress("write_failure");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(reader.offsets(), [0, 0, 2]);
        assert_eq!(report.pages_written, 1);
        assert_eq!(store.inner.rows().len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn offset_advances_by_cleaned_count_not_deduped_count() {
        let config = RunConfig {
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![page(&["A", "A", "B"])]);
        let store = MemoryStore::new();
        let progress = scratch_progress("dedupe_offset");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.records_cleaned, 3);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.final_offset, 3);
        assert_eq!(reader.offsets(), [0, 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn unusable_progress_location_does_not_stop_run() {
        let dir = std::env::temp_dir().join("mandi_sync_run_blocked_progress");
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        // A regular file where the progress directory should be.
        let blocker = dir.join("blocker");
        std::fs::write(&blocker, "").unwrap();
        let progress = ProgressFile::new(blocker.join("sub").join("state.json"), 3);

        let config = RunConfig {
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![page(&["A", "B"])]);
        let store = MemoryStore::new();
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        let report = sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        assert_eq!(report.outcome, RunOutcome::Completed);
        assert_eq!(report.final_offset, 2);
        assert_eq!(reader.offsets(), [0, 2]);
        assert_eq!(store.rows().len(), 2);
        assert!(progress.load().is_empty());

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[tokio::test(start_paused = true)]
    async fn resume_takes_furthest_of_store_and_progress() {
        let partition = key("2024-01-10");
        let rows: Vec<PriceRecord> = ["A", "B", "C"]
            .iter()
            .map(|m| mandi_sync_source::normalize::normalize_record(raw(m, "10/01/2024")))
            .collect();
        let store = MemoryStore::with_rows(rows);
        let reader = ScriptedReader::new(vec![]);
        let progress = scratch_progress("resume");

        let mut config = quiet_config();
        let state: ProgressState = [(partition, 5)].into_iter().collect();
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };
        assert_eq!(resolve_start_offset(&ctx, partition, &state).await.unwrap(), 5);

        let behind: ProgressState = [(partition, 1)].into_iter().collect();
        assert_eq!(resolve_start_offset(&ctx, partition, &behind).await.unwrap(), 3);
        assert_eq!(
            resolve_start_offset(&ctx, partition, &ProgressState::new())
                .await
                .unwrap(),
            3
        );

        config.resume_from_store = false;
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };
        assert_eq!(resolve_start_offset(&ctx, partition, &behind).await.unwrap(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn run_prunes_oldest_partition_first() {
        let old: Vec<PriceRecord> = ["A", "B"]
            .iter()
            .map(|m| mandi_sync_source::normalize::normalize_record(raw(m, "08/01/2024")))
            .collect();
        let store = MemoryStore::with_rows(old);
        let config = RunConfig {
            max_total_rows: 2,
            max_empty_page_retries: 1,
            ..quiet_config()
        };
        let reader = ScriptedReader::new(vec![page(&["C"])]);
        let progress = scratch_progress("prune");
        let ctx = SyncContext {
            config: &config,
            reader: &reader,
            store: &store,
            progress: &progress,
        };

        sync_partition(&ctx, key("2024-01-10")).await.unwrap();

        let partitions: Vec<String> = store.partitions().iter().map(ToString::to_string).collect();
        assert_eq!(partitions, ["2024-01-10"]);
    }

    #[test]
    fn html_previews_are_not_logged() {
        assert_eq!(loggable_preview("<HTML><body>502</body></html>"), None);
        assert_eq!(loggable_preview("   "), None);
        assert_eq!(loggable_preview("rate limited"), Some("rate limited"));

        let long = "x".repeat(2_000);
        assert_eq!(loggable_preview(&long).map(str::len), Some(LOG_PREVIEW_LEN));
    }

    #[test]
    fn only_fatal_fetch_errors_are_fatal() {
        let fatal = PageError::from(FetchError::Fatal {
            status: 403,
            message: "forbidden".to_string(),
        });
        let write = PageError::from(DbError::Rejected {
            status: 409,
            message: "conflict".to_string(),
        });
        assert_eq!(fatal.fatal_status(), Some(403));
        assert!(!write.is_fatal());
    }
}
