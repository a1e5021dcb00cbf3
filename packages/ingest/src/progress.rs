//! Local progress file.
//!
//! Records the next offset to request for the most recent partitions as a
//! small JSON object (`{"2024-01-10": 400}`). The store remains the source
//! of truth for resuming; this file only lets a run skip ahead when the
//! store count lags (e.g. rows that dedupe collapsed). Every failure here
//! is logged and swallowed.

use std::collections::BTreeMap;
use std::io::Write as _;
use std::path::{Path, PathBuf};

use mandi_sync_source_models::PartitionKey;

use crate::paths;

/// Next offset per partition.
pub type ProgressState = BTreeMap<PartitionKey, u64>;

/// Returns the `max_partitions` most recent entries of `state`.
#[must_use]
pub fn trim(state: &ProgressState, max_partitions: usize) -> ProgressState {
    state
        .iter()
        .rev()
        .take(max_partitions)
        .map(|(partition, offset)| (*partition, *offset))
        .collect()
}

/// The on-disk progress file.
#[derive(Debug, Clone)]
pub struct ProgressFile {
    path: PathBuf,
    max_partitions: usize,
}

impl ProgressFile {
    /// Creates a handle for the file at `path`, keeping at most
    /// `max_partitions` entries on save.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, max_partitions: usize) -> Self {
        Self {
            path: path.into(),
            max_partitions,
        }
    }

    /// Returns the file's location.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the persisted state. A missing or unreadable file yields an
    /// empty state.
    #[must_use]
    pub fn load(&self) -> ProgressState {
        let text = match std::fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::debug!("No progress file at {}", self.path.display());
                return ProgressState::new();
            }
            Err(e) => {
                log::warn!(
                    "Could not read progress file {}: {e}; starting empty",
                    self.path.display()
                );
                return ProgressState::new();
            }
        };

        serde_json::from_str(&text).unwrap_or_else(|e| {
            log::warn!(
                "Ignoring corrupt progress file {}: {e}",
                self.path.display()
            );
            ProgressState::new()
        })
    }

    /// Atomically replaces the file with the most recent entries of
    /// `state`. Failures are logged, not returned.
    pub fn save(&self, state: &ProgressState) {
        if let Err(e) = self.try_save(state) {
            log::warn!(
                "Could not save progress file {}: {e}",
                self.path.display()
            );
        }
    }

    fn try_save(&self, state: &ProgressState) -> std::io::Result<()> {
        if let Some(parent) = self.path.parent() {
            paths::ensure_dir(parent)?;
        }

        let trimmed = trim(state, self.max_partitions);
        let json = serde_json::to_vec(&trimmed)?;

        let tmp = paths::temp_path(&self.path);
        let mut file = std::fs::File::create(&tmp)?;
        file.write_all(&json)?;
        file.sync_all()?;
        drop(file);

        std::fs::rename(&tmp, &self.path)
    }
}
