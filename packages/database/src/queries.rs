//! Write sink and retention policy built on [`PriceStore`].

use std::collections::BTreeMap;

use mandi_sync_database_models::{PruneResult, WriteMode};
use mandi_sync_source_models::{PriceRecord, RecordIdentity};

use crate::{DbError, PriceStore};

/// Collapses rows sharing an identity, keeping the last occurrence of each.
///
/// A single upsert statement may not touch the same conflict target
/// twice, so duplicates must be removed before the batch is sent.
#[must_use]
pub fn dedupe_rows(rows: &[PriceRecord]) -> Vec<&PriceRecord> {
    let mut last_seen: BTreeMap<RecordIdentity, usize> = BTreeMap::new();
    for (i, row) in rows.iter().enumerate() {
        last_seen.insert(row.identity(), i);
    }

    let deduped: Vec<&PriceRecord> = rows
        .iter()
        .enumerate()
        .filter(|(i, row)| last_seen.get(&row.identity()) == Some(i))
        .map(|(_, row)| row)
        .collect();

    if deduped.len() < rows.len() {
        log::info!(
            "Deduplicated batch: {} -> {} rows ({} duplicates removed)",
            rows.len(),
            deduped.len(),
            rows.len() - deduped.len(),
        );
    }

    deduped
}

/// Deduplicates a page and writes it to the store.
///
/// Returns the number of distinct rows written. An empty page is a no-op
/// returning 0.
///
/// # Errors
///
/// Returns [`DbError`] if the store rejects the batch.
pub async fn dedupe_and_write(
    store: &dyn PriceStore,
    rows: &[PriceRecord],
    mode: WriteMode,
) -> Result<u64, DbError> {
    let deduped: Vec<PriceRecord> = dedupe_rows(rows).into_iter().cloned().collect();
    if deduped.is_empty() {
        return Ok(0);
    }

    match mode {
        WriteMode::Upsert => store.upsert(&deduped).await?,
        WriteMode::InsertOnly => store.insert(&deduped).await?,
    }

    Ok(deduped.len() as u64)
}

/// Drops the oldest partition when the store holds `max_total_rows` or
/// more rows.
///
/// Only one partition is evicted per call, so a store far over its cap
/// shrinks by one day per run.
///
/// # Errors
///
/// Returns [`DbError`] if any count, lookup, or delete fails.
pub async fn prune_if_needed(
    store: &dyn PriceStore,
    max_total_rows: u64,
) -> Result<PruneResult, DbError> {
    let total = store.total_count().await?;
    if total < max_total_rows {
        log::debug!("Store holds {total} rows (cap {max_total_rows}); nothing to prune");
        return Ok(PruneResult::Skipped { total });
    }

    let Some(partition) = store.earliest_partition().await? else {
        return Ok(PruneResult::Skipped { total });
    };

    let deleted = store.delete_partition(partition).await?;
    log::warn!(
        "Pruned {deleted} rows for earliest date {partition} (total {total} >= {max_total_rows})"
    );

    Ok(PruneResult::Pruned {
        partition,
        deleted,
        total_before: total,
    })
}
