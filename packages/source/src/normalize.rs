//! Cleaning of raw records and the per-page partition check.

use std::collections::BTreeSet;

use mandi_sync_source_models::{PARTITION_FIELD, PartitionKey, PriceRecord, RawRecord};

use crate::IntegrityError;
use crate::parsing::canonical_date;

/// Placeholder used in [`IntegrityError::found`] for records that carry no
/// partition value at all.
pub const MISSING_PARTITION: &str = "<missing>";

/// Cleans one raw record: trims every string value and rewrites the
/// partition field into canonical form.
#[must_use]
pub fn normalize_record(raw: RawRecord) -> PriceRecord {
    let fields = raw
        .into_iter()
        .map(|(key, value)| {
            let value = match value {
                serde_json::Value::String(s) if key == PARTITION_FIELD && !s.trim().is_empty() => {
                    serde_json::Value::String(canonical_date(&s))
                }
                serde_json::Value::String(s) => serde_json::Value::String(s.trim().to_string()),
                other => other,
            };
            (key, value)
        })
        .collect();

    PriceRecord::new(fields)
}

/// Cleans a page and verifies every record belongs to `expected`.
///
/// # Errors
///
/// Returns [`IntegrityError`] unless the set of distinct partition values
/// on the page is exactly `{expected}`. An empty page has no partition
/// values and is therefore rejected too.
pub fn normalize_page(
    records: Vec<RawRecord>,
    expected: PartitionKey,
) -> Result<Vec<PriceRecord>, IntegrityError> {
    let cleaned: Vec<PriceRecord> = records.into_iter().map(normalize_record).collect();

    let found: BTreeSet<String> = cleaned
        .iter()
        .map(|record| {
            record
                .get(PARTITION_FIELD)
                .map_or_else(|| MISSING_PARTITION.to_string(), partition_display)
        })
        .collect();

    let expected_str = expected.to_string();
    if found.len() != 1 || !found.contains(&expected_str) {
        return Err(IntegrityError { expected, found });
    }

    Ok(cleaned)
}

fn partition_display(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Null => MISSING_PARTITION.to_string(),
        other => other.to_string(),
    }
}
