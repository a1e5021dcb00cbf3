//! Date parsing for upstream record fields.

use chrono::NaiveDate;
use mandi_sync_source_models::{API_DATE_FORMAT, CANONICAL_DATE_FORMAT};

/// Formats the upstream API has been seen to use for dates, tried in order.
const ACCEPTED_DATE_FORMATS: [&str; 2] = [API_DATE_FORMAT, CANONICAL_DATE_FORMAT];

/// Parses a date in any accepted upstream format (`DD/MM/YYYY` or
/// `YYYY-MM-DD`).
#[must_use]
pub fn parse_record_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    ACCEPTED_DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(s, format).ok())
}

/// Rewrites a record date into canonical `YYYY-MM-DD` form.
///
/// Values in no accepted format are returned trimmed but otherwise
/// unchanged, so the partition check can report them.
#[must_use]
pub fn canonical_date(s: &str) -> String {
    parse_record_date(s).map_or_else(
        || s.trim().to_string(),
        |date| date.format(CANONICAL_DATE_FORMAT).to_string(),
    )
}
