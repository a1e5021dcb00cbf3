//! Target partition resolution.
//!
//! The upstream dataset publishes a day's prices with a lag, so runs
//! before the rollover hour (local time) keep working on yesterday.

use chrono::{DateTime, TimeZone, Timelike, Utc};
use chrono_tz::Tz;
use mandi_sync_source_models::PartitionKey;

/// Returns the partition a run at `now` should target.
///
/// Yesterday if `now` is before `rollover_hour` in its own timezone,
/// today otherwise.
#[must_use]
pub fn target_partition<T: TimeZone>(now: &DateTime<T>, rollover_hour: u32) -> PartitionKey {
    let today = now.date_naive();
    if now.hour() < rollover_hour {
        PartitionKey::new(today.pred_opt().unwrap_or(today))
    } else {
        PartitionKey::new(today)
    }
}

/// Returns the partition for the current wall-clock time in `tz`.
#[must_use]
pub fn current_partition(tz: Tz, rollover_hour: u32) -> PartitionKey {
    target_partition(&Utc::now().with_timezone(&tz), rollover_hour)
}

#[cfg(test)]
mod tests {
    use chrono_tz::Asia::Kolkata;

    use super::*;

    fn ist(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Tz> {
        Kolkata.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    #[test]
    fn before_rollover_targets_yesterday() {
        let key = target_partition(&ist(2024, 1, 10, 8, 59, 59), 9);
        assert_eq!(key.to_string(), "2024-01-09");
    }

    #[test]
    fn at_rollover_targets_today() {
        let key = target_partition(&ist(2024, 1, 10, 9, 0, 0), 9);
        assert_eq!(key.to_string(), "2024-01-10");
    }

    #[test]
    fn midnight_crosses_month_boundary() {
        let key = target_partition(&ist(2024, 3, 1, 0, 0, 0), 9);
        assert_eq!(key.to_string(), "2024-02-29");
    }

    #[test]
    fn zero_rollover_always_targets_today() {
        let key = target_partition(&ist(2024, 1, 10, 0, 0, 0), 0);
        assert_eq!(key.to_string(), "2024-01-10");
    }

    #[test]
    fn evaluates_hour_in_local_time() {
        // 02:00 UTC is 07:30 IST: still before the 09:00 rollover.
        let utc = Utc.with_ymd_and_hms(2024, 1, 10, 2, 0, 0).unwrap();
        let key = target_partition(&utc.with_timezone(&Kolkata), 9);
        assert_eq!(key.to_string(), "2024-01-09");

        assert_eq!(target_partition(&utc, 0).to_string(), "2024-01-10");
    }
}
