// Time types used across the ledger
//
// Chain time only ever comes from block timestamps. The wall clock helpers
// below are for logging and for the daemon binary picking a genesis time,
// never for anything that decides the outcome of a block.

use std::time::{SystemTime, UNIX_EPOCH};

// Seconds timestamps used to determine it using its type
pub type TimestampSeconds = u64;

// Duration expressed in seconds
pub type DurationSeconds = u64;

pub const SECONDS_PER_MINUTE: DurationSeconds = 60;
pub const SECONDS_PER_HOUR: DurationSeconds = 60 * SECONDS_PER_MINUTE;
pub const SECONDS_PER_DAY: DurationSeconds = 24 * SECONDS_PER_HOUR;
pub const SECONDS_PER_WEEK: DurationSeconds = 7 * SECONDS_PER_DAY;
pub const SECONDS_PER_YEAR: DurationSeconds = 365 * SECONDS_PER_DAY;

// Sentinel for "never", used by cashout and unstake schedules
pub const TIME_MAX: TimestampSeconds = TimestampSeconds::MAX;

// Return the wall clock in seconds, zero if the clock is before the epoch
pub fn get_current_time_in_seconds() -> TimestampSeconds {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

// Human readable UTC representation of a chain timestamp
pub fn format_timestamp(timestamp: TimestampSeconds) -> String {
    if timestamp == TIME_MAX {
        return "never".to_string();
    }

    i64::try_from(timestamp)
        .ok()
        .and_then(|secs| chrono::DateTime::from_timestamp(secs, 0))
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_timestamp() {
        assert_eq!(format_timestamp(0), "1970-01-01T00:00:00");
        assert_eq!(format_timestamp(TIME_MAX), "never");
    }
}
