#![allow(dead_code)]

use chrono::{Duration, TimeZone, Utc};
use fitquest_core::types::Timestamp;
use tracing_subscriber::EnvFilter;

/// Install a test-writer subscriber once per test binary.
///
/// Honours `RUST_LOG`; defaults to debug output for this crate.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "fitquest_core=debug".into()),
        )
        .with_test_writer()
        .try_init();
}

/// Noon UTC on the given day offset from 2024-01-01.
pub fn day(offset: i64) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap() + Duration::days(offset)
}

/// `day(offset)` shifted to the given hour.
pub fn day_at(offset: i64, hour: u32) -> Timestamp {
    Utc.with_ymd_and_hms(2024, 1, 1, hour, 0, 0).unwrap() + Duration::days(offset)
}
