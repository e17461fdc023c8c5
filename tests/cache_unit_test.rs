//! Unit tests for cache module.
//!
//! Run with: cargo test --test cache_unit_test

use chrono::{TimeZone, Utc};
use solar_watch::routes::cache;

#[test]
fn cache_key_builds_correctly() {
    assert_eq!(cache::cache_key("readings", &[]), "readings");
    assert_eq!(
        cache::cache_key("readings", &["2", "50", "power", "desc"]),
        "readings:2:50:power:desc"
    );

    // Empty components preserved (ensures query uniqueness)
    assert_ne!(
        cache::cache_key("readings", &["1", "", "time"]),
        cache::cache_key("readings", &["1", "time"])
    );
}

#[test]
fn staleness_follows_newest_reading() {
    let cached = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    let newer = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 20).unwrap();

    assert!(cache::is_stale(Some(cached), Some(newer)));
    assert!(!cache::is_stale(Some(cached), Some(cached)));
    // Cached while the table was empty, data has arrived since
    assert!(cache::is_stale(None, Some(newer)));
    assert!(!cache::is_stale(None, None));
}
