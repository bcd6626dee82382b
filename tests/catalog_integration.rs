//! Integration tests for the stat catalog
//!
//! These tests drive complete refresh → mutate → persist cycles against the
//! in-memory coordination store:
//! - Registering simple and compound expressions
//! - Exact-match updates and wildcard-derived creation
//! - All-or-nothing handling of failed merges
//! - Persistence outcomes and record layout

use std::sync::Arc;

use kuba_stats::catalog::{PERSISTENT_STATS_KEY, TIMESTAMP_FIELD, VALUE_FIELD};
use kuba_stats::store::Record;
use kuba_stats::{CoordinationStore, Error, InMemoryStore, StatCatalog, StatFields};

// ============================================================================
// Helper Functions
// ============================================================================

fn report(value: &str, timestamp: &str) -> StatFields {
    StatFields::from([
        (VALUE_FIELD.to_string(), value.to_string()),
        (TIMESTAMP_FIELD.to_string(), timestamp.to_string()),
    ])
}

fn setup() -> (Arc<InMemoryStore>, StatCatalog) {
    let store = Arc::new(InMemoryStore::new());
    let catalog = StatCatalog::new(store.clone());
    (store, catalog)
}

fn persisted_entry(store: &InMemoryStore, key: &str) -> Option<StatFields> {
    store
        .snapshot(PERSISTENT_STATS_KEY)
        .and_then(|record| record.map_fields.get(key).cloned())
}

// ============================================================================
// add_stat
// ============================================================================

#[test]
fn test_add_then_refresh_from_second_instance() {
    let (store, mut catalog) = setup();
    catalog.add_stat("metric.count(window=5)").unwrap();

    let mut other = StatCatalog::new(store.clone());
    other.refresh().unwrap();
    assert_eq!(other.stat_names(), vec!["metric.count(window=5)"]);
    assert_eq!(
        other.get("metric.count(window=5)"),
        Some(&StatCatalog::empty_stat())
    );
}

#[test]
fn test_add_is_idempotent_but_still_persists() {
    let (store, mut catalog) = setup();
    catalog.add_stat("a.b.window(3)").unwrap();
    catalog.apply_stat("a.b", &report("1", "1")).unwrap();
    let before = store.snapshot(PERSISTENT_STATS_KEY).unwrap();
    let writes = store.write_count();

    let cycle = catalog.add_stat("a.b.window(3)").unwrap();

    assert!(cycle.created.is_empty());
    assert_eq!(cycle.skipped, vec!["a.b.window(3)"]);
    assert!(cycle.persisted);
    assert_eq!(store.write_count(), writes + 1);
    assert_eq!(store.snapshot(PERSISTENT_STATS_KEY).unwrap(), before);
}

#[test]
fn test_add_compound_expression_partially_present() {
    let (_, mut catalog) = setup();
    catalog.add_stat("a.b.window(3)").unwrap();

    let cycle = catalog.add_stat("a.b.window(3),accumulate()").unwrap();
    assert_eq!(cycle.created, vec!["a.b.accumulate()"]);
    assert_eq!(cycle.skipped, vec!["a.b.window(3)"]);
    assert_eq!(catalog.len(), 2);
}

#[test]
fn test_add_preserves_record_id_and_simple_fields() {
    let (store, mut catalog) = setup();
    let mut record = Record::new("ClusterStatsRecord");
    record
        .simple_fields
        .insert("owner".to_string(), "controller-1".to_string());
    store.set(PERSISTENT_STATS_KEY, &record).unwrap();

    catalog.add_stat("a.accumulate()").unwrap();

    let stored = store.snapshot(PERSISTENT_STATS_KEY).unwrap();
    assert_eq!(stored.id, "ClusterStatsRecord");
    assert_eq!(stored.simple_fields.get("owner").map(String::as_str), Some("controller-1"));
    assert!(stored.map_fields.contains_key("a.accumulate()"));
}

#[test]
fn test_add_rejected_write_reports_not_persisted() {
    let (store, mut catalog) = setup();
    store.set_reject_writes(true);

    let cycle = catalog.add_stat("a.accumulate()").unwrap();
    assert!(!cycle.persisted);
    assert!(store.snapshot(PERSISTENT_STATS_KEY).is_none());
}

// ============================================================================
// apply_stat
// ============================================================================

#[test]
fn test_exact_match_update() {
    let (store, mut catalog) = setup();
    catalog.add_stat("cpu.load.accumulate()").unwrap();

    catalog.apply_stat("cpu.load", &report("2", "100")).unwrap();
    let cycle = catalog.apply_stat("cpu.load", &report("3", "101")).unwrap();

    assert_eq!(cycle.updated, vec!["cpu.load.accumulate()"]);
    assert!(cycle.persisted);
    assert_eq!(
        persisted_entry(&store, "cpu.load.accumulate()"),
        Some(report("5", "101"))
    );
}

#[test]
fn test_stale_report_keeps_entry() {
    let (_, mut catalog) = setup();
    catalog.add_stat("cpu.load.window(3)").unwrap();
    catalog.apply_stat("cpu.load", &report("2", "100")).unwrap();

    let cycle = catalog.apply_stat("cpu.load", &report("9", "50")).unwrap();
    assert!(cycle.updated.is_empty());
    assert_eq!(catalog.get("cpu.load.window(3)"), Some(&report("2", "100")));
}

#[test]
fn test_nanosecond_timestamps_keep_newer_samples() {
    let (store, mut catalog) = setup();
    catalog.add_stat("disk.io.window(5)").unwrap();

    catalog
        .apply_stat("disk.io", &report("1", "1700000000000000001"))
        .unwrap();
    let cycle = catalog
        .apply_stat("disk.io", &report("2", "1700000000000000100"))
        .unwrap();

    assert_eq!(cycle.updated, vec!["disk.io.window(5)"]);
    assert_eq!(
        persisted_entry(&store, "disk.io.window(5)"),
        Some(report("1,2", "1700000000000000001,1700000000000000100"))
    );
}

#[test]
fn test_accumulate_overflow_keeps_entry_mergeable() {
    let (store, mut catalog) = setup();
    catalog.add_stat("a.b.accumulate()").unwrap();
    catalog.apply_stat("a.b", &report("1e308", "1")).unwrap();
    let before = persisted_entry(&store, "a.b.accumulate()");

    let err = catalog.apply_stat("a.b", &report("1e308", "2")).unwrap_err();
    assert!(matches!(err, Error::Merge(_)));
    assert_eq!(persisted_entry(&store, "a.b.accumulate()"), before);

    let cycle = catalog.apply_stat("a.b", &report("1", "3")).unwrap();
    assert_eq!(cycle.updated, vec!["a.b.accumulate()"]);
    let entry = persisted_entry(&store, "a.b.accumulate()").unwrap();
    assert_eq!(entry.get(TIMESTAMP_FIELD).map(String::as_str), Some("3"));
}

#[test]
fn test_wildcard_creates_concrete_entry() {
    let (store, mut catalog) = setup();
    catalog.add_stat("db.*.latency.window(3)").unwrap();

    let cycle = catalog.apply_stat("db.p1.latency", &report("12", "1000")).unwrap();

    assert_eq!(cycle.created, vec!["db.p1.latency.window(3)"]);
    assert!(cycle.updated.is_empty());
    assert_eq!(
        persisted_entry(&store, "db.p1.latency.window(3)"),
        Some(report("12", "1000"))
    );
    // wildcard entry itself is never merged
    assert_eq!(
        catalog.get("db.*.latency.window(3)"),
        Some(&StatCatalog::empty_stat())
    );
}

#[test]
fn test_wildcard_then_exact_on_next_report() {
    let (_, mut catalog) = setup();
    catalog.add_stat("db.*.latency.window(3)").unwrap();
    catalog.apply_stat("db.p1.latency", &report("1", "1")).unwrap();

    let cycle = catalog.apply_stat("db.p1.latency", &report("2", "2")).unwrap();

    assert_eq!(cycle.updated, vec!["db.p1.latency.window(3)"]);
    assert!(cycle.created.is_empty());
    assert_eq!(catalog.get("db.p1.latency.window(3)"), Some(&report("1,2", "1,2")));
}

#[test]
fn test_two_wildcards_deriving_same_key_create_once() {
    let (_, mut catalog) = setup();
    catalog.add_stat("*.p1.latency.accumulate()").unwrap();
    catalog.add_stat("db.*.latency.accumulate()").unwrap();

    let cycle = catalog.apply_stat("db.p1.latency", &report("4", "10")).unwrap();

    assert_eq!(cycle.created, vec!["db.p1.latency.accumulate()"]);
    assert_eq!(catalog.get("db.p1.latency.accumulate()"), Some(&report("4", "10")));
}

#[test]
fn test_one_report_updates_and_creates_several_entries() {
    let (_, mut catalog) = setup();
    catalog.add_stat("db.p1.latency.window(2),accumulate()").unwrap();
    catalog.add_stat("db.*.latency.decay(0.5)").unwrap();

    let cycle = catalog.apply_stat("db.p1.latency", &report("8", "5")).unwrap();

    assert_eq!(
        cycle.updated,
        vec!["db.p1.latency.accumulate()", "db.p1.latency.window(2)"]
    );
    assert_eq!(cycle.created, vec!["db.p1.latency.decay(0.5)"]);
    assert_eq!(catalog.len(), 4);
}

#[test]
fn test_unmatched_report_changes_nothing() {
    let (_, mut catalog) = setup();
    catalog.add_stat("db.*.latency.window(3)").unwrap();

    let cycle = catalog.apply_stat("db.p1.errors", &report("1", "1")).unwrap();
    assert!(cycle.updated.is_empty());
    assert!(cycle.created.is_empty());
    assert_eq!(catalog.len(), 1);
}

#[test]
fn test_failed_merge_is_all_or_nothing() {
    let (store, mut catalog) = setup();
    catalog.add_stat("db.p1.latency.accumulate()").unwrap();
    catalog.add_stat("db.*.latency.window(size=0)").unwrap();
    let before = store.snapshot(PERSISTENT_STATS_KEY).unwrap();
    let writes = store.write_count();

    let err = catalog
        .apply_stat("db.p2.latency", &report("1", "1"))
        .unwrap_err();
    assert!(matches!(err, Error::Merge(_)));

    let err = catalog
        .apply_stat("db.p1.latency", &report("1", "1"))
        .unwrap_err();
    assert!(matches!(err, Error::Merge(_)));

    assert_eq!(store.write_count(), writes);
    assert_eq!(store.snapshot(PERSISTENT_STATS_KEY).unwrap(), before);
    assert!(!catalog.contains("db.p2.latency.window(size=0)"));
}

#[test]
fn test_malformed_report_rejected() {
    let (_, mut catalog) = setup();
    catalog.add_stat("db.*.latency.window(3)").unwrap();

    assert!(matches!(
        catalog.apply_stat("db.*.latency", &report("1", "1")),
        Err(Error::Parse(_))
    ));
    assert!(catalog.apply_stat("", &report("1", "1")).is_err());
}

#[test]
fn test_malformed_value_tuple_rejected() {
    let (store, mut catalog) = setup();
    catalog.add_stat("cpu.load.window(3)").unwrap();
    let writes = store.write_count();

    let err = catalog
        .apply_stat("cpu.load", &report("1,abc", "1,2"))
        .unwrap_err();
    assert!(matches!(err, Error::Format(_)));
    assert_eq!(store.write_count(), writes);
}

#[test]
fn test_apply_sees_writes_from_other_instance() {
    let (store, mut writer) = setup();
    let mut reader = StatCatalog::new(store.clone());

    writer.add_stat("cpu.load.accumulate()").unwrap();
    let cycle = reader.apply_stat("cpu.load", &report("7", "1")).unwrap();

    assert_eq!(cycle.updated, vec!["cpu.load.accumulate()"]);
    writer.refresh().unwrap();
    assert_eq!(writer.get("cpu.load.accumulate()"), Some(&report("7", "1")));
}
