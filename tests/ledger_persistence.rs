// tests/ledger_persistence.rs
// File lifecycle for the processed-id ledger: reloads see what was
// flushed, and damaged files degrade to an empty ledger instead of
// aborting the daemon.

use tempfile::tempdir;
use timeline_relay::Ledger;

#[test]
fn flush_then_reload_roundtrip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("processed.json");

    let mut ledger = Ledger::load(&path);
    assert!(ledger.is_empty());
    assert_eq!(ledger.path(), path.as_path());
    assert!(ledger.add("1897234"));
    assert!(ledger.add("1897235"));
    assert!(!ledger.add("1897234"), "second add of same id reports false");
    ledger.flush().unwrap();

    let reloaded = Ledger::load(&path);
    assert_eq!(reloaded.len(), 2);
    assert!(reloaded.contains("1897234"));
    assert!(reloaded.contains("1897235"));
    assert!(!reloaded.contains("1897236"));
}

#[test]
fn missing_file_loads_empty() {
    let dir = tempdir().unwrap();
    let ledger = Ledger::load(dir.path().join("never-written.json"));
    assert!(ledger.is_empty());
}

#[test]
fn empty_and_malformed_files_load_empty() {
    let dir = tempdir().unwrap();

    let empty = dir.path().join("empty.json");
    std::fs::write(&empty, "").unwrap();
    assert!(Ledger::load(&empty).is_empty());

    let garbage = dir.path().join("garbage.json");
    std::fs::write(&garbage, "{not json at all").unwrap();
    assert!(Ledger::load(&garbage).is_empty());
}

#[test]
fn numeric_ids_from_older_files_are_coerced() {
    // Earlier deployments serialized ids as JSON numbers.
    let dir = tempdir().unwrap();
    let path = dir.path().join("legacy.json");
    std::fs::write(&path, r#"[1897234, "1897235", null]"#).unwrap();

    let ledger = Ledger::load(&path);
    assert_eq!(ledger.len(), 2);
    assert!(ledger.contains("1897234"));
    assert!(ledger.contains("1897235"));
}

#[test]
fn flush_is_idempotent_and_stable() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("stable.json");

    let mut ledger = Ledger::load(&path);
    ledger.add("b");
    ledger.add("a");
    ledger.flush().unwrap();
    let first = std::fs::read_to_string(&path).unwrap();
    ledger.flush().unwrap();
    let second = std::fs::read_to_string(&path).unwrap();

    assert_eq!(first, second);
    // Set semantics keep the file sorted regardless of insert order.
    assert_eq!(first, r#"["a","b"]"#);
}
