//! Tests for WAL Writer
//!
//! These tests verify:
//! - Writing entries to WAL
//! - LSN generation and sequencing
//! - Sync strategies (EveryWrite, EveryNEntries)
//! - Truncation
//! - Integration with reader

use std::path::PathBuf;

use tempfile::TempDir;
use vlogkv::config::WalSyncStrategy;
use vlogkv::wal::{Operation, WalReader, WalWriter};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn put(key: &str, value: &str) -> Operation {
    Operation::Put {
        key: key.as_bytes().to_vec(),
        value: value.as_bytes().to_vec(),
    }
}

fn read_entries(path: &PathBuf) -> Vec<(u64, Operation)> {
    WalReader::open(path, true)
        .unwrap()
        .entries()
        .map(|e| {
            let e = e.unwrap();
            (e.lsn, e.operation)
        })
        .collect()
}

// =============================================================================
// Basic Writing Tests
// =============================================================================

#[test]
fn test_write_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    let lsn = writer.append(put("key1", "value1")).unwrap();

    assert_eq!(lsn, 1);
    assert_eq!(writer.current_lsn(), 1);
    assert!(writer.size() > 0);
}

#[test]
fn test_lsn_sequential() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    for expected in 1..=10 {
        let lsn = writer.append(put("k", "v")).unwrap();
        assert_eq!(lsn, expected);
    }
}

#[test]
fn test_open_at_continues_lsn() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open_at(&wal_path, WalSyncStrategy::EveryWrite, 42).unwrap();
    assert_eq!(writer.append(put("a", "1")).unwrap(), 42);
}

#[test]
fn test_open_discards_previous_content() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("old", "1")).unwrap();
    }

    let writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    assert_eq!(writer.size(), 0);
    assert!(read_entries(&wal_path).is_empty());
}

// =============================================================================
// Reader Integration Tests
// =============================================================================

#[test]
fn test_written_entries_read_back() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("a", "1")).unwrap();
        writer.append(put("b", "2")).unwrap();
        writer.append(Operation::Delete { key: b"a".to_vec() }).unwrap();
    }

    let entries = read_entries(&wal_path);
    assert_eq!(
        entries,
        vec![
            (1, put("a", "1")),
            (2, put("b", "2")),
            (3, Operation::Delete { key: b"a".to_vec() }),
        ]
    );
}

#[test]
fn test_entry_larger_than_block() {
    let (_temp, wal_path) = setup_temp_wal();
    let big = "v".repeat(100 * 1024);

    {
        let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
        writer.append(put("big", &big)).unwrap();
        writer.append(put("small", "s")).unwrap();
    }

    let entries = read_entries(&wal_path);
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].1, put("big", &big));
}

// =============================================================================
// Sync Strategy Tests
// =============================================================================

#[test]
fn test_every_n_entries_then_sync() {
    let (_temp, wal_path) = setup_temp_wal();

    {
        let mut writer =
            WalWriter::open(&wal_path, WalSyncStrategy::EveryNEntries { count: 3 }).unwrap();
        for i in 0..5 {
            writer.append(put(&format!("k{}", i), "v")).unwrap();
        }
        writer.sync().unwrap();
    }

    assert_eq!(read_entries(&wal_path).len(), 5);
}

// =============================================================================
// Truncation Tests
// =============================================================================

#[test]
fn test_truncate() {
    let (_temp, wal_path) = setup_temp_wal();

    let mut writer = WalWriter::open(&wal_path, WalSyncStrategy::EveryWrite).unwrap();
    writer.append(put("a", "1")).unwrap();
    writer.append(put("b", "2")).unwrap();

    writer.truncate().unwrap();
    assert_eq!(writer.size(), 0);
    assert!(read_entries(&wal_path).is_empty());

    // LSNs keep going
    assert_eq!(writer.append(put("c", "3")).unwrap(), 3);
    assert_eq!(read_entries(&wal_path), vec![(3, put("c", "3"))]);
}
