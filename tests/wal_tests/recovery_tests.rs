//! Tests for WAL Recovery
//!
//! These tests verify:
//! - Clean recovery of every entry
//! - Missing WAL recovers to nothing
//! - Corrupted records are skipped and counted
//! - A torn tail is tolerated

use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use tempfile::TempDir;
use vlogkv::config::WalSyncStrategy;
use vlogkv::record_log::{BLOCK_SIZE, HEADER_SIZE};
use vlogkv::wal::{Operation, WalRecovery, WalWriter};

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("wal.log");
    (temp_dir, wal_path)
}

fn write_puts(path: &PathBuf, count: usize, value_len: usize) {
    let mut writer = WalWriter::open(path, WalSyncStrategy::EveryWrite).unwrap();
    for i in 0..count {
        writer
            .append(Operation::Put {
                key: format!("key{:03}", i).into_bytes(),
                value: vec![b'v'; value_len],
            })
            .unwrap();
    }
}

// =============================================================================
// Clean Recovery Tests
// =============================================================================

#[test]
fn test_recover_missing_file() {
    let (_temp, wal_path) = setup_temp_wal();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert!(entries.is_empty());
    assert_eq!(result.entries_recovered, 0);
    assert_eq!(result.last_lsn, 0);
}

#[test]
fn test_recover_all_entries() {
    let (_temp, wal_path) = setup_temp_wal();
    write_puts(&wal_path, 20, 10);

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 20);
    assert_eq!(result.entries_recovered, 20);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 20);
    assert_eq!(entries[5].operation.key(), b"key005");
}

#[test]
fn test_verify_matches_recover() {
    let (_temp, wal_path) = setup_temp_wal();
    write_puts(&wal_path, 5, 10);

    let verified = WalRecovery::verify(&wal_path).unwrap();
    let (_, recovered) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(verified, recovered);
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_corrupted_block_skipped() {
    let (_temp, wal_path) = setup_temp_wal();
    // Entries big enough that the first one owns block 0 alone
    write_puts(&wal_path, 3, BLOCK_SIZE - 200);

    let mut bytes = fs::read(&wal_path).unwrap();
    bytes[HEADER_SIZE + 50] ^= 0xFF;
    fs::write(&wal_path, &bytes).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert!(result.entries_corrupted >= 1);
    assert!(!entries.is_empty());
    assert!(entries.iter().all(|e| e.lsn > 1));
    assert_eq!(result.last_lsn, 3);
}

#[test]
fn test_torn_tail_tolerated() {
    let (_temp, wal_path) = setup_temp_wal();
    write_puts(&wal_path, 10, 10);

    let len = fs::metadata(&wal_path).unwrap().len();
    let file = OpenOptions::new().write(true).open(&wal_path).unwrap();
    file.set_len(len - 5).unwrap();

    let (entries, result) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 9);
    assert_eq!(result.entries_corrupted, 0);
    assert_eq!(result.last_lsn, 9);
}

#[test]
fn test_garbage_appended() {
    let (_temp, wal_path) = setup_temp_wal();
    write_puts(&wal_path, 3, 10);

    let mut file = OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0x11; 3]).unwrap();

    let (entries, _) = WalRecovery::recover(&wal_path).unwrap();
    assert_eq!(entries.len(), 3);
}
