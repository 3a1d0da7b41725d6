//! Tests for the lazy value iterator
//!
//! These tests verify:
//! - Values are read from the log only when asked for, once per position
//! - Moving the iterator drops the cached value
//! - Resolution failures surface through value() and status()

use std::fs::OpenOptions;
use std::io::{Seek, SeekFrom, Write};

use tempfile::TempDir;

use crate::common::{collect, open_column, pairs};

#[test]
fn test_iterates_in_key_order() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("b", "vb"), ("d", "vd")])).unwrap();
    column.write_table(pairs(&[("a", "va"), ("c", "vc")])).unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    assert_eq!(
        collect(&mut iter),
        pairs(&[("a", "va"), ("b", "vb"), ("c", "vc"), ("d", "vd")])
    );
}

#[test]
fn test_empty_column() {
    let temp = TempDir::new().unwrap();
    let column = open_column(temp.path());

    let mut iter = column.new_internal_iterator().unwrap();
    iter.seek_to_first();
    assert!(!iter.valid());
    assert!(iter.value().is_err());
    assert!(iter.status().is_ok());
}

#[test]
fn test_unpositioned_value_is_invalid_state() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va")])).unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    assert!(!iter.valid());
    assert!(iter.value().unwrap_err().to_string().contains("not positioned"));
}

// =============================================================================
// Laziness Tests
// =============================================================================

#[test]
fn test_keys_without_reads() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column
        .write_table(pairs(&[("a", "va"), ("b", "vb"), ("c", "vc")]))
        .unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    let mut keys = Vec::new();
    iter.seek_to_first();
    while iter.valid() {
        keys.push(iter.key().to_vec());
        iter.next();
    }

    assert_eq!(keys, vec![b"a".to_vec(), b"b".to_vec(), b"c".to_vec()]);
    assert_eq!(column.value_log().reads(), 0);
}

#[test]
fn test_value_read_once_per_position() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va"), ("b", "vb")])).unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    iter.seek_to_first();
    assert!(!iter.is_cached());

    assert_eq!(iter.value().unwrap(), b"va");
    assert!(iter.is_cached());
    assert_eq!(iter.value().unwrap(), b"va");
    assert_eq!(iter.value().unwrap(), b"va");
    assert_eq!(column.value_log().reads(), 1);
}

#[test]
fn test_moving_drops_cached_value() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column
        .write_table(pairs(&[("a", "va"), ("b", "vb"), ("c", "vc")]))
        .unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    iter.seek_to_first();
    assert_eq!(iter.value().unwrap(), b"va");

    iter.next();
    assert!(!iter.is_cached());
    assert_eq!(iter.key(), b"b");
    assert_eq!(iter.value().unwrap(), b"vb");

    iter.prev();
    assert!(!iter.is_cached());
    assert_eq!(iter.value().unwrap(), b"va");

    iter.seek(b"bb");
    assert!(!iter.is_cached());
    assert_eq!(iter.key(), b"c");
    assert_eq!(iter.value().unwrap(), b"vc");

    iter.seek_to_last();
    assert!(!iter.is_cached());
    assert_eq!(iter.value().unwrap(), b"vc");

    // va, vb, va again after prev, vc after seek, vc again after seek_to_last
    assert_eq!(column.value_log().reads(), 5);
}

#[test]
fn test_backward_iteration() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column
        .write_table(pairs(&[("a", "va"), ("b", "vb"), ("c", "vc")]))
        .unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    let mut seen = Vec::new();
    iter.seek_to_last();
    while iter.valid() {
        seen.push(iter.value().unwrap().to_vec());
        iter.prev();
    }
    assert_eq!(seen, vec![b"vc".to_vec(), b"vb".to_vec(), b"va".to_vec()]);
}

#[test]
fn test_snapshot_ignores_later_writes() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va")])).unwrap();

    let mut iter = column.new_internal_iterator().unwrap();
    column.write_table(pairs(&[("b", "vb")])).unwrap();
    column.delete(b"a").unwrap();

    assert_eq!(collect(&mut iter), pairs(&[("a", "va")]));
}

// =============================================================================
// Error Tests
// =============================================================================

#[test]
fn test_corrupt_record_surfaces_and_clears() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column
        .write_table(pairs(&[("a", "va"), ("b", "vb"), ("c", "vc")]))
        .unwrap();

    // "a" takes 7 header bytes plus a 5-byte payload, so "b" starts at 12
    let path = column.value_log().file_path(1);
    let mut file = OpenOptions::new().write(true).open(&path).unwrap();
    file.seek(SeekFrom::Start(12 + 7 + 3)).unwrap();
    file.write_all(b"X").unwrap();
    file.sync_all().unwrap();
    drop(file);

    let mut iter = column.new_internal_iterator().unwrap();
    iter.seek(b"b");
    assert_eq!(iter.key(), b"b");

    let err = iter.value().unwrap_err();
    assert!(err.is_corruption());
    assert!(!iter.is_cached());
    assert!(iter.status().unwrap_err().is_corruption());

    iter.next();
    assert!(iter.status().is_ok());
    assert_eq!(iter.value().unwrap(), b"vc");

    iter.seek_to_first();
    assert_eq!(iter.value().unwrap(), b"va");
}
