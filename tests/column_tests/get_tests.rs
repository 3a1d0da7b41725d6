//! Tests for VlogColumn::get and delete

use tempfile::TempDir;
use vlogkv::index::BaseEngine;
use vlogkv::{ColumnState, Config, Pointer, VlogColumn};

use crate::common::{open_column, pairs, test_config};

#[test]
fn test_get_missing_key() {
    let temp = TempDir::new().unwrap();
    let column = open_column(temp.path());

    assert_eq!(column.get(b"nothing").unwrap(), None);
    assert_eq!(column.value_log().reads(), 0);
}

#[test]
fn test_get_reads_log_once() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va")])).unwrap();

    column.get(b"a").unwrap();
    assert_eq!(column.value_log().reads(), 1);
}

#[test]
fn test_delete_hides_key() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va"), ("b", "vb")])).unwrap();

    column.delete(b"a").unwrap();

    assert_eq!(column.get(b"a").unwrap(), None);
    assert_eq!(column.get(b"b").unwrap(), Some(b"vb".to_vec()));
}

#[test]
fn test_rewrite_after_delete() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "v1")])).unwrap();
    column.delete(b"a").unwrap();
    column.write_table(pairs(&[("a", "v2")])).unwrap();

    assert_eq!(column.get(b"a").unwrap(), Some(b"v2".to_vec()));
}

// =============================================================================
// Corruption Tests
// =============================================================================

#[test]
fn test_pointer_to_other_key_is_corruption() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va")])).unwrap();

    column
        .base()
        .unwrap()
        .bulk_insert(vec![(b"b".to_vec(), Pointer::new(1, 0).to_bytes().to_vec())])
        .unwrap();

    let err = column.get(b"b").unwrap_err();
    assert!(err.is_corruption());
    assert!(err.to_string().contains("column test"));
    assert!(err.to_string().contains("belongs to key"));
}

#[test]
fn test_short_pointer_is_corruption() {
    let temp = TempDir::new().unwrap();
    let column = open_column(temp.path());

    column
        .base()
        .unwrap()
        .bulk_insert(vec![(b"k".to_vec(), b"0123456789".to_vec())])
        .unwrap();

    assert!(column.get(b"k").unwrap_err().is_corruption());
}

#[test]
fn test_pointer_to_missing_file_is_io() {
    let temp = TempDir::new().unwrap();
    let column = open_column(temp.path());

    column
        .base()
        .unwrap()
        .bulk_insert(vec![(b"k".to_vec(), Pointer::new(42, 0).to_bytes().to_vec())])
        .unwrap();

    assert!(column.get(b"k").unwrap_err().is_io());
}

// =============================================================================
// State Tests
// =============================================================================

#[test]
fn test_operations_before_recover() {
    let temp = TempDir::new().unwrap();
    let mut column: VlogColumn =
        VlogColumn::new("early", temp.path().join("column"), test_config(temp.path()));

    assert_eq!(column.state(), ColumnState::Uninitialized);
    assert!(column.base().is_none());
    assert!(column.get(b"a").unwrap_err().to_string().contains("Invalid state"));
    assert!(column.write_table(pairs(&[("a", "va")])).is_err());
    assert!(column.delete(b"a").is_err());
    assert!(column.new_internal_iterator().is_err());
}

#[test]
fn test_operations_after_close() {
    let temp = TempDir::new().unwrap();
    let mut column = open_column(temp.path());
    column.write_table(pairs(&[("a", "va")])).unwrap();

    column.close().unwrap();

    assert_eq!(column.state(), ColumnState::Closed);
    assert!(column.get(b"a").is_err());
    assert!(column.write_table(pairs(&[("b", "vb")])).is_err());
}

#[test]
fn test_checksums_off_still_reads() {
    let temp = TempDir::new().unwrap();
    let config = Config::builder()
        .data_dir(temp.path())
        .verify_checksums(false)
        .build();
    let mut column: VlogColumn = VlogColumn::open("nocrc", temp.path().join("c"), config).unwrap();
    column.write_table(pairs(&[("a", "va")])).unwrap();

    assert_eq!(column.get(b"a").unwrap(), Some(b"va".to_vec()));
}
