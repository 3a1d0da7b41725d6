//! Tests for SSTable implementation
//!
//! These tests verify:
//! - SSTable creation and writing
//! - Key lookups via in-memory index
//! - Tombstone handling
//! - Iterator over all entries
//! - File format validation and data checksums

use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use vlogkv::storage::{SSTable, SSTableBuilder, SSTableReader};
use vlogkv::VlogError;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_sstable() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.sst");
    (temp_dir, path)
}

/// Create an SSTable with numbered entries
fn create_sstable_with_entries(path: &Path, count: usize) -> SSTable {
    let mut builder = SSTableBuilder::new(path).unwrap();
    for i in 0..count {
        let key = format!("key{:05}", i);
        let value = format!("value{}", i);
        builder.add(key.as_bytes(), value.as_bytes()).unwrap();
    }
    builder.finish().unwrap()
}

// =============================================================================
// SSTableBuilder Tests
// =============================================================================

#[test]
fn test_builder_metadata() {
    let (_temp, path) = setup_temp_sstable();

    let sstable = create_sstable_with_entries(&path, 5);

    assert!(path.exists());
    assert_eq!(sstable.entry_count(), 5);
    assert_eq!(sstable.min_key, b"key00000");
    assert_eq!(sstable.max_key, b"key00004");
    assert_eq!(sstable.file_size, fs::metadata(&path).unwrap().len());
    assert!(sstable.might_contain(b"key00002"));
    assert!(!sstable.might_contain(b"zzz"));
}

#[test]
fn test_builder_empty_sstable() {
    let (_temp, path) = setup_temp_sstable();

    let sstable = SSTableBuilder::new(&path).unwrap().finish().unwrap();
    assert_eq!(sstable.entry_count(), 0);

    let mut reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 0);
    assert!(!reader.might_contain(b"anything"));
    assert_eq!(reader.iter().unwrap().count(), 0);
}

#[test]
fn test_builder_rejects_unsorted_keys() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"b", b"2").unwrap();
    assert!(matches!(builder.add(b"a", b"1"), Err(VlogError::Storage(_))));
    assert!(matches!(builder.add_tombstone(b"b"), Err(VlogError::Storage(_))));
}

// =============================================================================
// SSTableReader Tests
// =============================================================================

#[test]
fn test_reader_get() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 100);

    let mut reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.entry_count(), 100);

    // Random-ish access order
    for i in [99, 0, 50, 7, 64] {
        let key = format!("key{:05}", i);
        let value = reader.get(key.as_bytes()).unwrap();
        assert_eq!(value, Some(format!("value{}", i).into_bytes()));
    }
}

#[test]
fn test_reader_get_missing_key() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 3);

    let mut reader = SSTableReader::open(&path).unwrap();
    assert!(matches!(reader.get(b"nope"), Err(VlogError::KeyNotFound)));
}

#[test]
fn test_reader_get_tombstone() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"a", b"1").unwrap();
    builder.add_tombstone(b"b").unwrap();
    builder.add(b"c", b"").unwrap();
    builder.finish().unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.get(b"a").unwrap(), Some(b"1".to_vec()));
    assert_eq!(reader.get(b"b").unwrap(), None);
    assert_eq!(reader.get(b"c").unwrap(), Some(Vec::new()));
}

#[test]
fn test_iterator_returns_all_entries_in_order() {
    let (_temp, path) = setup_temp_sstable();

    let mut builder = SSTableBuilder::new(&path).unwrap();
    builder.add(b"a", b"1").unwrap();
    builder.add_tombstone(b"b").unwrap();
    builder.add(b"c", &vec![b'x'; 100_000]).unwrap();
    builder.finish().unwrap();

    let mut reader = SSTableReader::open(&path).unwrap();
    let entries: Vec<_> = reader.iter().unwrap().map(|e| e.unwrap()).collect();

    assert_eq!(entries.len(), 3);
    assert_eq!(entries[0], (b"a".to_vec(), Some(b"1".to_vec())));
    assert_eq!(entries[1], (b"b".to_vec(), None));
    assert_eq!(entries[2].1.as_ref().map(|v| v.len()), Some(100_000));

    // Lookups still work after iterating
    assert_eq!(reader.get(b"a").unwrap(), Some(b"1".to_vec()));
}

#[test]
fn test_min_max_keys() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 10);

    let reader = SSTableReader::open(&path).unwrap();
    assert_eq!(reader.min_key(), Some(&b"key00000"[..]));
    assert_eq!(reader.max_key(), Some(&b"key00009"[..]));
    assert!(!reader.might_contain(b"a"));
    assert!(reader.might_contain(b"key00005"));
}

// =============================================================================
// Validation Tests
// =============================================================================

#[test]
fn test_open_nonexistent_file() {
    let (_temp, path) = setup_temp_sstable();
    assert!(matches!(SSTableReader::open(&path), Err(VlogError::Io(_))));
}

#[test]
fn test_open_invalid_magic() {
    let (_temp, path) = setup_temp_sstable();
    fs::write(&path, vec![b'G'; 64]).unwrap();
    assert!(matches!(SSTableReader::open(&path), Err(VlogError::Storage(_))));
}

#[test]
fn test_open_detects_data_corruption() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 10);

    let mut bytes = fs::read(&path).unwrap();
    // Inside the first value
    bytes[14 + 8 + 8 + 1] ^= 0xFF;
    fs::write(&path, &bytes).unwrap();

    let err = SSTableReader::open(&path).err().unwrap();
    assert!(err.is_corruption());

    // Without verification the table still opens
    assert!(SSTableReader::open_with(&path, false).is_ok());
}

#[test]
fn test_open_detects_bad_index_offset() {
    let (_temp, path) = setup_temp_sstable();
    create_sstable_with_entries(&path, 3);

    let mut bytes = fs::read(&path).unwrap();
    let footer = bytes.len() - 16;
    bytes[footer..footer + 8].copy_from_slice(&u64::MAX.to_le_bytes());
    fs::write(&path, &bytes).unwrap();

    assert!(SSTableReader::open(&path).err().unwrap().is_corruption());
}
