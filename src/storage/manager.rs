//! Storage Manager
//!
//! Manages multiple SSTables and coordinates reads/writes.
//!
//! ## Responsibilities
//! - Discover existing SSTables on startup
//! - Search SSTables newest → oldest for reads
//! - Publish new SSTables atomically (memtable flush, bulk insert)
//! - Merge all SSTables into one when asked to compact

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use crate::env;
use crate::error::{Result, VlogError};
use crate::memtable::{MemTable, MemTableEntry};

use super::{SSTable, SSTableBuilder, SSTableReader};

/// Merged view of every table: key → value, `None` for a tombstone
pub type TableSnapshot = BTreeMap<Vec<u8>, Option<Vec<u8>>>;

const TMP_SUFFIX: &str = ".tmp";

/// Manages the storage layer
///
/// ## Concurrency:
/// - `sstables`: Protected by RwLock (many concurrent readers, exclusive writer)
/// - `next_sstable_id`: Atomic counter (lock-free)
/// - Publishing and compaction must be serialized by the caller
pub struct StorageManager {
    /// Directory where SSTables are stored
    data_dir: PathBuf,

    /// Open SSTable readers, ordered newest → oldest
    sstables: RwLock<Vec<SSTableReader>>,

    /// Next ID for creating new SSTables
    next_sstable_id: AtomicU64,

    verify_checksums: bool,
}

impl StorageManager {
    /// Open or create storage in the given directory
    pub fn open(path: &Path) -> Result<Self> {
        Self::open_with(path, true)
    }

    /// Open or create storage in the given directory
    ///
    /// On startup:
    /// 1. Create directory if it doesn't exist
    /// 2. Discover existing SSTable files
    /// 3. Open readers for each (loads indexes into RAM)
    /// 4. Order by ID descending (newest first)
    ///
    /// Leftover `*.tmp` files from an interrupted publish are ignored here;
    /// see [`StorageManager::obsolete_files`].
    pub fn open_with(path: &Path, verify_checksums: bool) -> Result<Self> {
        fs::create_dir_all(path)?;

        let mut sstable_ids: Vec<u64> = Vec::new();
        for entry in fs::read_dir(path)? {
            let file_path = entry?.path();
            if file_path.is_file() {
                if let Some(id) = Self::parse_sstable_id(&file_path) {
                    sstable_ids.push(id);
                }
            }
        }

        // Newest first (highest ID first)
        sstable_ids.sort_unstable_by(|a, b| b.cmp(a));

        let mut sstables = Vec::with_capacity(sstable_ids.len());
        for id in &sstable_ids {
            let sstable_path = Self::sstable_path_with_dir(path, *id);
            sstables.push(SSTableReader::open_with(&sstable_path, verify_checksums)?);
        }

        let next_id = sstable_ids.first().map(|&id| id + 1).unwrap_or(1);

        Ok(Self {
            data_dir: path.to_path_buf(),
            sstables: RwLock::new(sstables),
            next_sstable_id: AtomicU64::new(next_id),
            verify_checksums,
        })
    }

    /// Get a value by key (searches all SSTables newest → oldest)
    ///
    /// Returns:
    /// - `Ok(Some(value))`: key found with value
    /// - `Ok(None)`: key not found, or found tombstone (deleted)
    ///
    /// Takes the write lock because SSTableReader::get() seeks the file.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let mut sstables = self.sstables.write();

        for reader in sstables.iter_mut() {
            if !reader.might_contain(key) {
                continue;
            }

            match reader.get(key) {
                Ok(found) => return Ok(found),              // value or tombstone
                Err(VlogError::KeyNotFound) => continue,    // not in this SSTable
                Err(e) => return Err(e),
            }
        }

        Ok(None)
    }

    /// Flush a MemTable to a new SSTable (tombstones included)
    pub fn flush(&self, memtable: &MemTable) -> Result<SSTable> {
        if memtable.is_empty() {
            return Err(VlogError::Storage(
                "Cannot flush empty MemTable".to_string(),
            ));
        }

        let entries = memtable.iter().into_iter().map(|(key, entry)| match entry {
            MemTableEntry::Value(v) => (key, Some(v)),
            MemTableEntry::Tombstone => (key, None),
        });
        self.publish(entries)
    }

    /// Write `entries` (sorted by key, no duplicates) into a new SSTable and
    /// make it the newest one.
    ///
    /// The table is built and opened under a temporary name, then renamed
    /// into place; on any error nothing becomes visible, now or after a
    /// restart.
    pub fn publish<I>(&self, entries: I) -> Result<SSTable>
    where
        I: IntoIterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);
        let tmp_path = Self::tmp_path(&path);

        let metadata = match Self::build(&tmp_path, entries) {
            Ok(metadata) => metadata,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };

        let reader = self.install(&tmp_path, &path)?;
        self.sstables.write().insert(0, reader);

        tracing::debug!(
            id,
            entries = metadata.entry_count,
            bytes = metadata.file_size,
            "published sstable"
        );

        Ok(SSTable { path, ..metadata })
    }

    /// Open a finished table under its temporary name, then rename it to
    /// `path`.
    ///
    /// Nothing after the rename can fail, so a file that carries a final
    /// name is always one being served. On error the temporary file is
    /// removed.
    fn install(&self, tmp_path: &Path, path: &Path) -> Result<SSTableReader> {
        let installed = SSTableReader::open_with(tmp_path, self.verify_checksums)
            .and_then(|mut reader| {
                fs::rename(tmp_path, path)?;
                reader.set_path(path.to_path_buf());
                Ok(reader)
            });

        match installed {
            Ok(reader) => {
                self.sync_dir();
                Ok(reader)
            }
            Err(e) => {
                let _ = fs::remove_file(tmp_path);
                Err(e)
            }
        }
    }

    fn build<I>(path: &Path, entries: I) -> Result<SSTable>
    where
        I: IntoIterator<Item = (Vec<u8>, Option<Vec<u8>>)>,
    {
        let mut builder = SSTableBuilder::new(path)?;
        for (key, value) in entries {
            match value {
                Some(v) => builder.add(&key, &v)?,
                None => builder.add_tombstone(&key)?,
            }
        }
        builder.finish()
    }

    /// Merged contents of all SSTables, newer entries shadowing older ones
    pub fn snapshot(&self) -> Result<TableSnapshot> {
        let mut sstables = self.sstables.write();
        Self::merge(&mut sstables)
    }

    fn merge(sstables: &mut [SSTableReader]) -> Result<TableSnapshot> {
        let mut merged = TableSnapshot::new();
        // Oldest first so newer tables overwrite
        for reader in sstables.iter_mut().rev() {
            for entry in reader.iter()? {
                let (key, value) = entry?;
                merged.insert(key, value);
            }
        }
        Ok(merged)
    }

    /// Merge every SSTable into one.
    ///
    /// Tombstones are kept: if the merged-away files survive a crash they are
    /// older than the merged table, which must still shadow them.
    /// Returns `None` when there is nothing to merge.
    pub fn compact(&self) -> Result<Option<SSTable>> {
        let mut sstables = self.sstables.write();
        if sstables.len() < 2 {
            return Ok(None);
        }

        let merged = Self::merge(&mut sstables)?;
        let id = self.next_sstable_id.fetch_add(1, Ordering::SeqCst);
        let path = self.sstable_path(id);
        let tmp_path = Self::tmp_path(&path);

        let metadata = match Self::build(&tmp_path, merged) {
            Ok(metadata) => metadata,
            Err(e) => {
                let _ = fs::remove_file(&tmp_path);
                return Err(e);
            }
        };
        let reader = self.install(&tmp_path, &path)?;
        let replaced = std::mem::replace(&mut *sstables, vec![reader]);
        drop(sstables);

        let merged_count = replaced.len();
        for old in replaced {
            let old_path = old.path().to_path_buf();
            drop(old);
            if let Err(e) = fs::remove_file(&old_path) {
                tracing::warn!(path = %old_path.display(), error = %e, "failed to remove merged sstable");
            }
        }

        tracing::info!(id, merged = merged_count, entries = metadata.entry_count, "compacted sstables");
        Ok(Some(SSTable { path, ..metadata }))
    }

    /// Files in `dir` left behind by an interrupted publish
    pub fn obsolete_files(dir: &Path) -> Result<Vec<PathBuf>> {
        let mut obsolete = Vec::new();
        if !dir.exists() {
            return Ok(obsolete);
        }
        for entry in fs::read_dir(dir)? {
            let path = entry?.path();
            let is_tmp = path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| n.starts_with("sstable_") && n.ends_with(TMP_SUFFIX));
            if is_tmp {
                obsolete.push(path);
            }
        }
        Ok(obsolete)
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.sstables.read().len()
    }

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    /// Get the next SSTable ID (for testing/debugging)
    pub fn next_sstable_id(&self) -> u64 {
        self.next_sstable_id.load(Ordering::SeqCst)
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    /// Generate the file path for an SSTable with given ID
    fn sstable_path(&self, id: u64) -> PathBuf {
        Self::sstable_path_with_dir(&self.data_dir, id)
    }

    /// Generate SSTable path given a directory and ID
    fn sstable_path_with_dir(dir: &Path, id: u64) -> PathBuf {
        dir.join(format!("sstable_{:06}.sst", id))
    }

    fn tmp_path(path: &Path) -> PathBuf {
        let mut name = path.as_os_str().to_owned();
        name.push(TMP_SUFFIX);
        PathBuf::from(name)
    }

    /// Parse SSTable ID from filename
    /// "sstable_000042.sst" → Some(42)
    fn parse_sstable_id(path: &Path) -> Option<u64> {
        if path.extension()? != "sst" {
            return None;
        }
        let name = path.file_stem()?.to_str()?;
        name.strip_prefix("sstable_")?.parse().ok()
    }

    /// Persist the rename
    fn sync_dir(&self) {
        if let Err(e) = env::sync_dir(&self.data_dir) {
            tracing::warn!(dir = %self.data_dir.display(), error = %e, "failed to sync sstable directory");
        }
    }
}
