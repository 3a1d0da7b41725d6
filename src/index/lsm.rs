//! LSM Index
//!
//! The base engine shipped with the crate: WAL + MemTable + SSTables.
//!
//! ## Responsibilities
//! - Durable tombstones through the WAL
//! - Atomic bulk loads straight into a new SSTable
//! - Crash recovery in two steps (`recover` reads, `apply` acts)
//! - Full-merge compaction once enough SSTables pile up

use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::{Config, WalSyncStrategy};
use crate::error::{Result, VlogError};
use crate::memtable::{MemTable, MemTableEntry};
use crate::storage::StorageManager;
use crate::wal::{Operation, RecoveryResult, WalEntry, WalRecovery, WalWriter};

use super::{BaseEngine, SnapshotIterator};

/// What recovery found on disk
#[derive(Debug, Default)]
pub struct RecoveryEdit {
    /// Valid WAL entries, in log order
    pub entries: Vec<WalEntry>,
    pub result: RecoveryResult,
    /// Leftovers of interrupted SSTable publishes
    pub obsolete_files: Vec<PathBuf>,
}

/// LSM-tree index
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (delete/bulk_insert/flush/compaction): serialized by `write_lock`
/// - **Reads** (get): MemTable read lock, then StorageManager
///
/// Writes before `apply` fail with `InvalidState`: the WAL is not opened
/// until recovery has consumed the old one.
pub struct LsmIndex {
    dir: PathBuf,

    wal_path: PathBuf,

    /// Write-ahead log for tombstones, `None` until `apply`
    wal: Mutex<Option<WalWriter>>,

    /// In-memory table for recent deletes (internal RwLock)
    memtable: MemTable,

    /// Persistent storage manager (internal RwLock on sstables vec)
    storage: StorageManager,

    /// Serializes write operations
    write_lock: Mutex<()>,

    wal_sync_strategy: WalSyncStrategy,
    memtable_size_limit: usize,
    compaction_trigger: usize,
}

impl LsmIndex {
    const WAL_FILENAME: &'static str = "wal.log";
    const SSTABLE_DIR: &'static str = "sstables";

    /// Flush the memtable if it holds anything (write lock held)
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }
        self.reset_wal()
    }

    /// Move the memtable into an SSTable and start the WAL over (write lock held)
    fn reset_wal(&self) -> Result<()> {
        if !self.memtable.is_empty() {
            self.storage.flush(&self.memtable)?;
            self.memtable.clear();
        }

        if let Some(wal) = self.wal.lock().as_mut() {
            wal.truncate()?;
        }
        Ok(())
    }

    /// A WAL writer that failed mid-write cannot take more entries; everything
    /// it acknowledged is flushed before the log starts over (write lock held)
    fn restart_failed_wal(&self) {
        let failed = self.wal.lock().as_ref().is_some_and(|wal| wal.has_failed());
        if !failed {
            return;
        }
        if let Err(e) = self.reset_wal() {
            tracing::warn!(dir = %self.dir.display(), error = %e, "failed to restart index WAL");
        }
    }

    /// Merge SSTables once there are enough of them (write lock held)
    ///
    /// Failures are logged only: whatever triggered the merge has already
    /// been published.
    fn maybe_compact(&self) {
        if self.storage.sstable_count() < self.compaction_trigger {
            return;
        }
        if let Err(e) = self.storage.compact() {
            tracing::warn!(dir = %self.dir.display(), error = %e, "index compaction failed");
        }
    }

    /// Force the memtable out to an SSTable
    pub fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.flush_internal()
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Get the number of SSTables
    pub fn sstable_count(&self) -> usize {
        self.storage.sstable_count()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }
}

impl BaseEngine for LsmIndex {
    type Iter = SnapshotIterator;
    type Edit = RecoveryEdit;

    /// Open the index stored under `dir`
    ///
    /// Existing SSTables are loaded; the WAL is left untouched for `recover`.
    fn open(dir: &Path, config: &Config) -> Result<Self> {
        fs::create_dir_all(dir)?;
        let storage = StorageManager::open_with(&dir.join(Self::SSTABLE_DIR), config.verify_checksums)?;

        Ok(Self {
            dir: dir.to_path_buf(),
            wal_path: dir.join(Self::WAL_FILENAME),
            wal: Mutex::new(None),
            memtable: MemTable::new(),
            storage,
            write_lock: Mutex::new(()),
            wal_sync_strategy: config.wal_sync_strategy,
            memtable_size_limit: config.memtable_size_limit,
            compaction_trigger: config.compaction_trigger,
        })
    }

    fn recover(&self) -> Result<RecoveryEdit> {
        let (entries, result) = WalRecovery::recover(&self.wal_path)?;
        let obsolete_files = StorageManager::obsolete_files(self.storage.data_dir())?;

        Ok(RecoveryEdit {
            entries,
            result,
            obsolete_files,
        })
    }

    /// Replay the edit and start serving
    ///
    /// 1. Replay WAL entries into the memtable
    /// 2. Flush them so the old WAL can go
    /// 3. Delete obsolete files
    /// 4. Start a fresh WAL
    /// 5. Run a pending compaction
    fn apply(&self, edit: RecoveryEdit) -> Result<()> {
        let _guard = self.write_lock.lock();

        for entry in edit.entries {
            match entry.operation {
                Operation::Put { key, value } => {
                    self.memtable.put(key, value);
                }
                Operation::Delete { key } => {
                    self.memtable.delete(key);
                }
            }
        }

        let replayed = self.memtable.entry_count();
        if replayed > 0 {
            self.storage.flush(&self.memtable)?;
            self.memtable.clear();
        }

        for path in &edit.obsolete_files {
            if let Err(e) = fs::remove_file(path) {
                tracing::warn!(path = %path.display(), error = %e, "failed to remove obsolete file");
            }
        }

        let wal = WalWriter::open_at(
            &self.wal_path,
            self.wal_sync_strategy,
            edit.result.last_lsn + 1,
        )?;
        *self.wal.lock() = Some(wal);

        self.maybe_compact();

        if replayed > 0 || edit.result.entries_corrupted > 0 || !edit.obsolete_files.is_empty() {
            tracing::info!(
                dir = %self.dir.display(),
                replayed,
                corrupted = edit.result.entries_corrupted,
                obsolete = edit.obsolete_files.len(),
                "index recovered"
            );
        }
        Ok(())
    }

    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. SSTables (newest to oldest)
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        self.storage.get(key)
    }

    /// Load `pairs` as one new SSTable
    ///
    /// Pending memtable deletes are flushed first so that the new table is
    /// newer than every tombstone written before it.
    fn bulk_insert<I>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>,
    {
        // Sorted, later duplicates win
        let sorted: std::collections::BTreeMap<Vec<u8>, Vec<u8>> = pairs.into_iter().collect();
        if sorted.is_empty() {
            return Ok(());
        }

        let _guard = self.write_lock.lock();
        self.flush_internal()?;

        let table = self
            .storage
            .publish(sorted.into_iter().map(|(k, v)| (k, Some(v))))?;
        tracing::debug!(
            dir = %self.dir.display(),
            entries = table.entry_count,
            "bulk insert published"
        );

        self.maybe_compact();
        Ok(())
    }

    /// Steps:
    /// 1. Acquire write lock
    /// 2. Write tombstone to WAL (a failed WAL is flushed out and restarted)
    /// 3. Write tombstone to MemTable
    /// 4. Check if flush needed
    fn delete(&self, key: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let appended = match self.wal.lock().as_mut() {
            Some(wal) => wal.append(Operation::Delete { key: key.to_vec() }),
            None => {
                return Err(VlogError::InvalidState(
                    "index not recovered yet".to_string(),
                ))
            }
        };
        if let Err(e) = appended {
            self.restart_failed_wal();
            return Err(e);
        }

        let new_size = self.memtable.delete(key.to_vec());
        if new_size >= self.memtable_size_limit {
            self.flush_internal()?;
            self.maybe_compact();
        }
        Ok(())
    }

    /// Snapshot of every live entry, memtable overlaid on the SSTables.
    ///
    /// The whole index is read into memory, so both the cost of creating an
    /// iterator and its footprint grow with the index. Writers are blocked
    /// only while the tables and the memtable are read; dropping tombstones
    /// happens after the lock is released.
    fn new_internal_iterator(&self) -> Result<SnapshotIterator> {
        let merged = {
            let _guard = self.write_lock.lock();

            let mut merged = self.storage.snapshot()?;
            for (key, entry) in self.memtable.iter() {
                let value = match entry {
                    MemTableEntry::Value(v) => Some(v),
                    MemTableEntry::Tombstone => None,
                };
                merged.insert(key, value);
            }
            merged
        };

        let live = merged
            .into_iter()
            .filter_map(|(k, v)| v.map(|v| (k, v)))
            .collect();
        Ok(SnapshotIterator::new(live))
    }

    /// Flushes any pending deletes and syncs the WAL
    fn close(self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.flush_internal()?;

        if let Some(wal) = self.wal.lock().as_mut() {
            wal.sync()?;
        }
        Ok(())
    }
}
