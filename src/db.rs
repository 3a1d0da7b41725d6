//! Columnar DB
//!
//! Routes keys to columns and buffers writes in front of them.
//!
//! ## Responsibilities
//! - Own the write buffer (WAL + MemTable) shared by all columns
//! - Pick each key's column with a [`ColumnSelector`]
//! - Flush the buffer: live pairs become one segment per column, deletes go
//!   through each column's index
//! - Recover the buffer's WAL on open

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use parking_lot::{Mutex, RwLock, RwLockReadGuard};

use crate::column::VlogColumn;
use crate::config::Config;
use crate::error::{Result, VlogError};
use crate::memtable::{MemTable, MemTableEntry};
use crate::wal::{Operation, WalRecovery, WalWriter};

/// Maps a key to the index of the column that owns it
///
/// Must be deterministic: the same key always lands on the same column.
pub trait ColumnSelector: Send + Sync {
    fn select(&self, key: &[u8]) -> usize;
}

/// Everything goes to column 0
#[derive(Debug, Default, Clone, Copy)]
pub struct SingleColumn;

impl ColumnSelector for SingleColumn {
    fn select(&self, _key: &[u8]) -> usize {
        0
    }
}

/// CRC32 of the key, modulo the column count
#[derive(Debug, Clone, Copy)]
pub struct HashSelector {
    columns: usize,
}

impl HashSelector {
    pub fn new(columns: usize) -> Self {
        Self {
            columns: columns.max(1),
        }
    }
}

impl ColumnSelector for HashSelector {
    fn select(&self, key: &[u8]) -> usize {
        crc32fast::hash(key) as usize % self.columns
    }
}

/// Live pairs and deleted keys bound for one column
#[derive(Default)]
struct Partition {
    live: Vec<(Vec<u8>, Vec<u8>)>,
    deleted: Vec<Vec<u8>>,
}

/// Key-value store over N value-log columns
///
/// ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
///
/// - **Writes** (put/delete/flush): serialized by `write_lock`
/// - **Reads** (get/scan): MemTable read lock, then the column's read lock
/// - **Flush**: columns are written in parallel, each under its own write lock
pub struct ColumnarDb {
    config: Config,

    /// Write-ahead log of the write buffer
    wal: Mutex<WalWriter>,

    /// Writes not yet in any column
    memtable: MemTable,

    columns: Vec<RwLock<VlogColumn>>,

    selector: Box<dyn ColumnSelector>,

    /// Serializes write operations (put/delete/flush)
    write_lock: Mutex<()>,
}

impl ColumnarDb {
    const WAL_FILENAME: &'static str = "wal.log";

    /// Open with a [`HashSelector`] over `config.num_columns` columns
    pub fn open(config: Config) -> Result<Self> {
        let selector = HashSelector::new(config.num_columns);
        Self::open_with_selector(config, Box::new(selector))
    }

    /// Open or create a DB
    ///
    /// On startup:
    /// 1. Check the data directory against the create/exists policy
    /// 2. Open and recover every column
    /// 3. Replay the write buffer's WAL and flush it into the columns
    /// 4. Start a fresh WAL
    pub fn open_with_selector(config: Config, selector: Box<dyn ColumnSelector>) -> Result<Self> {
        config.validate()?;

        if !config.data_dir.exists() {
            if !config.create_if_missing {
                return Err(VlogError::InvalidArgument(format!(
                    "{} does not exist (create_if_missing is false)",
                    config.data_dir.display()
                )));
            }
            fs::create_dir_all(&config.data_dir)?;
        }

        let mut columns: Vec<RwLock<VlogColumn>> = Vec::with_capacity(config.num_columns);
        for i in 0..config.num_columns {
            let name = Self::column_name(i);
            let dir = config.data_dir.join(&name);
            columns.push(RwLock::new(VlogColumn::open(name, dir, config.clone())?));
        }

        let wal_path = config.data_dir.join(Self::WAL_FILENAME);
        let (entries, recovery) = WalRecovery::recover(&wal_path)?;

        let memtable = MemTable::new();
        for entry in entries {
            match entry.operation {
                Operation::Put { key, value } => {
                    memtable.put(key, value);
                }
                Operation::Delete { key } => {
                    memtable.delete(key);
                }
            }
        }

        if recovery.entries_recovered > 0 || recovery.entries_corrupted > 0 {
            tracing::info!(
                recovered = recovery.entries_recovered,
                corrupted = recovery.entries_corrupted,
                last_lsn = recovery.last_lsn,
                "write buffer recovered"
            );
        }

        // Recovered writes must reach the columns before the WAL is reset
        Self::flush_to_columns(&memtable, &columns, selector.as_ref())?;
        memtable.clear();

        let wal = WalWriter::open_at(&wal_path, config.wal_sync_strategy, recovery.last_lsn + 1)?;

        Ok(Self {
            config,
            wal: Mutex::new(wal),
            memtable,
            columns,
            selector,
            write_lock: Mutex::new(()),
        })
    }

    /// Get a value by key
    ///
    /// Search order:
    /// 1. MemTable (most recent writes)
    /// 2. The key's column
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.memtable.get(key) {
            return match entry {
                MemTableEntry::Value(value) => Ok(Some(value)),
                MemTableEntry::Tombstone => Ok(None),
            };
        }

        let idx = Self::route(self.selector.as_ref(), self.columns.len(), key)?;
        self.columns[idx].read().get(key)
    }

    /// Put a key-value pair
    pub fn put(&self, key: &[u8], value: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let appended = self.wal.lock().append(Operation::Put {
            key: key.to_vec(),
            value: value.to_vec(),
        });
        if let Err(e) = appended {
            self.restart_failed_wal();
            return Err(e);
        }

        let new_size = self.memtable.put(key.to_vec(), value.to_vec());
        if new_size >= self.config.memtable_size_limit {
            self.flush_internal()?;
        }
        Ok(())
    }

    /// Delete a key
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        let _guard = self.write_lock.lock();

        let appended = self.wal.lock().append(Operation::Delete { key: key.to_vec() });
        if let Err(e) = appended {
            self.restart_failed_wal();
            return Err(e);
        }

        let new_size = self.memtable.delete(key.to_vec());
        if new_size >= self.config.memtable_size_limit {
            self.flush_internal()?;
        }
        Ok(())
    }

    /// Move every buffered write into the columns
    pub fn flush(&self) -> Result<()> {
        let _guard = self.write_lock.lock();
        self.flush_internal()
    }

    /// Internal flush implementation (called with write lock held)
    fn flush_internal(&self) -> Result<()> {
        if self.memtable.is_empty() {
            return Ok(());
        }
        self.reset_wal()
    }

    /// Move the memtable into the columns and start the WAL over (write lock held)
    fn reset_wal(&self) -> Result<()> {
        Self::flush_to_columns(&self.memtable, &self.columns, self.selector.as_ref())?;
        self.memtable.clear();
        self.wal.lock().truncate()?;
        Ok(())
    }

    /// A WAL writer that failed mid-write cannot take more entries; everything
    /// it acknowledged is flushed before the log starts over (write lock held)
    fn restart_failed_wal(&self) {
        if !self.wal.lock().has_failed() {
            return;
        }
        if let Err(e) = self.reset_wal() {
            tracing::warn!(
                data_dir = %self.config.data_dir.display(),
                error = %e,
                "failed to restart write buffer WAL"
            );
        }
    }

    /// Write the memtable's contents into the columns, one thread per column.
    ///
    /// On error some columns may already hold their part; the memtable keeps
    /// everything, and flushing again rewrites the same pairs.
    fn flush_to_columns(
        memtable: &MemTable,
        columns: &[RwLock<VlogColumn>],
        selector: &dyn ColumnSelector,
    ) -> Result<()> {
        if memtable.is_empty() {
            return Ok(());
        }

        let mut partitions: Vec<Partition> = (0..columns.len()).map(|_| Partition::default()).collect();
        for (key, entry) in memtable.iter() {
            let idx = Self::route(selector, columns.len(), &key)?;
            match entry {
                MemTableEntry::Value(value) => partitions[idx].live.push((key, value)),
                MemTableEntry::Tombstone => partitions[idx].deleted.push(key),
            }
        }

        let results = crossbeam::thread::scope(|s| {
            let handles: Vec<_> = columns
                .iter()
                .zip(partitions)
                .filter(|(_, p)| !p.live.is_empty() || !p.deleted.is_empty())
                .map(|(column, partition)| {
                    s.spawn(move |_| -> Result<()> {
                        let mut column = column.write();
                        for key in &partition.deleted {
                            column.delete(key)?;
                        }
                        column.write_table(partition.live)?;
                        Ok(())
                    })
                })
                .collect();

            handles
                .into_iter()
                .map(|h| {
                    h.join().unwrap_or_else(|_| {
                        Err(VlogError::Storage("column flush thread panicked".to_string()))
                    })
                })
                .collect::<Vec<_>>()
        })
        .map_err(|_| VlogError::Storage("column flush thread panicked".to_string()))?;

        for result in results {
            result?;
        }
        tracing::debug!(
            entries = memtable.entry_count(),
            columns = columns.len(),
            "write buffer flushed"
        );
        Ok(())
    }

    /// Every live pair in key order, buffered writes included
    pub fn scan(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>> {
        let mut merged = BTreeMap::new();

        for column in &self.columns {
            let mut iter = column.read().new_internal_iterator()?;
            iter.seek_to_first();
            while iter.valid() {
                let value = iter.value()?.to_vec();
                merged.insert(iter.key().to_vec(), value);
                iter.next();
            }
            iter.status()?;
        }

        for (key, entry) in self.memtable.iter() {
            match entry {
                MemTableEntry::Value(value) => {
                    merged.insert(key, value);
                }
                MemTableEntry::Tombstone => {
                    merged.remove(&key);
                }
            }
        }

        Ok(merged.into_iter().collect())
    }

    /// Flush buffered writes and close every column
    pub fn close(self) -> Result<()> {
        self.flush()?;
        self.wal.lock().sync()?;

        for column in self.columns {
            column.into_inner().close()?;
        }
        Ok(())
    }

    fn route(selector: &dyn ColumnSelector, columns: usize, key: &[u8]) -> Result<usize> {
        let idx = selector.select(key);
        if idx >= columns {
            return Err(VlogError::InvalidArgument(format!(
                "selector chose column {} of {}",
                idx, columns
            )));
        }
        Ok(idx)
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Directory name of column `i`: "column_000", "column_001", ...
    pub fn column_name(i: usize) -> String {
        format!("column_{:03}", i)
    }

    /// Read access to column `i`
    pub fn column(&self, i: usize) -> Option<RwLockReadGuard<'_, VlogColumn>> {
        self.columns.get(i).map(|c| c.read())
    }

    /// Column index `key` is routed to
    pub fn column_of(&self, key: &[u8]) -> Result<usize> {
        Self::route(self.selector.as_ref(), self.columns.len(), key)
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    /// Get the memtable entry count
    pub fn memtable_entry_count(&self) -> usize {
        self.memtable.entry_count()
    }

    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}
