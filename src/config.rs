//! Configuration for vlogkv
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;
use std::sync::Arc;

use crate::env::{DiskEnv, Env};
use crate::error::{Result, VlogError};

/// Main configuration for a vlogkv instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── wal.log              (write buffer WAL)
    ///     └── column_000/
    ///         ├── index/           (base engine: wal.log + sstables/)
    ///         └── vlog/            (000001.vlog, 000002.vlog, ...)
    pub data_dir: PathBuf,

    /// Create missing column directories on open
    pub create_if_missing: bool,

    /// Refuse to open a column whose directory already exists
    pub error_if_exists: bool,

    /// Number of independently managed columns
    pub num_columns: usize,

    /// Factory for value-log output files
    pub env: Arc<dyn Env>,

    // -------------------------------------------------------------------------
    // WAL Configuration
    // -------------------------------------------------------------------------
    /// Sync strategy: how often to fsync WAL
    pub wal_sync_strategy: WalSyncStrategy,

    // -------------------------------------------------------------------------
    // MemTable Configuration
    // -------------------------------------------------------------------------
    /// Max size of memtable before flush (in bytes)
    pub memtable_size_limit: usize,

    // -------------------------------------------------------------------------
    // Index / Value Log Configuration
    // -------------------------------------------------------------------------
    /// Number of SSTables in an index that triggers a full merge
    pub compaction_trigger: usize,

    /// Verify CRCs when reading log chunks and SSTables
    pub verify_checksums: bool,

    /// fsync each value-log file before its pointers are published
    pub sync_value_log: bool,
}

/// WAL sync strategy
#[derive(Debug, Clone, Copy)]
pub enum WalSyncStrategy {
    /// fsync after every write (safest, slowest)
    EveryWrite,

    /// fsync after N uncommitted entries (balanced durability/performance)
    EveryNEntries { count: usize },
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./vlogkv_data"),
            create_if_missing: true,
            error_if_exists: false,
            num_columns: 1,
            env: Arc::new(DiskEnv),
            wal_sync_strategy: WalSyncStrategy::EveryNEntries { count: 100 },
            memtable_size_limit: 64 * 1024 * 1024, // 64 MB
            compaction_trigger: 8,
            verify_checksums: true,
            sync_value_log: true,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings no component can work with
    pub fn validate(&self) -> Result<()> {
        if self.num_columns == 0 {
            return Err(VlogError::Config("num_columns must be at least 1".into()));
        }
        if self.compaction_trigger < 2 {
            return Err(VlogError::Config(
                "compaction_trigger must be at least 2".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    pub fn create_if_missing(mut self, yes: bool) -> Self {
        self.config.create_if_missing = yes;
        self
    }

    pub fn error_if_exists(mut self, yes: bool) -> Self {
        self.config.error_if_exists = yes;
        self
    }

    /// Set the number of columns keys are routed across
    pub fn num_columns(mut self, count: usize) -> Self {
        self.config.num_columns = count;
        self
    }

    /// Set the file factory used for value-log output
    pub fn env(mut self, env: Arc<dyn Env>) -> Self {
        self.config.env = env;
        self
    }

    /// Set the WAL sync strategy
    pub fn wal_sync_strategy(mut self, strategy: WalSyncStrategy) -> Self {
        self.config.wal_sync_strategy = strategy;
        self
    }

    /// Set the memtable size limit (in bytes)
    pub fn memtable_size_limit(mut self, size: usize) -> Self {
        self.config.memtable_size_limit = size;
        self
    }

    /// Set the SSTable count that triggers index compaction
    pub fn compaction_trigger(mut self, count: usize) -> Self {
        self.config.compaction_trigger = count;
        self
    }

    pub fn verify_checksums(mut self, yes: bool) -> Self {
        self.config.verify_checksums = yes;
        self
    }

    pub fn sync_value_log(mut self, yes: bool) -> Self {
        self.config.sync_value_log = yes;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
