//! Value-log backed column

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::config::Config;
use crate::error::{Result, VlogError};
use crate::index::{BaseEngine, LsmIndex};
use crate::vlog::{Pointer, ValueLog};

use super::LazyValueIterator;

/// Lifecycle of a column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnState {
    /// Created, or a recovery attempt failed
    Uninitialized,
    Recovering,
    /// Serving reads and writes
    Ready,
    Closed,
}

/// What one successful `write_table` produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    /// Value-log file holding the segment's values
    pub file_number: u64,
    pub records: u64,
    /// Size of that value-log file
    pub bytes: u64,
}

/// One column: an index of pointers over a value log
///
/// ## Layout
/// ```text
/// {dir}/
///   index/    base engine files
///   vlog/     000001.vlog, 000002.vlog, ...
/// ```
///
/// `write_table` takes `&mut self`, so segment builds on one column are
/// serialized by the borrow checker (or by whatever lock the owner holds).
pub struct VlogColumn<E: BaseEngine = LsmIndex> {
    name: String,
    dir: PathBuf,
    config: Config,
    state: ColumnState,
    base: Option<E>,
    vlog: Arc<ValueLog>,
    /// Value-log file the next segment goes to
    next_file_number: u64,
}

impl<E: BaseEngine> VlogColumn<E> {
    const INDEX_DIR: &'static str = "index";
    const VLOG_DIR: &'static str = "vlog";

    /// A column over `dir`, not usable until [`VlogColumn::recover`]
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>, config: Config) -> Self {
        let name = name.into();
        let dir = dir.into();
        let vlog = ValueLog::new(
            dir.join(Self::VLOG_DIR),
            name.clone(),
            Arc::clone(&config.env),
            config.verify_checksums,
        );

        Self {
            name,
            dir,
            config,
            state: ColumnState::Uninitialized,
            base: None,
            vlog: Arc::new(vlog),
            next_file_number: 1,
        }
    }

    /// `new` followed by `recover`
    pub fn open(name: impl Into<String>, dir: impl Into<PathBuf>, config: Config) -> Result<Self> {
        let mut column = Self::new(name, dir, config);
        column.recover()?;
        Ok(column)
    }

    /// Bring the column to `Ready`.
    ///
    /// Applies the directory policy, then lets the base engine replay its
    /// own log. The value log needs no scan: every pointer the recovered
    /// index holds was published after its record was synced. On failure
    /// the column goes back to `Uninitialized` and holds no engine.
    pub fn recover(&mut self) -> Result<()> {
        if self.state != ColumnState::Uninitialized {
            return Err(VlogError::InvalidState(format!(
                "cannot recover a column in state {:?}",
                self.state
            ))
            .in_column(&self.name));
        }

        self.state = ColumnState::Recovering;
        match self.recover_inner() {
            Ok(base) => {
                self.base = Some(base);
                self.state = ColumnState::Ready;
                tracing::info!(
                    column = %self.name,
                    next_file_number = self.next_file_number,
                    "column recovered"
                );
                Ok(())
            }
            Err(e) => {
                self.state = ColumnState::Uninitialized;
                Err(e.in_column(&self.name))
            }
        }
    }

    fn recover_inner(&mut self) -> Result<E> {
        if self.dir.exists() {
            if self.config.error_if_exists {
                return Err(VlogError::InvalidArgument(format!(
                    "{} exists (error_if_exists is true)",
                    self.dir.display()
                )));
            }
        } else if !self.config.create_if_missing {
            return Err(VlogError::InvalidArgument(format!(
                "{} does not exist (create_if_missing is false)",
                self.dir.display()
            )));
        }

        let index_dir = self.dir.join(Self::INDEX_DIR);
        fs::create_dir_all(&index_dir)?;
        fs::create_dir_all(self.vlog.dir())?;
        self.config.env.sync_dir(&self.dir)?;
        if let Some(parent) = self.dir.parent().filter(|p| !p.as_os_str().is_empty()) {
            self.config.env.sync_dir(parent)?;
        }

        let base = E::open(&index_dir, &self.config)?;
        let edit = base.recover()?;
        base.apply(edit)?;

        // Numbers of committed files are never handed out again
        self.next_file_number = self.vlog.max_file_number()? + 1;
        Ok(base)
    }

    /// Build one segment from a sorted stream of live `(key, value)` pairs.
    ///
    /// 1. Append every pair to value-log file `next_file_number`
    /// 2. Sync the file and its directory entry
    /// 3. Bulk insert `(key, pointer)` pairs into the index
    /// 4. Advance `next_file_number`
    ///
    /// Any failure returns before step 4: none of the batch is visible and
    /// the next call rewrites the same file. Returns `None` for empty input.
    pub fn write_table<I, K, V>(&mut self, contents: I) -> Result<Option<TableSummary>>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        self.ready_base()?;

        let mut contents = contents.into_iter().peekable();
        if contents.peek().is_none() {
            return Ok(None);
        }

        let file_number = self.next_file_number;
        match self.build_segment(file_number, contents) {
            Ok(summary) => {
                self.next_file_number += 1;
                tracing::debug!(
                    column = %self.name,
                    file_number,
                    records = summary.records,
                    bytes = summary.bytes,
                    "segment written"
                );
                Ok(Some(summary))
            }
            Err(e) => {
                tracing::warn!(
                    column = %self.name,
                    file_number,
                    error = %e,
                    "segment build failed, value-log records left unreferenced"
                );
                Err(e.in_column(&self.name))
            }
        }
    }

    fn build_segment<I, K, V>(&self, file_number: u64, contents: I) -> Result<TableSummary>
    where
        I: Iterator<Item = (K, V)>,
        K: AsRef<[u8]>,
        V: AsRef<[u8]>,
    {
        let base = self.ready_base()?;
        let mut writer = self.vlog.create(file_number)?;

        let mut pointers = Vec::new();
        for (key, value) in contents {
            let key = key.as_ref();
            let pointer = writer.append(key, value.as_ref())?;
            pointers.push((key.to_vec(), pointer.to_bytes().to_vec()));
        }

        if self.config.sync_value_log {
            writer.sync()?;
        }
        let summary = TableSummary {
            file_number,
            records: writer.records(),
            bytes: writer.bytes_written(),
        };
        drop(writer);

        base.bulk_insert(pointers)?;
        Ok(summary)
    }

    /// Look up `key`: pointer from the index, value from the log.
    ///
    /// `Ok(None)` when the index has no live entry.
    pub fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        let base = self.ready_base()?;
        let raw = match base.get(key).map_err(|e| e.in_column(&self.name))? {
            Some(raw) => raw,
            None => return Ok(None),
        };

        let pointer = Pointer::from_bytes(&raw).map_err(|e| e.in_column(&self.name))?;
        let (stored_key, value) = self.vlog.read(pointer)?;
        if stored_key != key {
            return Err(VlogError::Corruption(format!(
                "record at {} belongs to key {:?}, not {:?}",
                pointer,
                String::from_utf8_lossy(&stored_key),
                String::from_utf8_lossy(key)
            ))
            .in_column(&self.name));
        }
        Ok(Some(value))
    }

    /// Delete `key` through the base engine's write path
    pub fn delete(&self, key: &[u8]) -> Result<()> {
        self.ready_base()?
            .delete(key)
            .map_err(|e| e.in_column(&self.name))
    }

    /// Iterator over the column that reads values only when asked
    pub fn new_internal_iterator(&self) -> Result<LazyValueIterator<E::Iter>> {
        let inner = self
            .ready_base()?
            .new_internal_iterator()
            .map_err(|e| e.in_column(&self.name))?;
        Ok(LazyValueIterator::new(inner, Arc::clone(&self.vlog)))
    }

    /// Close the base engine. Closing twice is a no-op.
    pub fn close(&mut self) -> Result<()> {
        if self.state == ColumnState::Closed {
            return Ok(());
        }
        self.state = ColumnState::Closed;
        match self.base.take() {
            Some(base) => base.close().map_err(|e| e.in_column(&self.name)),
            None => Ok(()),
        }
    }

    fn ready_base(&self) -> Result<&E> {
        match (&self.state, &self.base) {
            (ColumnState::Ready, Some(base)) => Ok(base),
            (state, _) => Err(VlogError::InvalidState(format!(
                "column is {:?}, not Ready",
                state
            ))
            .in_column(&self.name)),
        }
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn state(&self) -> ColumnState {
        self.state
    }

    /// File number the next `write_table` will use
    pub fn next_file_number(&self) -> u64 {
        self.next_file_number
    }

    pub fn value_log(&self) -> &Arc<ValueLog> {
        &self.vlog
    }

    /// The base engine, once recovered
    pub fn base(&self) -> Option<&E> {
        self.base.as_ref()
    }
}
