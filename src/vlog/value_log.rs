//! Value Log
//!
//! Numbered append-only files in one directory. Writers hand out pointers,
//! readers resolve them.

use std::fs::{self, File};
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::env::{Env, WritableFile};
use crate::error::{Result, VlogError};
use crate::record_log::{LogReader, LogWriter};

use super::{record, Pointer};

const FILE_EXTENSION: &str = "vlog";

/// The value-log file set of one column
#[derive(Debug)]
pub struct ValueLog {
    dir: PathBuf,
    column: String,
    env: Arc<dyn Env>,
    verify_checksums: bool,
    /// Records resolved through `read`
    reads: AtomicU64,
}

impl ValueLog {
    pub fn new(
        dir: impl Into<PathBuf>,
        column: impl Into<String>,
        env: Arc<dyn Env>,
        verify_checksums: bool,
    ) -> Self {
        Self {
            dir: dir.into(),
            column: column.into(),
            env,
            verify_checksums,
            reads: AtomicU64::new(0),
        }
    }

    /// Start file `file_number`, truncating whatever a failed attempt left
    pub fn create(&self, file_number: u64) -> Result<ValueLogWriter> {
        let path = self.file_path(file_number);
        let file = self
            .env
            .new_writable_file(&path)
            .map_err(|e| VlogError::from(e).in_column(&self.column))?;

        Ok(ValueLogWriter {
            column: self.column.clone(),
            file_number,
            log: LogWriter::new(file),
            records: 0,
            dir: self.dir.clone(),
            env: Arc::clone(&self.env),
            dir_synced: false,
        })
    }

    /// Resolve a pointer to the `(key, value)` stored there.
    ///
    /// The file handle lives only for this call.
    pub fn read(&self, pointer: Pointer) -> Result<(Vec<u8>, Vec<u8>)> {
        self.reads.fetch_add(1, Ordering::Relaxed);
        self.read_record(pointer)
            .map_err(|e| e.in_column(&self.column))
    }

    fn read_record(&self, pointer: Pointer) -> Result<(Vec<u8>, Vec<u8>)> {
        let file = File::open(self.file_path(pointer.file_number))?;
        let mut reader = LogReader::at_record(
            BufReader::new(file),
            pointer.offset,
            self.verify_checksums,
        )?;

        let payload = reader.read_record()?.ok_or_else(|| {
            VlogError::Corruption(format!("no value-log record at {}", pointer))
        })?;
        record::decode(&payload)
    }

    /// Highest file number present on disk, 0 if none
    pub fn max_file_number(&self) -> Result<u64> {
        let mut max = 0;
        for entry in fs::read_dir(&self.dir)? {
            let path = entry?.path();
            if let Some(number) = Self::parse_file_number(&path) {
                max = max.max(number);
            }
        }
        Ok(max)
    }

    /// Number of records resolved so far
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    /// "000042.vlog" for file 42
    pub fn file_path(&self, file_number: u64) -> PathBuf {
        self.dir.join(format!("{:06}.{}", file_number, FILE_EXTENSION))
    }

    /// "000042.vlog" → Some(42)
    fn parse_file_number(path: &Path) -> Option<u64> {
        if path.extension()? != FILE_EXTENSION {
            return None;
        }
        path.file_stem()?.to_str()?.parse().ok()
    }
}

/// Appends records to one value-log file
pub struct ValueLogWriter {
    column: String,
    file_number: u64,
    log: LogWriter<Box<dyn WritableFile>>,
    records: u64,
    dir: PathBuf,
    env: Arc<dyn Env>,
    /// The file's directory entry is durable
    dir_synced: bool,
}

impl ValueLogWriter {
    /// Append `(key, value)` and return where it landed
    pub fn append(&mut self, key: &[u8], value: &[u8]) -> Result<Pointer> {
        let pointer = Pointer::new(self.file_number, self.log.current_offset());
        let payload = record::encode(key, value).map_err(|e| e.in_column(&self.column))?;
        self.log
            .add_record(&payload)
            .map_err(|e| e.in_column(&self.column))?;
        self.records += 1;
        Ok(pointer)
    }

    /// Force appended records to stable storage, along with the file's
    /// entry in the value-log directory
    pub fn sync(&mut self) -> Result<()> {
        self.log.sync().map_err(|e| e.in_column(&self.column))?;
        if !self.dir_synced {
            self.env
                .sync_dir(&self.dir)
                .map_err(|e| VlogError::from(e).in_column(&self.column))?;
            self.dir_synced = true;
        }
        Ok(())
    }

    pub fn file_number(&self) -> u64 {
        self.file_number
    }

    /// Records appended so far
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Bytes written so far
    pub fn bytes_written(&self) -> u64 {
        self.log.current_offset()
    }
}
