//! File creation seam
//!
//! Value-log files are created through an [`Env`] so that the write path can
//! be pointed at something other than the local disk (fault injection in
//! tests, mostly). Directory syncs go through it too. Reads always go
//! straight to `std::fs`.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

/// An append-only output file
pub trait WritableFile: Write + Send {
    /// Flush buffered data and force it to stable storage
    fn sync(&mut self) -> io::Result<()>;
}

impl WritableFile for File {
    fn sync(&mut self) -> io::Result<()> {
        self.flush()?;
        self.sync_data()
    }
}

impl WritableFile for Vec<u8> {
    fn sync(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<W: WritableFile + ?Sized> WritableFile for Box<W> {
    fn sync(&mut self) -> io::Result<()> {
        (**self).sync()
    }
}

/// Creates files on behalf of the storage layers
pub trait Env: fmt::Debug + Send + Sync {
    /// Create `path` for writing, truncating anything already there
    fn new_writable_file(&self, path: &Path) -> io::Result<Box<dyn WritableFile>>;

    /// Make the entries of directory `dir` (files created or renamed in it)
    /// durable
    fn sync_dir(&self, dir: &Path) -> io::Result<()> {
        sync_dir(dir)
    }
}

/// fsync a directory so that entries created in it survive a crash
///
/// Directories cannot be opened for syncing on every platform; elsewhere
/// this is a no-op.
#[cfg(unix)]
pub fn sync_dir(dir: &Path) -> io::Result<()> {
    File::open(dir)?.sync_all()
}

#[cfg(not(unix))]
pub fn sync_dir(_dir: &Path) -> io::Result<()> {
    Ok(())
}

/// The local filesystem
#[derive(Debug, Default, Clone, Copy)]
pub struct DiskEnv;

impl Env for DiskEnv {
    fn new_writable_file(&self, path: &Path) -> io::Result<Box<dyn WritableFile>> {
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(file))
    }
}
