//! Index Module
//!
//! The sorted index a column keeps its pointers in. Columns only talk to it
//! through [`BaseEngine`], so any engine that can offer the operations below
//! can sit under a column.
//!
//! ## Contract
//! - `get`: newest visible value for a key, `None` when absent or deleted
//! - `bulk_insert`: all pairs become visible at once, or none do
//! - `new_internal_iterator`: consistent view as of creation
//! - `recover` / `apply`: replay the engine's own durable state at open

mod iter;
mod lsm;

use std::path::Path;

use crate::config::Config;
use crate::error::Result;

pub use iter::SnapshotIterator;
pub use lsm::{LsmIndex, RecoveryEdit};

/// Positioned cursor over an index, in key order
///
/// `key()` and `value()` may only be called while `valid()`; they return
/// empty slices otherwise.
pub trait IndexIterator {
    fn valid(&self) -> bool;
    fn seek_to_first(&mut self);
    fn seek_to_last(&mut self);
    /// Position at the first key >= `target`
    fn seek(&mut self, target: &[u8]);
    fn next(&mut self);
    fn prev(&mut self);
    fn key(&self) -> &[u8];
    fn value(&self) -> &[u8];
    /// First error hit while positioning, if any
    fn status(&self) -> Result<()>;
}

/// A sorted key-value engine a column stores its pointers in
pub trait BaseEngine: Send + Sync + Sized {
    type Iter: IndexIterator;

    /// Work found by [`BaseEngine::recover`] that [`BaseEngine::apply`] carries out
    type Edit;

    /// Open the engine's files under `dir` without replaying anything yet
    fn open(dir: &Path, config: &Config) -> Result<Self>;

    /// Read back durable state that is not yet part of the sorted tables
    fn recover(&self) -> Result<Self::Edit>;

    /// Apply a recovery edit; the engine serves requests afterwards
    fn apply(&self, edit: Self::Edit) -> Result<()>;

    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Insert every pair atomically. Input order is free; for duplicate keys
    /// the later pair wins.
    fn bulk_insert<I>(&self, pairs: I) -> Result<()>
    where
        I: IntoIterator<Item = (Vec<u8>, Vec<u8>)>;

    /// Hide `key` through the engine's own write path
    fn delete(&self, key: &[u8]) -> Result<()>;

    /// Consistent view as of the call. Engines may materialize it, so the
    /// cost can be proportional to the whole index.
    fn new_internal_iterator(&self) -> Result<Self::Iter>;

    /// Make everything durable and release the engine
    fn close(self) -> Result<()>;
}
