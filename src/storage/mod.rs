//! Storage Module
//!
//! Persistent storage layer of the index: immutable sorted tables.
//!
//! ## Responsibilities
//! - Persist data to disk in sorted format
//! - Point lookups newest → oldest
//! - Atomic publication of new tables (tmp file + rename)
//! - Full-merge compaction
//!
//! ## File Layout
//! ```text
//! {index}/sstables/
//!   sstable_000001.sst
//!   sstable_000002.sst
//!   sstable_000003.sst.tmp   ← interrupted publish, removed at recovery
//! ```

mod sstable;
mod manager;

pub use sstable::{SSTable, SSTableBuilder, SSTableIterator, SSTableReader};
pub use manager::{StorageManager, TableSnapshot};
