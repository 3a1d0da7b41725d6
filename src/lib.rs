//! # vlogkv
//!
//! A key-value store that keeps values out of its sorted index:
//! - Values live in append-only, checksummed value-log files
//! - The LSM index stores only 16-byte pointers, so compaction moves
//!   pointers instead of value bytes
//! - Keys are routed across independently recovered columns
//! - Single-writer/multi-reader concurrency model
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       ColumnarDb                            │
//! │          write buffer (WAL + MemTable) + selector           │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ flush: one segment per column
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │ VlogColumn  │   ...    │ VlogColumn  │
//!   └──────┬──────┘          └─────────────┘
//!          │
//!    ┌─────┴───────────────┐
//!    ▼                     ▼
//! ┌──────────────┐  ┌──────────────┐
//! │  Value Log   │  │  LSM Index   │
//! │ (record log) │  │ key → Pointer│
//! └──────────────┘  └──────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod config;
pub mod env;
pub mod coding;

pub mod record_log;
pub mod wal;
pub mod memtable;
pub mod storage;
pub mod index;
pub mod vlog;
pub mod column;
pub mod db;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use error::{Result, VlogError};
pub use config::{Config, WalSyncStrategy};
pub use column::{ColumnState, LazyValueIterator, TableSummary, VlogColumn};
pub use db::{ColumnSelector, ColumnarDb, HashSelector, SingleColumn};
pub use index::{BaseEngine, IndexIterator, LsmIndex};
pub use vlog::{Pointer, ValueLog};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of vlogkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
