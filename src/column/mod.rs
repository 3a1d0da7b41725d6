//! Column Module
//!
//! A column pairs one base-engine index with one value log. Values go to
//! the log; the index maps each key to a 16-byte [`Pointer`](crate::vlog::Pointer).
//!
//! ## Write path (one segment)
//! ```text
//! sorted (key, value) ──► ValueLog file N ──► (key, pointer) pairs
//!                                                   │
//!                                                   ▼
//!                                         BaseEngine::bulk_insert
//! ```
//!
//! ## Read path
//! ```text
//! key ──► index.get ──► pointer ──► ValueLog::read ──► value
//! ```

mod lazy_iter;
mod vlog_column;

pub use lazy_iter::LazyValueIterator;
pub use vlog_column::{ColumnState, TableSummary, VlogColumn};
