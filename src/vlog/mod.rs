//! Value Log Module
//!
//! Holds the bytes of every value, leaving only a fixed-size [`Pointer`] in
//! the index.
//!
//! ## Layout
//! ```text
//! {column}/vlog/
//!   000001.vlog   ← one file per successful segment build
//!   000002.vlog
//!   ...
//!
//! each file is a record log (see `record_log`) of:
//!   varint32(key_len) | key | varint32(value_len) | value
//! ```
//!
//! A pointer becomes visible to readers only after its record has been
//! appended and synced, so every pointer the index can return resolves.
//! The reverse does not hold: records from a segment build that failed
//! before publishing its pointers stay in the log, unreferenced.

mod pointer;
pub mod record;
mod value_log;

pub use pointer::Pointer;
pub use value_log::{ValueLog, ValueLogWriter};
