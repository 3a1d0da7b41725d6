//! Write-Ahead Log (WAL) Module
//!
//! Provides durability for writes that have not reached an SSTable yet.
//!
//! ## Responsibilities
//! - Append log entries before any mutation
//! - Log Sequence Numbers (LSN) for ordering
//! - Crash recovery and replay
//!
//! ## File Format
//! Entries are bincode-encoded and stored as records of a record log, which
//! supplies framing and CRC32C checksums:
//! ```text
//! ┌──────────────────── block ────────────────────┐
//! │ [hdr][WalEntry] [hdr][WalEntry] ... [trailer] │
//! └───────────────────────────────────────────────┘
//! WalEntry = { lsn: u64, operation: Put | Delete, timestamp: u64 }
//! ```

mod entry;
mod writer;
mod reader;
mod recovery;

pub use entry::{WalEntry, Operation};
pub use writer::WalWriter;
pub use reader::{WalReader, WalIterator};
pub use recovery::{WalRecovery, RecoveryResult};
