//! WAL Recovery
//!
//! Handles crash recovery by replaying the WAL.

use std::path::Path;

use crate::error::{Result, VlogError};

use super::{WalEntry, WalReader};

/// Handles WAL recovery after crash
pub struct WalRecovery;

/// Result of a recovery operation
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecoveryResult {
    /// Number of entries successfully recovered
    pub entries_recovered: u64,

    /// Number of corrupted entries skipped
    pub entries_corrupted: u64,

    /// Last valid LSN
    pub last_lsn: u64,
}

impl WalRecovery {
    /// Recover entries from a WAL file
    ///
    /// This will:
    /// 1. Read all valid entries
    /// 2. Detect and skip corrupted entries
    /// 3. Stop at a torn final write
    /// 4. Return all valid entries in order
    ///
    /// A missing file recovers to nothing.
    pub fn recover(path: &Path) -> Result<(Vec<WalEntry>, RecoveryResult)> {
        let mut entries = Vec::new();
        let result = Self::scan(path, |entry| entries.push(entry))?;
        Ok((entries, result))
    }

    /// Verify integrity of a WAL file without modifying it
    pub fn verify(path: &Path) -> Result<RecoveryResult> {
        Self::scan(path, |_| {})
    }

    fn scan(path: &Path, mut on_entry: impl FnMut(WalEntry)) -> Result<RecoveryResult> {
        let mut result = RecoveryResult::default();
        if !path.exists() {
            return Ok(result);
        }

        let mut reader = WalReader::open(path, true)?;
        loop {
            match reader.next_entry() {
                Ok(Some(entry)) => {
                    result.entries_recovered += 1;
                    result.last_lsn = result.last_lsn.max(entry.lsn);
                    on_entry(entry);
                }
                Ok(None) => break,
                Err(e @ (VlogError::Corruption(_) | VlogError::Serialization(_))) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping corrupted WAL record");
                    result.entries_corrupted += 1;
                }
                Err(e) => return Err(e),
            }
        }
        Ok(result)
    }
}
