//! WAL Reader
//!
//! Handles reading entries from the WAL file.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::error::Result;
use crate::record_log::LogReader;

use super::WalEntry;

/// Reads entries from the WAL file
pub struct WalReader {
    log: LogReader<BufReader<File>>,
}

impl WalReader {
    /// Open a WAL file for reading
    pub fn open(path: &Path, verify_checksums: bool) -> Result<Self> {
        let file = File::open(path)?;
        Ok(Self {
            log: LogReader::new(BufReader::new(file), 0, verify_checksums)?,
        })
    }

    /// Read the next entry from the WAL
    ///
    /// A damaged record is reported as an error; the reader stays usable and
    /// the next call continues after it.
    pub fn next_entry(&mut self) -> Result<Option<WalEntry>> {
        match self.log.read_record()? {
            Some(payload) => WalEntry::deserialize(&payload).map(Some),
            None => Ok(None),
        }
    }

    /// Iterate over all entries
    pub fn entries(self) -> WalIterator {
        WalIterator {
            reader: self,
            done: false,
        }
    }
}

/// Iterator over WAL entries
pub struct WalIterator {
    reader: WalReader,
    done: bool,
}

impl Iterator for WalIterator {
    type Item = Result<WalEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.reader.next_entry() {
            Ok(Some(entry)) => Some(Ok(entry)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}
