//! Snapshot iterator
//!
//! Materialized, sorted copy of the live entries of an index.

use crate::error::Result;

use super::IndexIterator;

/// Iterator over a frozen list of `(key, value)` pairs
///
/// Entries must be sorted by key without duplicates. Starts unpositioned.
#[derive(Debug, Clone, Default)]
pub struct SnapshotIterator {
    entries: Vec<(Vec<u8>, Vec<u8>)>,
    pos: Option<usize>,
}

impl SnapshotIterator {
    pub fn new(entries: Vec<(Vec<u8>, Vec<u8>)>) -> Self {
        debug_assert!(entries.windows(2).all(|w| w[0].0 < w[1].0));
        Self { entries, pos: None }
    }

    /// Number of entries in the snapshot
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn current(&self) -> Option<&(Vec<u8>, Vec<u8>)> {
        self.pos.and_then(|p| self.entries.get(p))
    }
}

impl IndexIterator for SnapshotIterator {
    fn valid(&self) -> bool {
        self.current().is_some()
    }

    fn seek_to_first(&mut self) {
        self.pos = if self.entries.is_empty() { None } else { Some(0) };
    }

    fn seek_to_last(&mut self) {
        self.pos = self.entries.len().checked_sub(1);
    }

    fn seek(&mut self, target: &[u8]) {
        let idx = self.entries.partition_point(|(k, _)| k.as_slice() < target);
        self.pos = (idx < self.entries.len()).then_some(idx);
    }

    fn next(&mut self) {
        let len = self.entries.len();
        self.pos = self.pos.and_then(|p| (p + 1 < len).then_some(p + 1));
    }

    fn prev(&mut self) {
        self.pos = self.pos.and_then(|p| p.checked_sub(1));
    }

    fn key(&self) -> &[u8] {
        self.current().map(|(k, _)| k.as_slice()).unwrap_or(&[])
    }

    fn value(&self) -> &[u8] {
        self.current().map(|(_, v)| v.as_slice()).unwrap_or(&[])
    }

    fn status(&self) -> Result<()> {
        Ok(())
    }
}
