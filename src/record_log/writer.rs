//! Record Log Writer
//!
//! Splits logical records into block-aligned chunks and appends them.

use crate::env::WritableFile;
use crate::error::{Result, VlogError};

use super::{chunk_crc, mask_crc, RecordType, BLOCK_SIZE, HEADER_SIZE};

const TRAILER: [u8; HEADER_SIZE] = [0u8; HEADER_SIZE];

/// Appends framed records to a destination
///
/// Each chunk (together with any trailer padding in front of it) reaches the
/// destination in a single `write_all`.
///
/// A failed write or sync may leave part of a chunk in the destination, so
/// the writer's idea of block alignment can no longer be trusted: every
/// later call fails too. Start a new writer over a fresh destination.
pub struct LogWriter<W: WritableFile> {
    dest: W,
    /// Offset inside the block currently being written
    block_offset: usize,
    /// Absolute offset of the next byte written
    offset: u64,
    failed: bool,
}

impl<W: WritableFile> LogWriter<W> {
    /// Writer for an empty destination
    pub fn new(dest: W) -> Self {
        Self {
            dest,
            block_offset: 0,
            offset: 0,
            failed: false,
        }
    }

    /// Offset the next record will start at (before any trailer padding)
    pub fn current_offset(&self) -> u64 {
        self.offset
    }

    /// Append one logical record
    pub fn add_record(&mut self, data: &[u8]) -> Result<()> {
        self.check_usable()?;

        let mut left = data;
        let mut begin = true;

        loop {
            let mut chunk = Vec::with_capacity(HEADER_SIZE + left.len().min(BLOCK_SIZE));

            let leftover = BLOCK_SIZE - self.block_offset;
            if leftover < HEADER_SIZE {
                // Not even a header fits: pad the block out
                chunk.extend_from_slice(&TRAILER[..leftover]);
                self.block_offset = 0;
            }

            let available = BLOCK_SIZE - self.block_offset - HEADER_SIZE;
            let fragment_len = left.len().min(available);
            let end = fragment_len == left.len();

            let record_type = match (begin, end) {
                (true, true) => RecordType::Full,
                (true, false) => RecordType::First,
                (false, true) => RecordType::Last,
                (false, false) => RecordType::Middle,
            };

            let (fragment, rest) = left.split_at(fragment_len);
            self.emit(&mut chunk, record_type, fragment)?;

            left = rest;
            begin = false;
            if end {
                return Ok(());
            }
        }
    }

    /// Flush and force written data to stable storage
    pub fn sync(&mut self) -> Result<()> {
        self.check_usable()?;
        if let Err(e) = self.dest.sync() {
            self.failed = true;
            return Err(e.into());
        }
        Ok(())
    }

    /// Whether an earlier write or sync failed
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Borrow the destination
    pub fn get_ref(&self) -> &W {
        &self.dest
    }

    /// Give back the destination
    pub fn into_inner(self) -> W {
        self.dest
    }

    fn emit(&mut self, chunk: &mut Vec<u8>, record_type: RecordType, payload: &[u8]) -> Result<()> {
        debug_assert!(payload.len() <= u16::MAX as usize);
        debug_assert!(self.block_offset + HEADER_SIZE + payload.len() <= BLOCK_SIZE);

        let crc = mask_crc(chunk_crc(record_type, payload));
        chunk.extend_from_slice(&crc.to_le_bytes());
        chunk.extend_from_slice(&(payload.len() as u16).to_le_bytes());
        chunk.push(record_type as u8);
        chunk.extend_from_slice(payload);

        if let Err(e) = self.dest.write_all(&chunk[..]) {
            self.failed = true;
            return Err(e.into());
        }

        self.block_offset += HEADER_SIZE + payload.len();
        self.offset += chunk.len() as u64;
        Ok(())
    }

    fn check_usable(&self) -> Result<()> {
        if self.failed {
            return Err(VlogError::InvalidState(
                "log writer failed earlier; its destination may hold a partial chunk".to_string(),
            ));
        }
        Ok(())
    }
}
