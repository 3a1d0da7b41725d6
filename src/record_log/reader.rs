//! Record Log Reader
//!
//! Reads chunks block by block and reassembles logical records.

use std::io::{ErrorKind, Read, Seek, SeekFrom};

use crate::error::{Result, VlogError};

use super::{chunk_crc, unmask_crc, RecordType, BLOCK_SIZE, HEADER_SIZE};

/// Reads logical records back from a framed log
///
/// Corruption is reported per record: after an `Err` the reader has skipped
/// the damaged bytes and the next call continues with what follows.
pub struct LogReader<R: Read + Seek> {
    src: R,
    verify_checksums: bool,
    /// Unread part of the current block lives in `buf[cursor..]`
    buf: Vec<u8>,
    cursor: usize,
    /// File offset the next fill starts reading at
    next_read_offset: u64,
    /// Source returned fewer bytes than asked for
    eof: bool,
    last_record_offset: u64,
}

impl<R: Read + Seek> LogReader<R> {
    /// Reader starting at the first block boundary at or after `initial_offset`
    pub fn new(src: R, initial_offset: u64, verify_checksums: bool) -> Result<Self> {
        let block = BLOCK_SIZE as u64;
        let aligned = initial_offset.div_ceil(block) * block;
        Self::at_record(src, aligned, verify_checksums)
    }

    /// Reader positioned exactly at `offset`, which must be where a record
    /// was started by the writer (the value of `LogWriter::current_offset()`
    /// just before that record was added)
    pub fn at_record(mut src: R, offset: u64, verify_checksums: bool) -> Result<Self> {
        src.seek(SeekFrom::Start(offset))?;
        Ok(Self {
            src,
            verify_checksums,
            buf: Vec::with_capacity(BLOCK_SIZE),
            cursor: 0,
            next_read_offset: offset,
            eof: false,
            last_record_offset: offset,
        })
    }

    /// File offset of the first chunk of the record last returned
    pub fn last_record_offset(&self) -> u64 {
        self.last_record_offset
    }

    /// Read the next logical record; `Ok(None)` at end of log.
    ///
    /// A record cut short by the end of the file (a torn final write) is
    /// treated as end of log, not as corruption.
    pub fn read_record(&mut self) -> Result<Option<Vec<u8>>> {
        let mut scratch: Vec<u8> = Vec::new();
        let mut in_fragmented_record = false;

        loop {
            let Some((record_type, payload, chunk_offset)) = self.read_physical()? else {
                return Ok(None);
            };

            match record_type {
                RecordType::Full => {
                    if in_fragmented_record {
                        return Err(VlogError::Corruption(
                            "partial record without end".into(),
                        ));
                    }
                    self.last_record_offset = chunk_offset;
                    return Ok(Some(payload));
                }
                RecordType::First => {
                    if in_fragmented_record {
                        return Err(VlogError::Corruption(
                            "partial record without end".into(),
                        ));
                    }
                    self.last_record_offset = chunk_offset;
                    scratch = payload;
                    in_fragmented_record = true;
                }
                RecordType::Middle => {
                    if !in_fragmented_record {
                        return Err(VlogError::Corruption(
                            "missing start of fragmented record".into(),
                        ));
                    }
                    scratch.extend_from_slice(&payload);
                }
                RecordType::Last => {
                    if !in_fragmented_record {
                        return Err(VlogError::Corruption(
                            "missing start of fragmented record".into(),
                        ));
                    }
                    scratch.extend_from_slice(&payload);
                    return Ok(Some(scratch));
                }
                // Only an empty zero chunk is padding
                RecordType::Zero => {
                    return Err(VlogError::Corruption(format!(
                        "zero-type chunk with {} byte payload",
                        payload.len()
                    )));
                }
            }
        }
    }

    /// File offset of `buf[cursor]`
    fn cursor_offset(&self) -> u64 {
        self.next_read_offset - (self.buf.len() - self.cursor) as u64
    }

    /// Next chunk and its file offset, skipping trailers and zero padding.
    /// `Ok(None)` at end of log.
    fn read_physical(&mut self) -> Result<Option<(RecordType, Vec<u8>, u64)>> {
        loop {
            let remaining = self.buf.len() - self.cursor;
            if remaining < HEADER_SIZE {
                if self.eof {
                    // Clean end, or a header cut off by a crash
                    self.cursor = self.buf.len();
                    return Ok(None);
                }
                // Trailer padding (or nothing buffered yet)
                self.fill_block()?;
                continue;
            }

            let header = &self.buf[self.cursor..self.cursor + HEADER_SIZE];
            let masked_crc = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
            let length = u16::from_le_bytes([header[4], header[5]]) as usize;
            let type_byte = header[6];

            if HEADER_SIZE + length > remaining {
                self.cursor = self.buf.len();
                if self.eof {
                    // Writer died in the middle of this chunk
                    return Ok(None);
                }
                return Err(VlogError::Corruption(format!(
                    "bad record length {} with {} bytes left in block",
                    length,
                    remaining - HEADER_SIZE
                )));
            }

            if type_byte == RecordType::Zero as u8 && length == 0 {
                // Preallocated space: nothing more in this block
                self.cursor = self.buf.len();
                continue;
            }

            let start = self.cursor + HEADER_SIZE;
            let end = start + length;

            let record_type = match RecordType::try_from(type_byte) {
                Ok(t) => t,
                Err(e) => {
                    self.cursor = end;
                    return Err(e);
                }
            };

            if self.verify_checksums {
                let expected = unmask_crc(masked_crc);
                let actual = chunk_crc(record_type, &self.buf[start..end]);
                if expected != actual {
                    // The length field may be damaged too; drop the block
                    self.cursor = self.buf.len();
                    return Err(VlogError::Corruption(format!(
                        "checksum mismatch: expected {:#010x}, got {:#010x}",
                        expected, actual
                    )));
                }
            }

            let offset = self.cursor_offset();
            let payload = self.buf[start..end].to_vec();
            self.cursor = end;
            return Ok(Some((record_type, payload, offset)));
        }
    }

    /// Load the rest of the block that `next_read_offset` falls in
    fn fill_block(&mut self) -> Result<()> {
        let want = BLOCK_SIZE - (self.next_read_offset % BLOCK_SIZE as u64) as usize;
        self.buf.clear();
        self.buf.resize(want, 0);
        self.cursor = 0;

        let mut filled = 0;
        while filled < want {
            match self.src.read(&mut self.buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    self.buf.clear();
                    return Err(e.into());
                }
            }
        }

        self.buf.truncate(filled);
        self.next_read_offset += filled as u64;
        if filled < want {
            self.eof = true;
        }
        Ok(())
    }
}
