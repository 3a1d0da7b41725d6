//! Record Log Module
//!
//! Block-structured, checksummed append log. Record semantics belong to the
//! callers: the base engine's WAL stores serialized entries in it, the value
//! log stores key/value records.
//!
//! ## File Format
//! ```text
//! ┌──────────────────────── block (32 KiB) ────────────────────────┐
//! │ chunk │ chunk │ ... │ chunk │ trailer (< 7 bytes, zero-filled) │
//! └────────────────────────────────────────────────────────────────┘
//!
//! chunk:
//! ┌──────────────┬─────────────┬──────────┬───────────────┐
//! │ masked CRC(4)│ length (2)  │ type (1) │ payload       │
//! └──────────────┴─────────────┴──────────┴───────────────┘
//! ```
//!
//! A logical record that does not fit in the rest of the current block is
//! split into FIRST, MIDDLE*, LAST chunks. The CRC is CRC32C over the type
//! byte followed by the payload, masked so that a CRC of data that itself
//! contains CRCs stays well distributed.

mod reader;
mod writer;

pub use reader::LogReader;
pub use writer::LogWriter;

use crate::error::{Result, VlogError};

/// Size of one block
pub const BLOCK_SIZE: usize = 32 * 1024;

/// CRC (4) + length (2) + type (1)
pub const HEADER_SIZE: usize = 4 + 2 + 1;

const MASK_DELTA: u32 = 0xa282_ead8;

/// Chunk type stored in each physical header
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum RecordType {
    /// Reserved for preallocated (zeroed) space
    Zero = 0,
    Full = 1,
    First = 2,
    Middle = 3,
    Last = 4,
}

impl TryFrom<u8> for RecordType {
    type Error = VlogError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(RecordType::Zero),
            1 => Ok(RecordType::Full),
            2 => Ok(RecordType::First),
            3 => Ok(RecordType::Middle),
            4 => Ok(RecordType::Last),
            other => Err(VlogError::Corruption(format!(
                "unknown record type {}",
                other
            ))),
        }
    }
}

/// Masked representation of a CRC
pub fn mask_crc(crc: u32) -> u32 {
    crc.rotate_right(15).wrapping_add(MASK_DELTA)
}

/// Inverse of [`mask_crc`]
pub fn unmask_crc(masked: u32) -> u32 {
    masked.wrapping_sub(MASK_DELTA).rotate_left(15)
}

/// Checksum stored in a chunk header, before masking
pub(crate) fn chunk_crc(record_type: RecordType, payload: &[u8]) -> u32 {
    let crc = crc32c::crc32c(&[record_type as u8]);
    crc32c::crc32c_append(crc, payload)
}
