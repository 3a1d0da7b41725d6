//! Value-log pointer
//!
//! The only thing the index stores for a key.

use std::fmt;

use bytes::{Buf, BufMut};

use crate::error::{Result, VlogError};

/// Location of a record in the value log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pointer {
    /// Value-log file the record lives in
    pub file_number: u64,
    /// Offset of the record inside that file
    pub offset: u64,
}

impl Pointer {
    /// Encoded size: file_number (8) + offset (8)
    pub const ENCODED_LEN: usize = 16;

    pub fn new(file_number: u64, offset: u64) -> Self {
        Self { file_number, offset }
    }

    /// `[0..8)` file number, `[8..16)` offset, both little-endian
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        let mut buf = &mut out[..];
        buf.put_u64_le(self.file_number);
        buf.put_u64_le(self.offset);
        out
    }

    /// Decode a pointer read back from the index
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() != Self::ENCODED_LEN {
            return Err(VlogError::Corruption(format!(
                "malformed value pointer: {} bytes, expected {}",
                bytes.len(),
                Self::ENCODED_LEN
            )));
        }
        let mut buf = bytes;
        let file_number = buf.get_u64_le();
        let offset = buf.get_u64_le();
        Ok(Self { file_number, offset })
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.file_number, self.offset)
    }
}
