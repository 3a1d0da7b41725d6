//! Varint encoding for value-log records
//!
//! varint32: LEB128-style, 7 bits per byte, low bits first, at most 5 bytes.

use bytes::BufMut;

/// Longest varint32 encoding
pub const MAX_VARINT32_LEN: usize = 5;

/// Append `value` as a varint32
pub fn put_varint32(dst: &mut Vec<u8>, mut value: u32) {
    while value >= 0x80 {
        dst.put_u8((value as u8) | 0x80);
        value >>= 7;
    }
    dst.put_u8(value as u8);
}

/// Decode a varint32 from the front of `src`.
///
/// Returns the value and the number of bytes consumed, or `None` if `src`
/// ends mid-varint or the encoding overflows 32 bits.
pub fn get_varint32(src: &[u8]) -> Option<(u32, usize)> {
    let mut result: u32 = 0;
    for (i, &byte) in src.iter().enumerate().take(MAX_VARINT32_LEN) {
        let bits = u32::from(byte & 0x7F);
        // 5th byte may only carry the top 4 bits
        if i == MAX_VARINT32_LEN - 1 && bits > 0x0F {
            return None;
        }
        result |= bits << (7 * i);
        if byte & 0x80 == 0 {
            return Some((result, i + 1));
        }
    }
    None
}

/// Number of bytes `value` takes as a varint32
pub const fn varint32_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0xFFF_FFFF => 4,
        _ => 5,
    }
}
