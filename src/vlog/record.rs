//! Value-log record codec
//!
//! `varint32(key_len) | key | varint32(value_len) | value`

use crate::coding::{get_varint32, put_varint32, varint32_len};
use crate::error::{Result, VlogError};

/// Encode one key/value pair
pub fn encode(key: &[u8], value: &[u8]) -> Result<Vec<u8>> {
    let key_len = field_len(key, "key")?;
    let value_len = field_len(value, "value")?;

    let mut out = Vec::with_capacity(
        varint32_len(key_len) + key.len() + varint32_len(value_len) + value.len(),
    );
    put_varint32(&mut out, key_len);
    out.extend_from_slice(key);
    put_varint32(&mut out, value_len);
    out.extend_from_slice(value);
    Ok(out)
}

/// Decode a record into `(key, value)`
pub fn decode(record: &[u8]) -> Result<(Vec<u8>, Vec<u8>)> {
    let (key, rest) = length_prefixed(record, "key")?;
    let (value, rest) = length_prefixed(rest, "value")?;
    if !rest.is_empty() {
        return Err(VlogError::Corruption(format!(
            "{} trailing bytes after value-log record",
            rest.len()
        )));
    }
    Ok((key.to_vec(), value.to_vec()))
}

fn field_len(field: &[u8], what: &str) -> Result<u32> {
    u32::try_from(field.len()).map_err(|_| {
        VlogError::InvalidArgument(format!("{} of {} bytes is too large", what, field.len()))
    })
}

fn length_prefixed<'a>(src: &'a [u8], what: &str) -> Result<(&'a [u8], &'a [u8])> {
    let (len, consumed) = get_varint32(src)
        .ok_or_else(|| VlogError::Corruption(format!("bad {} length in value-log record", what)))?;
    let rest = &src[consumed..];
    let len = len as usize;
    if rest.len() < len {
        return Err(VlogError::Corruption(format!(
            "{} length {} exceeds record ({} bytes left)",
            what,
            len,
            rest.len()
        )));
    }
    Ok(rest.split_at(len))
}
