//! Bounds-checked little-endian primitives over column byte buffers.
//!
//! Every byte read or write in the packed layout goes through this module:
//! the run-stream encoder and iterator never index buffers directly, so the
//! pointer arithmetic the format needs lives in one small, heavily tested
//! place.

use crate::error::{MatrixError, Result};
use crate::value::MatrixValue;

pub(crate) fn corrupt(msg: impl Into<String>) -> MatrixError {
    MatrixError::CorruptStream(msg.into())
}

/// Returns `data[start..start+len]` or a corrupt-stream error naming `what`.
pub(crate) fn checked_range<'a>(
    data: &'a [u8],
    start: usize,
    len: usize,
    what: &'static str,
) -> Result<&'a [u8]> {
    let end = start
        .checked_add(len)
        .ok_or_else(|| corrupt(format!("{what}: range overflow")))?;
    if end > data.len() {
        return Err(corrupt(format!("{what}: extends past end of column")));
    }
    Ok(&data[start..end])
}

/// Reads an unsigned integer of `width` bytes (1, 2, 4, or 8) at `pos`.
#[inline]
pub(crate) fn read_uint(data: &[u8], pos: usize, width: usize, what: &'static str) -> Result<u64> {
    let bytes = checked_range(data, pos, width, what)?;
    Ok(match width {
        1 => bytes[0] as u64,
        2 => u16::from_le_bytes(bytes.try_into().unwrap()) as u64,
        4 => u32::from_le_bytes(bytes.try_into().unwrap()) as u64,
        8 => u64::from_le_bytes(bytes.try_into().unwrap()),
        _ => return Err(corrupt(format!("{what}: invalid width {width}"))),
    })
}

/// Appends `value` as `width` little-endian bytes.
///
/// `width` comes from [`crate::format::width::width_for`], so `value` always
/// fits; the truncating cast is checked in debug builds.
#[inline]
pub(crate) fn write_uint(out: &mut Vec<u8>, value: u64, width: usize) {
    debug_assert!(matches!(width, 1 | 2 | 4 | 8), "width {width}");
    debug_assert!(
        width == 8 || value < (1u64 << (width * 8)),
        "{value} does not fit {width} bytes"
    );
    match width {
        1 => out.push(value as u8),
        2 => out.extend_from_slice(&(value as u16).to_le_bytes()),
        4 => out.extend_from_slice(&(value as u32).to_le_bytes()),
        _ => out.extend_from_slice(&value.to_le_bytes()),
    }
}

/// Reads one coefficient at `pos`.
#[inline]
pub(crate) fn read_value<T: MatrixValue>(
    data: &[u8],
    pos: usize,
    what: &'static str,
) -> Result<T> {
    let bytes = checked_range(data, pos, T::WIDTH, what)?;
    Ok(T::read_le(bytes))
}
