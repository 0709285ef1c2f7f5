//! Per-run index width selection.

use crate::error::{MatrixError, Result};

/// Smallest byte width in {1,2,4,8} that holds `max_value`.
///
/// Bounds are inclusive: 255, 65535, and 4294967295 still fit 1, 2, and 4
/// bytes respectively.
#[inline]
pub fn width_for(max_value: u64) -> usize {
    if max_value <= u8::MAX as u64 {
        1
    } else if max_value <= u16::MAX as u64 {
        2
    } else if max_value <= u32::MAX as u64 {
        4
    } else {
        8
    }
}

/// Validates a width byte read from an untrusted run header.
pub fn validate_width(width: u8) -> Result<usize> {
    match width {
        1 | 2 | 4 | 8 => Ok(width as usize),
        _ => Err(MatrixError::CorruptStream(format!(
            "invalid index width {width} (expected 1, 2, 4, or 8)"
        ))),
    }
}
