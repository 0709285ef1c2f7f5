//! Value and index type parameters for the matrix containers.
//!
//! `MatrixValue` is implemented for the fixed-width primitives a matrix can
//! store (integers up to 64 bits and both IEEE floats). It carries the wire
//! width, the float/signed tags baked into file metadata, little-endian
//! codecs, and a canonical 64-bit key used to group equal values into runs.
//!
//! `MatrixIndex` is implemented for the unsigned types usable as stored
//! index words in the value-count-index layout and in file size tables.

use std::fmt;

use num_traits::{Num, NumAssignOps, ToPrimitive};

/// A storable matrix coefficient type.
pub trait MatrixValue:
    Copy
    + PartialEq
    + PartialOrd
    + fmt::Debug
    + fmt::Display
    + Num
    + NumAssignOps
    + ToPrimitive
    + Send
    + Sync
    + 'static
{
    /// Encoded width in bytes (`sizeof` on the wire).
    const WIDTH: usize;
    /// True for `f32`/`f64`.
    const IS_FLOAT: bool;
    /// True for signed integers and floats.
    const IS_SIGNED: bool;

    /// Appends the little-endian encoding to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Writes the little-endian encoding into `buf`, which must be exactly
    /// `WIDTH` bytes.
    fn to_le(self, buf: &mut [u8]);

    /// Decodes from `buf`, which the caller has already checked to be
    /// exactly `WIDTH` bytes.
    fn read_le(buf: &[u8]) -> Self;

    /// Canonical bit pattern widened to 64 bits.
    ///
    /// Run grouping keys on this rather than on `PartialEq`, so coefficients
    /// share a run exactly when their stored bits match. NaNs with one
    /// payload group together, and bit-for-bit storage is what keeps float
    /// round-trips lossless.
    fn bit_key(self) -> u64;
}

macro_rules! impl_int_value {
    ($t:ty, $signed:expr) => {
        impl MatrixValue for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            const IS_FLOAT: bool = false;
            const IS_SIGNED: bool = $signed;

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn to_le(self, buf: &mut [u8]) {
                buf.copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(buf: &[u8]) -> Self {
                // Length checked by the caller.
                <$t>::from_le_bytes(buf.try_into().unwrap())
            }

            #[inline]
            fn bit_key(self) -> u64 {
                self as u64
            }
        }
    };
}

impl_int_value!(u8, false);
impl_int_value!(u16, false);
impl_int_value!(u32, false);
impl_int_value!(u64, false);
impl_int_value!(i8, true);
impl_int_value!(i16, true);
impl_int_value!(i32, true);
impl_int_value!(i64, true);

macro_rules! impl_float_value {
    ($t:ty) => {
        impl MatrixValue for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();
            const IS_FLOAT: bool = true;
            const IS_SIGNED: bool = true;

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn to_le(self, buf: &mut [u8]) {
                buf.copy_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(buf: &[u8]) -> Self {
                // Length checked by the caller.
                <$t>::from_le_bytes(buf.try_into().unwrap())
            }

            #[inline]
            fn bit_key(self) -> u64 {
                self.to_bits() as u64
            }
        }
    };
}

impl_float_value!(f32);
impl_float_value!(f64);

/// A stored index word type for the value-count-index layout.
pub trait MatrixIndex: Copy + Ord + Eq + fmt::Debug + Send + Sync + 'static {
    /// Encoded width in bytes (`sizeof` on the wire).
    const WIDTH: usize;

    const ZERO: Self;

    /// Narrowing conversion; `None` when `v` exceeds the type's range.
    fn from_usize(v: usize) -> Option<Self>;

    fn to_usize(self) -> usize;

    /// Appends the little-endian encoding to `out`.
    fn write_le(self, out: &mut Vec<u8>);

    /// Decodes from `buf`, which the caller has already checked to be
    /// exactly `WIDTH` bytes.
    fn read_le(buf: &[u8]) -> Self;
}

macro_rules! impl_index {
    ($t:ty) => {
        impl MatrixIndex for $t {
            const WIDTH: usize = std::mem::size_of::<$t>();

            const ZERO: Self = 0;

            #[inline]
            fn from_usize(v: usize) -> Option<Self> {
                <$t>::try_from(v).ok()
            }

            #[inline]
            fn to_usize(self) -> usize {
                self as usize
            }

            #[inline]
            fn write_le(self, out: &mut Vec<u8>) {
                out.extend_from_slice(&self.to_le_bytes());
            }

            #[inline]
            fn read_le(buf: &[u8]) -> Self {
                // Length checked by the caller.
                <$t>::from_le_bytes(buf.try_into().unwrap())
            }
        }
    };
}

impl_index!(u8);
impl_index!(u16);
impl_index!(u32);
impl_index!(u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_round_trips_le() {
        let mut buf = Vec::new();
        (-7i32).write_le(&mut buf);
        assert_eq!(buf.len(), 4);
        assert_eq!(i32::read_le(&buf), -7);
    }

    #[test]
    fn float_round_trips_le() {
        let mut buf = Vec::new();
        1.5f64.write_le(&mut buf);
        assert_eq!(buf.len(), 8);
        assert_eq!(f64::read_le(&buf), 1.5);
    }

    #[test]
    fn to_le_overwrites_in_place() {
        let mut buf = [0u8; 2];
        MatrixValue::to_le(0xBEEFu16, &mut buf);
        assert_eq!(<u16 as MatrixValue>::read_le(&buf), 0xBEEF);
    }

    #[test]
    fn signed_bit_keys_distinguish_sign() {
        assert_ne!((-1i8).bit_key(), 1i8.bit_key());
        assert_eq!((-1i8).bit_key(), u64::MAX);
    }

    #[test]
    fn float_bit_keys_are_exact() {
        assert_ne!((-0.0f64).bit_key(), 0.0f64.bit_key());
        assert_eq!(2.5f32.bit_key(), 2.5f32.bit_key());
        assert_ne!(2.5f32.bit_key(), 2.5000002f32.bit_key());
    }

    #[test]
    fn index_narrowing_is_checked() {
        assert_eq!(u8::from_usize(255), Some(255u8));
        assert_eq!(u8::from_usize(256), None);
        assert_eq!(u16::from_usize(70_000), None);
        assert_eq!(u64::from_usize(70_000), Some(70_000u64));
    }

    #[test]
    fn type_tags_match_widths() {
        assert_eq!(<i64 as MatrixValue>::WIDTH, 8);
        assert!(<f32 as MatrixValue>::IS_FLOAT);
        assert!(<i16 as MatrixValue>::IS_SIGNED);
        assert!(!<u32 as MatrixValue>::IS_SIGNED);
        assert!(<f64 as MatrixValue>::IS_SIGNED);
        assert_eq!(<u16 as MatrixIndex>::WIDTH, 2);
    }
}
