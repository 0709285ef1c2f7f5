//! Fixed-width matrix file header.
//!
//! Every serialized matrix starts with six little-endian `u32` fields. There
//! are no magic bytes; the schema level and the type tags are the only
//! self-description the format carries, so loading validates all of them
//! against the instantiated types before trusting anything else.

use crate::error::{MatrixError, Result};
use crate::format::cursor::checked_range;
use crate::format::{Layout, MajorOrder};
use crate::value::{MatrixIndex, MatrixValue};

/// Number of `u32` header fields.
pub const NUM_META_FIELDS: usize = 6;

/// Header size in bytes.
pub const METADATA_LEN: usize = NUM_META_FIELDS * 4;

/// Serialized matrix header.
///
/// ## Wire layout (24 bytes, little-endian)
///
/// ```text
/// schema_level: u32  [0..4]    2 = counted layout, 3 = packed layout
/// inner_dim:    u32  [4..8]
/// outer_dim:    u32  [8..12]
/// nnz:          u32  [12..16]
/// value_tag:    u32  [16..20]  sizeof | is_float << 8 | is_signed << 16 | col_major << 24
/// index_tag:    u32  [20..24]  sizeof of the stored index word
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metadata {
    pub schema_level: u32,
    pub inner_dim: u32,
    pub outer_dim: u32,
    pub nnz: u32,
    pub value_tag: u32,
    pub index_tag: u32,
}

/// Packs the value-type tag byte fields.
pub fn encode_value_tag<T: MatrixValue>(order: MajorOrder) -> u32 {
    T::WIDTH as u32
        | (T::IS_FLOAT as u32) << 8
        | (T::IS_SIGNED as u32) << 16
        | (order.is_column_major() as u32) << 24
}

impl Metadata {
    pub fn new<T: MatrixValue, I: MatrixIndex>(
        layout: Layout,
        order: MajorOrder,
        inner_dim: usize,
        outer_dim: usize,
        nnz: usize,
    ) -> Result<Self> {
        let field = |name: &'static str, v: usize| -> Result<u32> {
            u32::try_from(v).map_err(|_| {
                MatrixError::DimensionMismatch(format!(
                    "{name} {v} exceeds the u32 file header field"
                ))
            })
        };
        Ok(Self {
            schema_level: layout.schema_level(),
            inner_dim: field("inner dimension", inner_dim)?,
            outer_dim: field("outer dimension", outer_dim)?,
            nnz: field("nnz", nnz)?,
            value_tag: encode_value_tag::<T>(order),
            index_tag: I::WIDTH as u32,
        })
    }

    pub fn write_le(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.schema_level.to_le_bytes());
        out.extend_from_slice(&self.inner_dim.to_le_bytes());
        out.extend_from_slice(&self.outer_dim.to_le_bytes());
        out.extend_from_slice(&self.nnz.to_le_bytes());
        out.extend_from_slice(&self.value_tag.to_le_bytes());
        out.extend_from_slice(&self.index_tag.to_le_bytes());
    }

    pub fn read_le(buf: &[u8]) -> Result<Self> {
        let buf = checked_range(buf, 0, METADATA_LEN, "matrix header")?;
        Ok(Self {
            schema_level: u32::from_le_bytes(buf[0..4].try_into().unwrap()),
            inner_dim: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
            outer_dim: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
            nnz: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
            value_tag: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
            index_tag: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
        })
    }

    pub fn layout(&self) -> Result<Layout> {
        Layout::from_schema_level(self.schema_level).ok_or_else(|| {
            MatrixError::UnsupportedValueType(format!(
                "unknown schema level {} (expected 2 or 3)",
                self.schema_level
            ))
        })
    }

    pub fn major_order(&self) -> MajorOrder {
        if (self.value_tag >> 24) & 0xFF != 0 {
            MajorOrder::ColumnMajor
        } else {
            MajorOrder::RowMajor
        }
    }

    /// Always-on type check at the file trust boundary: the stored tags must
    /// describe exactly the `T` and `I` the caller instantiated.
    pub fn validate_types<T: MatrixValue, I: MatrixIndex>(&self) -> Result<()> {
        let size = (self.value_tag & 0xFF) as usize;
        let is_float = (self.value_tag >> 8) & 0xFF != 0;
        let is_signed = (self.value_tag >> 16) & 0xFF != 0;
        if size != T::WIDTH || is_float != T::IS_FLOAT || is_signed != T::IS_SIGNED {
            return Err(MatrixError::UnsupportedValueType(format!(
                "file stores {}-byte {}{} values but the matrix was instantiated \
                 with {}-byte {}{} values",
                size,
                if is_signed { "signed " } else { "unsigned " },
                if is_float { "float" } else { "integer" },
                T::WIDTH,
                if T::IS_SIGNED { "signed " } else { "unsigned " },
                if T::IS_FLOAT { "float" } else { "integer" },
            )));
        }
        if self.index_tag as usize != I::WIDTH {
            return Err(MatrixError::UnsupportedValueType(format!(
                "file stores {}-byte index words but the matrix was instantiated \
                 with {}-byte index words",
                self.index_tag,
                I::WIDTH
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_meta() -> Metadata {
        Metadata::new::<f64, u32>(Layout::Packed, MajorOrder::ColumnMajor, 100, 40, 73).unwrap()
    }

    #[test]
    fn header_round_trips() {
        let meta = make_meta();
        let mut buf = Vec::new();
        meta.write_le(&mut buf);
        assert_eq!(buf.len(), METADATA_LEN);
        assert_eq!(Metadata::read_le(&buf).unwrap(), meta);
    }

    #[test]
    fn value_tag_packs_fields() {
        let meta = make_meta();
        assert_eq!(meta.value_tag & 0xFF, 8);
        assert_eq!((meta.value_tag >> 8) & 0xFF, 1, "f64 is float");
        assert_eq!((meta.value_tag >> 16) & 0xFF, 1, "f64 is signed");
        assert_eq!((meta.value_tag >> 24) & 0xFF, 1, "column major");
        assert_eq!(meta.major_order(), MajorOrder::ColumnMajor);

        let row = Metadata::new::<u8, u16>(Layout::Counted, MajorOrder::RowMajor, 3, 3, 0).unwrap();
        assert_eq!(row.value_tag & 0xFF, 1);
        assert_eq!((row.value_tag >> 8) & 0xFF, 0);
        assert_eq!((row.value_tag >> 16) & 0xFF, 0);
        assert_eq!(row.major_order(), MajorOrder::RowMajor);
        assert_eq!(row.index_tag, 2);
    }

    #[test]
    fn type_validation_catches_mismatches() {
        let meta = make_meta();
        assert!(meta.validate_types::<f64, u32>().is_ok());
        assert!(meta.validate_types::<f32, u32>().is_err(), "wrong width");
        assert!(meta.validate_types::<u64, u32>().is_err(), "wrong float tag");
        assert!(meta.validate_types::<i64, u32>().is_err(), "ints are not floats");
        assert!(meta.validate_types::<f64, u16>().is_err(), "wrong index width");
    }

    #[test]
    fn unknown_schema_level_is_rejected() {
        let mut meta = make_meta();
        meta.schema_level = 1;
        assert!(matches!(
            meta.layout(),
            Err(MatrixError::UnsupportedValueType(_))
        ));
        meta.schema_level = 3;
        assert_eq!(meta.layout().unwrap(), Layout::Packed);
    }

    #[test]
    fn oversized_dims_fail_header_construction() {
        let err = Metadata::new::<u8, u64>(
            Layout::Packed,
            MajorOrder::ColumnMajor,
            u32::MAX as usize + 1,
            1,
            0,
        );
        assert!(matches!(err, Err(MatrixError::DimensionMismatch(_))));
    }

    #[test]
    fn truncated_header_is_corrupt() {
        let meta = make_meta();
        let mut buf = Vec::new();
        meta.write_le(&mut buf);
        assert!(Metadata::read_le(&buf[..METADATA_LEN - 1]).is_err());
    }
}
