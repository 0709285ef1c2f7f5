//! Physical storage formats shared by the encoder and the read side.
//!
//! Two column layouts exist behind one iterator interface:
//!
//! - **Packed** ("IVCSC"): each column is one self-delimiting byte stream of
//!   runs, `<value><indexWidth><first><delta...><zero terminator>`, with the
//!   index width chosen per run.
//! - **Counted** ("VCSC"): each column is three parallel arrays (unique
//!   values, per-value counts, flattened ascending indices), no packing.
//!
//! A column with no stored coefficients is always the `None` marker, never a
//! zero-length allocation.

pub mod cursor;
pub mod metadata;
pub mod width;

use crate::error::{MatrixError, Result};
use crate::value::{MatrixIndex, MatrixValue};

/// Physical column layout, chosen once when a matrix is built.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Layout {
    /// Byte-packed delta-encoded run streams (schema level 3).
    Packed,
    /// Value-count-index parallel arrays (schema level 2).
    Counted,
}

impl Layout {
    /// Wire tag stored in the file header's first field.
    pub fn schema_level(self) -> u32 {
        match self {
            Layout::Counted => 2,
            Layout::Packed => 3,
        }
    }

    pub fn from_schema_level(level: u32) -> Option<Self> {
        match level {
            2 => Some(Layout::Counted),
            3 => Some(Layout::Packed),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Layout::Packed => "packed",
            Layout::Counted => "counted",
        }
    }
}

/// Major iteration order: which axis the column stores run along.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MajorOrder {
    ColumnMajor,
    RowMajor,
}

impl MajorOrder {
    pub fn is_column_major(self) -> bool {
        matches!(self, MajorOrder::ColumnMajor)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MajorOrder::ColumnMajor => "column-major",
            MajorOrder::RowMajor => "row-major",
        }
    }
}

/// One nonempty column in the counted layout.
///
/// `counts[i]` indices starting at `sum(counts[..i])` in `indices` belong to
/// `values[i]`; indices ascend strictly within each run.
#[derive(Debug, Clone, PartialEq)]
pub struct CountedColumn<T, I> {
    values: Vec<T>,
    counts: Vec<I>,
    indices: Vec<I>,
}

impl<T: MatrixValue, I: MatrixIndex> CountedColumn<T, I> {
    pub(crate) fn new(values: Vec<T>, counts: Vec<I>, indices: Vec<I>) -> Self {
        debug_assert_eq!(values.len(), counts.len());
        Self {
            values,
            counts,
            indices,
        }
    }

    /// Unique stored values, in run order.
    pub fn values(&self) -> &[T] {
        &self.values
    }

    /// Per-run index counts, parallel to `values`.
    pub fn counts(&self) -> &[I] {
        &self.counts
    }

    /// Flattened ascending indices of every run, concatenated in run order.
    pub fn indices(&self) -> &[I] {
        &self.indices
    }

    pub(crate) fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }

    /// Split borrow for in-place traversal: mutable values, shared counts
    /// and indices.
    pub(crate) fn parts_mut(&mut self) -> (&mut [T], &[I], &[I]) {
        (&mut self.values, &self.counts, &self.indices)
    }

    /// Stored coefficients in this column.
    pub fn nonzeros(&self) -> usize {
        self.indices.len()
    }

    /// Payload bytes across the three arrays.
    pub fn byte_size(&self) -> usize {
        self.values.len() * T::WIDTH + (self.counts.len() + self.indices.len()) * I::WIDTH
    }

    /// Structural validation used at the file trust boundary: counts are
    /// nonzero and sum to the index total, and indices stay in bounds and
    /// strictly ascend within each run.
    pub(crate) fn validate(&self, inner_dim: usize) -> Result<()> {
        if self.values.is_empty() || self.values.len() != self.counts.len() {
            return Err(MatrixError::CorruptStream(format!(
                "counted column has {} values for {} counts",
                self.values.len(),
                self.counts.len()
            )));
        }
        let mut at = 0usize;
        for (run, count) in self.counts.iter().enumerate() {
            let count = count.to_usize();
            if count == 0 {
                return Err(MatrixError::CorruptStream(format!(
                    "counted column run {run} has zero count"
                )));
            }
            if at + count > self.indices.len() {
                return Err(MatrixError::CorruptStream(format!(
                    "counted column counts exceed {} stored indices",
                    self.indices.len()
                )));
            }
            let mut prev: Option<usize> = None;
            for idx in &self.indices[at..at + count] {
                let idx = idx.to_usize();
                if idx >= inner_dim {
                    return Err(MatrixError::CorruptStream(format!(
                        "counted column index {idx} outside inner dimension {inner_dim}"
                    )));
                }
                if let Some(p) = prev {
                    if idx <= p {
                        return Err(MatrixError::CorruptStream(format!(
                            "counted column run {run} indices not strictly ascending ({p} then {idx})"
                        )));
                    }
                }
                prev = Some(idx);
            }
            at += count;
        }
        if at != self.indices.len() {
            return Err(MatrixError::CorruptStream(format!(
                "counted column counts sum to {at} but {} indices stored",
                self.indices.len()
            )));
        }
        Ok(())
    }
}
