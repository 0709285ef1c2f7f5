//! Sparse vectors: a single compressed column with a length.

use std::fmt;

use crate::encode::column::{build_counted, encode_packed};
use crate::encode::matrix::{check_dims, normalize_column};
use crate::encode::runs::group_runs;
use crate::error::{MatrixError, Result};
use crate::format::{CountedColumn, Layout, MajorOrder};
use crate::read::ColumnIter;
use crate::value::{MatrixIndex, MatrixValue};

/// One compressed column, either layout. `None` means no stored
/// coefficients.
#[derive(Clone)]
pub(crate) enum VectorColumn<T, I> {
    Packed(Option<Box<[u8]>>),
    Counted(Option<CountedColumn<T, I>>),
}

/// A length-`n` sparse vector stored as one compressed column.
///
/// Vectors come out of [`SparseMatrix::vector_at`](crate::SparseMatrix::vector_at)
/// and go back in through [`SparseMatrix::append`](crate::SparseMatrix::append).
#[derive(Clone)]
pub struct SparseVector<T: MatrixValue, I: MatrixIndex = u32> {
    layout: Layout,
    length: usize,
    nnz: usize,
    col: VectorColumn<T, I>,
}

impl<T: MatrixValue, I: MatrixIndex> SparseVector<T, I> {
    /// Compress `(index, value)` entries into a vector of dimension
    /// `length`. Entries may arrive unsorted; duplicates and out-of-range
    /// indices are rejected, zeros dropped.
    pub fn from_entries(length: usize, entries: &[(usize, T)], layout: Layout) -> Result<Self> {
        check_dims::<I>(length, 1)?;
        let entries =
            normalize_column(entries.to_vec(), length, 0, MajorOrder::ColumnMajor)?;
        let nnz = entries.len();
        let runs = group_runs(&entries);
        let col = match layout {
            Layout::Packed => VectorColumn::Packed(encode_packed(&runs)?),
            Layout::Counted => VectorColumn::Counted(build_counted(&runs)?),
        };
        Ok(SparseVector {
            layout,
            length,
            nnz,
            col,
        })
    }

    pub(crate) fn from_parts(
        layout: Layout,
        length: usize,
        nnz: usize,
        col: VectorColumn<T, I>,
    ) -> Self {
        SparseVector {
            layout,
            length,
            nnz,
            col,
        }
    }

    pub(crate) fn store(&self) -> &VectorColumn<T, I> {
        &self.col
    }

    /// Dimension of the vector.
    pub fn len(&self) -> usize {
        self.length
    }

    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Stored coefficients.
    pub fn nonzeros(&self) -> usize {
        self.nnz
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    /// Compressed payload bytes.
    pub fn byte_size(&self) -> usize {
        match &self.col {
            VectorColumn::Packed(col) => col.as_ref().map_or(0, |b| b.len()),
            VectorColumn::Counted(col) => col.as_ref().map_or(0, |c| c.byte_size()),
        }
    }

    /// Cursor over the stored coefficients, ascending within each run.
    pub fn iter(&self) -> Result<ColumnIter<'_, T, I>> {
        match &self.col {
            VectorColumn::Packed(col) => {
                ColumnIter::from_packed(col.as_deref(), 0, MajorOrder::ColumnMajor)
            }
            VectorColumn::Counted(col) => Ok(ColumnIter::from_counted(
                col.as_ref(),
                0,
                MajorOrder::ColumnMajor,
            )),
        }
    }

    /// Coefficient at `index`, zero when no entry is stored there.
    pub fn coeff(&self, index: usize) -> Result<T> {
        if index >= self.length {
            return Err(MatrixError::IndexOutOfBounds(format!(
                "index {} out of range for a vector of length {}",
                index, self.length
            )));
        }
        let mut it = self.iter()?;
        while it.has_more() {
            if it.index() == index {
                return Ok(it.value());
            }
            it.advance()?;
        }
        Ok(T::zero())
    }

    /// Decode to sorted `(index, value)` entries.
    pub fn entries(&self) -> Result<Vec<(usize, T)>> {
        let mut out = Vec::with_capacity(self.nnz);
        let mut it = self.iter()?;
        while it.has_more() {
            out.push((it.index(), it.value()));
            it.advance()?;
        }
        out.sort_unstable_by_key(|&(index, _)| index);
        Ok(out)
    }

    /// Sum of stored coefficients.
    pub fn sum(&self) -> Result<T> {
        let mut total = T::zero();
        let mut it = self.iter()?;
        while it.has_more() {
            total += it.value();
            it.advance()?;
        }
        Ok(total)
    }

    /// Euclidean norm of the vector.
    pub fn norm(&self) -> Result<f64> {
        let mut total = 0.0f64;
        let mut it = self.iter()?;
        while it.has_more() {
            let v = it.value().to_f64().unwrap_or(0.0);
            total += v * v;
            it.advance()?;
        }
        Ok(total.sqrt())
    }

    /// Multiply every stored coefficient in place. Each run's value is
    /// rewritten once; indices and structure stay put.
    pub fn scale(&mut self, factor: T) -> Result<()> {
        match &mut self.col {
            VectorColumn::Packed(col) => {
                let mut it = crate::read::packed::PackedIterMut::<T>::new(col.as_deref_mut())?;
                while it.has_more() {
                    if it.first_of_run() {
                        let scaled = it.value() * factor;
                        it.set_value(scaled);
                    }
                    it.advance()?;
                }
            }
            VectorColumn::Counted(col) => {
                if let Some(col) = col.as_mut() {
                    for value in col.values_mut() {
                        *value *= factor;
                    }
                }
            }
        }
        Ok(())
    }

    /// Scaled copy.
    pub fn scaled(&self, factor: T) -> Result<Self> {
        let mut out = self.clone();
        out.scale(factor)?;
        Ok(out)
    }
}

impl<T: MatrixValue, I: MatrixIndex> PartialEq for SparseVector<T, I> {
    fn eq(&self, other: &Self) -> bool {
        if self.length != other.length || self.nnz != other.nnz {
            return false;
        }
        match (self.entries(), other.entries()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: MatrixValue, I: MatrixIndex> fmt::Debug for SparseVector<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseVector")
            .field("layout", &self.layout.as_str())
            .field("length", &self.length)
            .field("nnz", &self.nnz)
            .field("bytes", &self.byte_size())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_and_reads_back() {
        let v = SparseVector::<i32, u32>::from_entries(10, &[(7, 2), (1, 5), (3, 2)], Layout::Packed)
            .expect("vector");
        assert_eq!(v.len(), 10);
        assert_eq!(v.nonzeros(), 3);
        assert_eq!(v.coeff(1).expect("coeff"), 5);
        assert_eq!(v.coeff(3).expect("coeff"), 2);
        assert_eq!(v.coeff(0).expect("coeff"), 0);
        assert!(v.coeff(10).is_err());
        assert_eq!(v.entries().expect("entries"), vec![(1, 5), (3, 2), (7, 2)]);
    }

    #[test]
    fn layouts_compare_equal() {
        let entries = [(0usize, 4i32), (4, 4), (9, 1)];
        let packed =
            SparseVector::<i32, u32>::from_entries(12, &entries, Layout::Packed).expect("packed");
        let counted =
            SparseVector::<i32, u32>::from_entries(12, &entries, Layout::Counted).expect("counted");
        assert_eq!(packed, counted);
        assert_eq!(packed.sum().expect("sum"), 9);
    }

    #[test]
    fn scale_rewrites_runs_in_place() {
        for layout in [Layout::Packed, Layout::Counted] {
            let mut v = SparseVector::<i32, u32>::from_entries(6, &[(0, 2), (3, 2), (5, 7)], layout)
                .expect("vector");
            v.scale(3).expect("scale");
            assert_eq!(v.entries().expect("entries"), vec![(0, 6), (3, 6), (5, 21)]);
            assert_eq!(v.nonzeros(), 3);
        }
    }

    #[test]
    fn norm_matches_hand_computation() {
        let v = SparseVector::<f64, u32>::from_entries(4, &[(0, 3.0), (2, 4.0)], Layout::Counted)
            .expect("vector");
        assert!((v.norm().expect("norm") - 5.0).abs() < 1e-12);
    }

    #[test]
    fn zero_length_vector() {
        let v = SparseVector::<i32, u32>::from_entries(0, &[], Layout::Packed).expect("vector");
        assert!(v.is_empty());
        assert_eq!(v.nonzeros(), 0);
        assert_eq!(v.byte_size(), 0);
        assert!(!v.iter().expect("iter").has_more());
    }
}
