//! Uncompressed exchange forms: CSC arrays, plus traits for feeding dense
//! input in and draining decompressed output out.

use crate::error::{MatrixError, Result};
use crate::value::{MatrixIndex, MatrixValue};

/// Compressed sparse column arrays, the interchange format compression
/// starts from and decompression returns to.
///
/// `col_pointers` has one entry per column plus a trailing total, so column
/// `j` owns `values[col_pointers[j]..col_pointers[j + 1]]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CscMatrix<T, I> {
    pub rows: usize,
    pub cols: usize,
    pub values: Vec<T>,
    pub row_indices: Vec<I>,
    pub col_pointers: Vec<I>,
}

impl<T: MatrixValue, I: MatrixIndex> CscMatrix<T, I> {
    /// Checks the structural shape of the arrays: pointer count, pointer
    /// monotonicity, and array lengths. Row bounds and duplicate
    /// coordinates are validated when the matrix is compressed.
    pub fn new(
        rows: usize,
        cols: usize,
        values: Vec<T>,
        row_indices: Vec<I>,
        col_pointers: Vec<I>,
    ) -> Result<Self> {
        if col_pointers.len() != cols + 1 {
            return Err(MatrixError::DimensionMismatch(format!(
                "expected {} column pointers for {} columns, got {}",
                cols + 1,
                cols,
                col_pointers.len()
            )));
        }
        if col_pointers[0].to_usize() != 0 {
            return Err(MatrixError::DimensionMismatch(
                "column pointers must start at zero".to_string(),
            ));
        }
        for pair in col_pointers.windows(2) {
            if pair[1] < pair[0] {
                return Err(MatrixError::DimensionMismatch(
                    "column pointers must not decrease".to_string(),
                ));
            }
        }
        let total = col_pointers[cols].to_usize();
        if total != values.len() || total != row_indices.len() {
            return Err(MatrixError::DimensionMismatch(format!(
                "column pointers end at {} but {} values and {} row indices were given",
                total,
                values.len(),
                row_indices.len()
            )));
        }
        Ok(CscMatrix {
            rows,
            cols,
            values,
            row_indices,
            col_pointers,
        })
    }

    /// Stored coefficients.
    pub fn nnz(&self) -> usize {
        self.values.len()
    }
}

/// Column access over a dense operand. Implementations yield each column's
/// nonzero entries in ascending row order.
pub trait DenseSource<T> {
    fn rows(&self) -> usize;
    fn cols(&self) -> usize;
    /// Append `(row, value)` pairs for column `col` to `out`, ascending by
    /// row and skipping zeros where cheap (remaining zeros are dropped by
    /// the encoder).
    fn column_entries(&self, col: usize, out: &mut Vec<(usize, T)>);
}

/// Receiver for decompressed coefficients, in no particular order.
pub trait MatrixSink<T> {
    fn set_dims(&mut self, rows: usize, cols: usize);
    fn insert(&mut self, row: usize, col: usize, value: T);
}

/// Column-major dense buffer. Doubles as a [`DenseSource`] for building
/// compressed matrices and a [`MatrixSink`] for materializing them.
#[derive(Debug, Clone, PartialEq)]
pub struct Dense<T> {
    rows: usize,
    cols: usize,
    data: Vec<T>,
}

impl<T: MatrixValue> Dense<T> {
    pub fn zeros(rows: usize, cols: usize) -> Self {
        Dense {
            rows,
            cols,
            data: vec![T::zero(); rows * cols],
        }
    }

    pub fn from_fn(rows: usize, cols: usize, mut f: impl FnMut(usize, usize) -> T) -> Self {
        let mut data = Vec::with_capacity(rows * cols);
        for col in 0..cols {
            for row in 0..rows {
                data.push(f(row, col));
            }
        }
        Dense { rows, cols, data }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Panics if `row` or `col` is out of range.
    pub fn get(&self, row: usize, col: usize) -> T {
        assert!(row < self.rows && col < self.cols);
        self.data[col * self.rows + row]
    }

    /// Panics if `row` or `col` is out of range.
    pub fn set(&mut self, row: usize, col: usize, value: T) {
        assert!(row < self.rows && col < self.cols);
        self.data[col * self.rows + row] = value;
    }

    /// Column-major backing storage.
    pub fn as_slice(&self) -> &[T] {
        &self.data
    }

    pub(crate) fn column(&self, col: usize) -> &[T] {
        &self.data[col * self.rows..(col + 1) * self.rows]
    }
}

impl<T: MatrixValue> DenseSource<T> for Dense<T> {
    fn rows(&self) -> usize {
        self.rows
    }

    fn cols(&self) -> usize {
        self.cols
    }

    fn column_entries(&self, col: usize, out: &mut Vec<(usize, T)>) {
        for (row, &value) in self.column(col).iter().enumerate() {
            if !value.is_zero() {
                out.push((row, value));
            }
        }
    }
}

impl<T: MatrixValue> MatrixSink<T> for Dense<T> {
    fn set_dims(&mut self, rows: usize, cols: usize) {
        self.rows = rows;
        self.cols = cols;
        self.data.clear();
        self.data.resize(rows * cols, T::zero());
    }

    fn insert(&mut self, row: usize, col: usize, value: T) {
        self.set(row, col, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csc_shape_checks() {
        let ok = CscMatrix::<i32, u32>::new(3, 2, vec![1, 2], vec![0, 2], vec![0, 1, 2]);
        assert!(ok.is_ok());

        let bad_len = CscMatrix::<i32, u32>::new(3, 2, vec![1, 2], vec![0, 2], vec![0, 2]);
        assert!(bad_len.is_err());

        let decreasing = CscMatrix::<i32, u32>::new(3, 2, vec![1, 2], vec![0, 2], vec![0, 2, 1]);
        assert!(decreasing.is_err());

        let short_values = CscMatrix::<i32, u32>::new(3, 2, vec![1], vec![0, 2], vec![0, 1, 2]);
        assert!(short_values.is_err());
    }

    #[test]
    fn dense_round_trips_through_source_and_sink() {
        let dense = Dense::from_fn(3, 2, |r, c| if r == c { 1i32 } else { 0 });
        let mut entries = Vec::new();
        dense.column_entries(0, &mut entries);
        assert_eq!(entries, vec![(0, 1)]);

        let mut sink = Dense::zeros(0, 0);
        sink.set_dims(3, 2);
        sink.insert(2, 1, 9);
        assert_eq!(sink.get(2, 1), 9);
        assert_eq!(sink.get(0, 0), 0);
    }
}
