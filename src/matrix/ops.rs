//! Arithmetic over compressed matrices.
//!
//! Everything here works through the column cursors, so costs scale with
//! stored coefficients rather than the dense extent. Axis reductions fan
//! out over the rayon pool for wide matrices; reductions across the storage
//! axis accumulate through per-slot locks.

use parking_lot::Mutex;
use rayon::prelude::*;

use crate::encode::matrix::DEFAULT_PARALLEL_THRESHOLD;
use crate::error::{MatrixError, Result};
use crate::format::MajorOrder;
use crate::matrix::csc::Dense;
use crate::matrix::SparseMatrix;
use crate::value::{MatrixIndex, MatrixValue};

impl<T: MatrixValue, I: MatrixIndex> SparseMatrix<T, I> {
    /// Multiply every stored coefficient in place. Each run's value is
    /// rewritten exactly once; indices and structure stay put, so scaling
    /// by zero stores explicit zero runs rather than emptying the matrix.
    pub fn scale(&mut self, factor: T) -> Result<()> {
        for outer in 0..self.outer_dim() {
            let mut it = self.outer_iter_mut(outer)?;
            while it.has_more() {
                if it.is_new_run() {
                    let scaled = it.value() * factor;
                    it.set_value(scaled);
                }
                it.advance()?;
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

    /// Matrix-vector product `y = A x`.
    pub fn matvec(&self, x: &[T]) -> Result<Vec<T>> {
        if x.len() != self.cols() {
            return Err(MatrixError::DimensionMismatch(format!(
                "operand of length {} against {} columns",
                x.len(),
                self.cols()
            )));
        }
        let mut y = vec![T::zero(); self.rows()];
        for outer in 0..self.outer_dim() {
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                y[it.row()] += it.value() * x[it.col()];
                it.advance()?;
            }
        }
        Ok(y)
    }

    /// Matrix product against a dense right-hand side, one output column
    /// per operand column.
    pub fn matmul_dense(&self, rhs: &Dense<T>) -> Result<Dense<T>> {
        if rhs.rows() != self.cols() {
            return Err(MatrixError::DimensionMismatch(format!(
                "operand with {} rows against {} columns",
                rhs.rows(),
                self.cols()
            )));
        }
        let columns: Vec<Vec<T>> = if rhs.cols() >= DEFAULT_PARALLEL_THRESHOLD {
            let results: Vec<Result<Vec<T>>> = (0..rhs.cols())
                .into_par_iter()
                .map(|j| self.matvec(rhs.column(j)))
                .collect();
            let mut columns = Vec::with_capacity(results.len());
            for result in results {
                columns.push(result?);
            }
            columns
        } else {
            (0..rhs.cols())
                .map(|j| self.matvec(rhs.column(j)))
                .collect::<Result<_>>()?
        };
        Ok(Dense::from_fn(self.rows(), rhs.cols(), |r, c| {
            columns[c][r]
        }))
    }

    /// One reduction value per outer slot.
    fn fold_outer<F>(&self, combine: F) -> Result<Vec<T>>
    where
        F: Fn(&mut T, T) + Sync,
    {
        let fold_one = |outer: usize| -> Result<T> {
            let mut acc = T::zero();
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                combine(&mut acc, it.value());
                it.advance()?;
            }
            Ok(acc)
        };
        if self.outer_dim() >= DEFAULT_PARALLEL_THRESHOLD {
            let results: Vec<Result<T>> =
                (0..self.outer_dim()).into_par_iter().map(fold_one).collect();
            let mut out = Vec::with_capacity(results.len());
            for result in results {
                out.push(result?);
            }
            Ok(out)
        } else {
            (0..self.outer_dim()).map(fold_one).collect()
        }
    }

    /// One reduction value per inner position, accumulated across every
    /// outer slot. The parallel path guards each accumulator with a lock;
    /// reductions must therefore be order-independent.
    fn fold_inner<F>(&self, combine: F) -> Result<Vec<T>>
    where
        F: Fn(&mut T, T) + Sync,
    {
        if self.outer_dim() >= DEFAULT_PARALLEL_THRESHOLD {
            let acc: Vec<Mutex<T>> = (0..self.inner_dim()).map(|_| Mutex::new(T::zero())).collect();
            let results: Vec<Result<()>> = (0..self.outer_dim())
                .into_par_iter()
                .map(|outer| {
                    let mut it = self.outer_iter(outer)?;
                    while it.has_more() {
                        let mut slot = acc[it.index()].lock();
                        combine(&mut *slot, it.value());
                        drop(slot);
                        it.advance()?;
                    }
                    Ok(())
                })
                .collect();
            for result in results {
                result?;
            }
            Ok(acc.into_iter().map(|slot| slot.into_inner()).collect())
        } else {
            let mut acc = vec![T::zero(); self.inner_dim()];
            for outer in 0..self.outer_dim() {
                let mut it = self.outer_iter(outer)?;
                while it.has_more() {
                    combine(&mut acc[it.index()], it.value());
                    it.advance()?;
                }
            }
            Ok(acc)
        }
    }

    fn fold_axis<F>(&self, along_cols: bool, combine: F) -> Result<Vec<T>>
    where
        F: Fn(&mut T, T) + Sync,
    {
        let along_outer = match self.order() {
            MajorOrder::ColumnMajor => along_cols,
            MajorOrder::RowMajor => !along_cols,
        };
        if along_outer {
            self.fold_outer(combine)
        } else {
            self.fold_inner(combine)
        }
    }

    /// Sum of every stored coefficient.
    pub fn sum(&self) -> Result<T> {
        let per_outer = self.fold_outer(|acc, v| *acc += v)?;
        let mut total = T::zero();
        for v in per_outer {
            total += v;
        }
        Ok(total)
    }

    /// Per-column sums.
    pub fn col_sums(&self) -> Result<Vec<T>> {
        self.fold_axis(true, |acc, v| *acc += v)
    }

    /// Per-row sums.
    pub fn row_sums(&self) -> Result<Vec<T>> {
        self.fold_axis(false, |acc, v| *acc += v)
    }

    /// Per-column maxima over the stored coefficients, starting from zero.
    /// A column whose coefficients are all negative reports zero.
    pub fn col_maxes(&self) -> Result<Vec<T>> {
        self.fold_axis(true, |acc, v| {
            if v > *acc {
                *acc = v;
            }
        })
    }

    /// Per-row maxima, zero-initialized like [`col_maxes`](Self::col_maxes).
    pub fn row_maxes(&self) -> Result<Vec<T>> {
        self.fold_axis(false, |acc, v| {
            if v > *acc {
                *acc = v;
            }
        })
    }

    /// Per-column minima over the stored coefficients, starting from zero.
    /// A column whose coefficients are all positive reports zero.
    pub fn col_mins(&self) -> Result<Vec<T>> {
        self.fold_axis(true, |acc, v| {
            if v < *acc {
                *acc = v;
            }
        })
    }

    /// Per-row minima, zero-initialized like [`col_mins`](Self::col_mins).
    pub fn row_mins(&self) -> Result<Vec<T>> {
        self.fold_axis(false, |acc, v| {
            if v < *acc {
                *acc = v;
            }
        })
    }

    /// Sum of the main diagonal. Square matrices only.
    pub fn trace(&self) -> Result<T> {
        if self.rows() != self.cols() {
            return Err(MatrixError::DimensionMismatch(format!(
                "trace of a {}x{} matrix",
                self.rows(),
                self.cols()
            )));
        }
        let mut total = T::zero();
        for k in 0..self.rows() {
            total += self.coeff(k, k)?;
        }
        Ok(total)
    }

    /// Frobenius norm: the square root of the sum of squared coefficients.
    pub fn frobenius_norm(&self) -> Result<f64> {
        let mut total = 0.0f64;
        for outer in 0..self.outer_dim() {
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                let v = it.value().to_f64().unwrap_or(0.0);
                total += v * v;
                it.advance()?;
            }
        }
        Ok(total.sqrt())
    }

    /// Euclidean norm of one outer slot.
    pub fn vector_length(&self, outer: usize) -> Result<f64> {
        let mut total = 0.0f64;
        let mut it = self.outer_iter(outer)?;
        while it.has_more() {
            let v = it.value().to_f64().unwrap_or(0.0);
            total += v * v;
            it.advance()?;
        }
        Ok(total.sqrt())
    }
}
