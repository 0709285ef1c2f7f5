//! Storage statistics and human-readable rendering.

use std::fmt;

use serde::Serialize;
use tracing::warn;

use crate::error::Result;
use crate::matrix::{ColumnStore, SparseMatrix};
use crate::value::{MatrixIndex, MatrixValue};

/// Snapshot of a matrix's shape and storage cost. Serializes to JSON for
/// logs and benchmark fixtures.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MatrixStats {
    pub layout: &'static str,
    pub order: &'static str,
    pub rows: usize,
    pub cols: usize,
    pub nnz: usize,
    /// Stored runs across all columns; the redundancy the compression
    /// exploits shows up as `nnz / runs`.
    pub runs: usize,
    pub compressed_bytes: usize,
    /// What a dense buffer of the same shape would take.
    pub dense_bytes: usize,
    pub density: f64,
}

impl<T: MatrixValue, I: MatrixIndex> SparseMatrix<T, I> {
    /// Total stored runs across all columns.
    pub fn run_count(&self) -> Result<usize> {
        match self.store() {
            ColumnStore::Counted(cols) => Ok(cols
                .iter()
                .map(|col| col.as_ref().map_or(0, |c| c.values().len()))
                .sum()),
            ColumnStore::Packed(_) => {
                let mut runs = 0;
                for outer in 0..self.outer_dim() {
                    let mut it = self.outer_iter(outer)?;
                    while it.has_more() {
                        if it.is_new_run() {
                            runs += 1;
                        }
                        it.advance()?;
                    }
                }
                Ok(runs)
            }
        }
    }

    pub fn stats(&self) -> Result<MatrixStats> {
        let cells = self.rows() as f64 * self.cols() as f64;
        Ok(MatrixStats {
            layout: self.layout().as_str(),
            order: self.order().as_str(),
            rows: self.rows(),
            cols: self.cols(),
            nnz: self.nnz(),
            runs: self.run_count()?,
            compressed_bytes: self.byte_size(),
            dense_bytes: self.rows().saturating_mul(self.cols()).saturating_mul(T::WIDTH),
            density: if cells == 0.0 {
                0.0
            } else {
                self.nnz() as f64 / cells
            },
        })
    }

    pub fn stats_json(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.stats()?)?)
    }
}

/// Render as a value grid for small matrices, a one-line summary otherwise.
impl<T: MatrixValue, I: MatrixIndex> fmt::Display for SparseMatrix<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const GRID_LIMIT: usize = 128;
        writeln!(
            f,
            "{} {} matrix, {}x{}, {} nnz, {} bytes",
            self.layout().as_str(),
            self.order().as_str(),
            self.rows(),
            self.cols(),
            self.nnz(),
            self.byte_size()
        )?;
        if self.rows() > GRID_LIMIT || self.cols() > GRID_LIMIT {
            return Ok(());
        }
        match self.to_dense() {
            Ok(dense) => {
                for row in 0..self.rows() {
                    for col in 0..self.cols() {
                        if col > 0 {
                            write!(f, " ")?;
                        }
                        write!(f, "{}", dense.get(row, col))?;
                    }
                    writeln!(f)?;
                }
                Ok(())
            }
            Err(err) => {
                warn!(%err, "matrix failed to decode while rendering");
                writeln!(f, "<undecodable>")
            }
        }
    }
}
