//! Whole-matrix encoding: input validation, per-outer entry lists, and the
//! fan-out that compresses every outer slot into the requested layout.
//!
//! All input paths funnel through [`normalize_column`], so the validation
//! rules are identical whether entries arrive as CSC arrays, coordinate
//! triplets, or a dense scan: indices in bounds, no duplicate coordinates,
//! explicit zeros dropped before any byte is written.

use rayon::prelude::*;
use tracing::{debug, debug_span};

use crate::encode::column::{build_counted, encode_packed};
use crate::encode::runs::{group_runs, Run};
use crate::error::{MatrixError, Result};
use crate::format::{Layout, MajorOrder};
use crate::matrix::csc::{CscMatrix, DenseSource};
use crate::matrix::ColumnStore;
use crate::value::{MatrixIndex, MatrixValue};

/// Outer-dimension size at which encoding fans out to the rayon pool.
/// Below this, per-column closures run inline on the calling thread.
pub(crate) const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Knobs for matrix construction. The defaults match the storage most
/// callers want: column-major slots, parallel encode for wide inputs.
#[derive(Debug, Clone)]
pub struct EncodeOptions {
    /// Storage axis. Column-major keeps one compressed slot per matrix
    /// column; row-major regroups entries so slots follow rows instead.
    pub order: MajorOrder,
    /// Minimum outer-dimension size before encoding uses the rayon pool.
    pub parallel_threshold: usize,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        EncodeOptions {
            order: MajorOrder::ColumnMajor,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl EncodeOptions {
    /// Store row-major: one compressed slot per matrix row.
    pub fn row_major(mut self) -> Self {
        self.order = MajorOrder::RowMajor;
        self
    }

    pub fn with_order(mut self, order: MajorOrder) -> Self {
        self.order = order;
        self
    }

    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }
}

/// Dimensions must fit the index type in play: inner indices and per-run
/// counts are stored as `I` on the counted layout, and both layouts record
/// dimensions in 32-bit metadata fields on disk.
pub(crate) fn check_dims<I: MatrixIndex>(inner_dim: usize, outer_dim: usize) -> Result<()> {
    if I::from_usize(inner_dim).is_none() {
        return Err(MatrixError::DimensionMismatch(format!(
            "inner dimension {} does not fit a {}-byte index type",
            inner_dim,
            I::WIDTH
        )));
    }
    if inner_dim > u32::MAX as usize || outer_dim > u32::MAX as usize {
        return Err(MatrixError::DimensionMismatch(format!(
            "dimensions {}x{} exceed the 32-bit metadata range",
            inner_dim, outer_dim
        )));
    }
    Ok(())
}

fn entry_coord(outer: usize, inner: usize, order: MajorOrder) -> (usize, usize) {
    match order {
        MajorOrder::ColumnMajor => (inner, outer),
        MajorOrder::RowMajor => (outer, inner),
    }
}

/// Sort one outer slot's entries by inner index, reject out-of-bounds and
/// duplicate coordinates, then drop explicit zeros. Duplicates are checked
/// on the raw coordinates so a zero/nonzero pair at the same position still
/// fails instead of silently resolving.
pub(crate) fn normalize_column<T: MatrixValue>(
    mut entries: Vec<(usize, T)>,
    inner_dim: usize,
    outer: usize,
    order: MajorOrder,
) -> Result<Vec<(usize, T)>> {
    for &(inner, _) in &entries {
        if inner >= inner_dim {
            let (row, col) = entry_coord(outer, inner, order);
            return Err(MatrixError::DimensionMismatch(format!(
                "entry at ({}, {}) lies outside the inner dimension {}",
                row, col, inner_dim
            )));
        }
    }
    entries.sort_unstable_by_key(|&(inner, _)| inner);
    for pair in entries.windows(2) {
        if pair[0].0 == pair[1].0 {
            let (row, col) = entry_coord(outer, pair[0].0, order);
            return Err(MatrixError::DimensionMismatch(format!(
                "duplicate entry at ({}, {})",
                row, col
            )));
        }
    }
    entries.retain(|&(_, value)| !value.is_zero());
    Ok(entries)
}

/// Regroup validated CSC arrays into per-outer entry lists for the chosen
/// storage order. The CSC struct has already checked pointer monotonicity
/// and array lengths; this pass owns bounds, duplicates, and zero dropping.
pub(crate) fn entry_lists_from_csc<T: MatrixValue, I: MatrixIndex>(
    csc: &CscMatrix<T, I>,
    order: MajorOrder,
) -> Result<Vec<Vec<(usize, T)>>> {
    let (inner_dim, outer_dim) = match order {
        MajorOrder::ColumnMajor => (csc.rows, csc.cols),
        MajorOrder::RowMajor => (csc.cols, csc.rows),
    };
    check_dims::<I>(inner_dim, outer_dim)?;

    let mut lists: Vec<Vec<(usize, T)>> = vec![Vec::new(); outer_dim];
    for col in 0..csc.cols {
        let start = csc.col_pointers[col].to_usize();
        let end = csc.col_pointers[col + 1].to_usize();
        for slot in start..end {
            let row = csc.row_indices[slot].to_usize();
            if row >= csc.rows {
                return Err(MatrixError::DimensionMismatch(format!(
                    "row index {} in column {} exceeds row count {}",
                    row, col, csc.rows
                )));
            }
            let value = csc.values[slot];
            match order {
                MajorOrder::ColumnMajor => lists[col].push((row, value)),
                MajorOrder::RowMajor => lists[row].push((col, value)),
            }
        }
    }
    lists
        .into_iter()
        .enumerate()
        .map(|(outer, entries)| normalize_column(entries, inner_dim, outer, order))
        .collect()
}

/// Regroup `(row, col, value)` triplets into per-outer entry lists.
pub(crate) fn entry_lists_from_triplets<T: MatrixValue, I: MatrixIndex>(
    rows: usize,
    cols: usize,
    triplets: &[(usize, usize, T)],
    order: MajorOrder,
) -> Result<Vec<Vec<(usize, T)>>> {
    let (inner_dim, outer_dim) = match order {
        MajorOrder::ColumnMajor => (rows, cols),
        MajorOrder::RowMajor => (cols, rows),
    };
    check_dims::<I>(inner_dim, outer_dim)?;

    let mut lists: Vec<Vec<(usize, T)>> = vec![Vec::new(); outer_dim];
    for &(row, col, value) in triplets {
        if row >= rows || col >= cols {
            return Err(MatrixError::DimensionMismatch(format!(
                "triplet ({}, {}) lies outside a {}x{} matrix",
                row, col, rows, cols
            )));
        }
        match order {
            MajorOrder::ColumnMajor => lists[col].push((row, value)),
            MajorOrder::RowMajor => lists[row].push((col, value)),
        }
    }
    lists
        .into_iter()
        .enumerate()
        .map(|(outer, entries)| normalize_column(entries, inner_dim, outer, order))
        .collect()
}

/// Scan a dense source column by column and regroup into per-outer lists.
/// Sources are expected to yield ascending, in-bounds rows; normalization
/// still re-checks rather than trusting the trait impl.
pub(crate) fn entry_lists_from_dense<S, T, I>(
    source: &S,
    order: MajorOrder,
) -> Result<Vec<Vec<(usize, T)>>>
where
    S: DenseSource<T> + ?Sized,
    T: MatrixValue,
    I: MatrixIndex,
{
    let rows = source.rows();
    let cols = source.cols();
    let (inner_dim, outer_dim) = match order {
        MajorOrder::ColumnMajor => (rows, cols),
        MajorOrder::RowMajor => (cols, rows),
    };
    check_dims::<I>(inner_dim, outer_dim)?;

    let mut lists: Vec<Vec<(usize, T)>> = vec![Vec::new(); outer_dim];
    let mut scratch = Vec::new();
    for col in 0..cols {
        scratch.clear();
        source.column_entries(col, &mut scratch);
        for &(row, value) in &scratch {
            if row >= rows {
                return Err(MatrixError::DimensionMismatch(format!(
                    "dense source yielded row {} in column {}, beyond {} rows",
                    row, col, rows
                )));
            }
            match order {
                MajorOrder::ColumnMajor => lists[col].push((row, value)),
                MajorOrder::RowMajor => lists[row].push((col, value)),
            }
        }
    }
    lists
        .into_iter()
        .enumerate()
        .map(|(outer, entries)| normalize_column(entries, inner_dim, outer, order))
        .collect()
}

/// Run a fallible per-column closure over every outer slot, fanning out to
/// the rayon pool once the slot count reaches `threshold`.
fn map_columns<In, Out, F>(items: &[In], threshold: usize, f: F) -> Result<Vec<Out>>
where
    In: Sync,
    Out: Send,
    F: Fn(&In) -> Result<Out> + Sync,
{
    if items.len() >= threshold {
        let results: Vec<Result<Out>> = items.par_iter().map(&f).collect();
        let mut out = Vec::with_capacity(results.len());
        for result in results {
            out.push(result?);
        }
        Ok(out)
    } else {
        items.iter().map(f).collect()
    }
}

/// Compress per-outer entry lists into a column store. Returns the store
/// together with its compressed payload size in bytes.
pub(crate) fn encode_store<T: MatrixValue, I: MatrixIndex>(
    columns: &[Vec<(usize, T)>],
    layout: Layout,
    threshold: usize,
) -> Result<(ColumnStore<T, I>, usize)> {
    let span = debug_span!("encode", layout = layout.as_str(), outer = columns.len());
    let _guard = span.enter();

    let store = match layout {
        Layout::Packed => {
            let encoded = map_columns(columns, threshold, |entries| {
                encode_packed(&group_runs(entries))
            })?;
            ColumnStore::Packed(encoded)
        }
        Layout::Counted => {
            let encoded = map_columns(columns, threshold, |entries| {
                build_counted::<T, I>(&group_runs(entries))
            })?;
            ColumnStore::Counted(encoded)
        }
    };
    let bytes = store.byte_size();
    debug!(bytes, "encoded column store");
    Ok((store, bytes))
}

/// Same as [`encode_store`] but starting from pre-grouped runs, for callers
/// like transpose that build runs directly instead of entry lists.
pub(crate) fn encode_store_from_runs<T: MatrixValue, I: MatrixIndex>(
    runs_per_outer: &[Vec<Run<T>>],
    layout: Layout,
    threshold: usize,
) -> Result<(ColumnStore<T, I>, usize)> {
    let store = match layout {
        Layout::Packed => {
            let encoded = map_columns(runs_per_outer, threshold, |runs| encode_packed(runs))?;
            ColumnStore::Packed(encoded)
        }
        Layout::Counted => {
            let encoded = map_columns(runs_per_outer, threshold, |runs| {
                build_counted::<T, I>(runs)
            })?;
            ColumnStore::Counted(encoded)
        }
    };
    let bytes = store.byte_size();
    Ok((store, bytes))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_sorts_and_drops_zeros() {
        let entries = vec![(4, 2i32), (1, 0), (2, 7)];
        let normalized =
            normalize_column(entries, 8, 0, MajorOrder::ColumnMajor).expect("normalize");
        assert_eq!(normalized, vec![(2, 7), (4, 2)]);
    }

    #[test]
    fn normalize_rejects_duplicate_coordinates() {
        let entries = vec![(3, 1i32), (3, 0)];
        let err = normalize_column(entries, 8, 5, MajorOrder::ColumnMajor).unwrap_err();
        assert!(matches!(err, MatrixError::DimensionMismatch(_)));
        assert!(err.to_string().contains("(3, 5)"));
    }

    #[test]
    fn normalize_rejects_out_of_bounds() {
        let entries = vec![(9, 1i32)];
        let err = normalize_column(entries, 8, 0, MajorOrder::RowMajor).unwrap_err();
        assert!(err.to_string().contains("(0, 9)"));
    }

    #[test]
    fn triplets_group_by_requested_order() {
        let triplets = [(0usize, 1usize, 5i32), (2, 1, 5), (2, 0, 3)];
        let cols = entry_lists_from_triplets::<i32, u32>(3, 2, &triplets, MajorOrder::ColumnMajor)
            .expect("column lists");
        assert_eq!(cols, vec![vec![(2, 3)], vec![(0, 5), (2, 5)]]);

        let rows = entry_lists_from_triplets::<i32, u32>(3, 2, &triplets, MajorOrder::RowMajor)
            .expect("row lists");
        assert_eq!(rows, vec![vec![(1, 5)], vec![], vec![(0, 3), (1, 5)]]);
    }

    #[test]
    fn narrow_index_type_rejects_large_inner_dim() {
        let err =
            entry_lists_from_triplets::<i32, u8>(300, 2, &[], MajorOrder::ColumnMajor).unwrap_err();
        assert!(matches!(err, MatrixError::DimensionMismatch(_)));
    }

    #[test]
    fn encode_store_parallel_path_matches_serial() {
        let columns: Vec<Vec<(usize, i32)>> = (0..20)
            .map(|outer| vec![(outer, 1 + outer as i32), (outer + 20, 1 + outer as i32)])
            .collect();
        let (serial, serial_bytes) =
            encode_store::<i32, u32>(&columns, Layout::Packed, usize::MAX).expect("serial");
        let (parallel, parallel_bytes) =
            encode_store::<i32, u32>(&columns, Layout::Packed, 1).expect("parallel");
        assert_eq!(serial_bytes, parallel_bytes);
        match (serial, parallel) {
            (ColumnStore::Packed(a), ColumnStore::Packed(b)) => assert_eq!(a, b),
            _ => panic!("expected packed stores"),
        }
    }
}
