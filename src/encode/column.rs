//! Column emitters for the two physical layouts.
//!
//! Packed stream, one run after another:
//!
//! ```text
//! value:      sizeof(T) bytes LE
//! indexWidth: 1 byte            (1, 2, 4, or 8; minimal for this run)
//! encoded_1:  indexWidth bytes  (first index, absolute)
//! encoded_i:  indexWidth bytes  (positive delta from the previous index)
//! terminator: indexWidth bytes  (all zero)
//! ```
//!
//! A zero delta cannot occur between distinct ascending indices, which is
//! what makes the terminator unambiguous mid-stream; end-of-column is
//! detected by position, not by the terminator.
//!
//! The counted layout stores the same runs as three parallel arrays with
//! absolute indices and no terminators.

use tracing::trace;

use crate::encode::runs::Run;
use crate::error::{MatrixError, Result};
use crate::format::cursor::write_uint;
use crate::format::CountedColumn;
use crate::value::{MatrixIndex, MatrixValue};

pub(crate) fn alloc_err(what: &'static str, bytes: usize) -> MatrixError {
    MatrixError::Allocation(format!("could not reserve {bytes} bytes for {what}"))
}

/// Exact byte size of the packed stream for `runs`.
pub fn packed_size<T: MatrixValue>(runs: &[Run<T>]) -> usize {
    runs.iter()
        .map(|run| T::WIDTH + 1 + run.index_width() * (run.indices.len() + 1))
        .sum()
}

/// Serializes one column's runs into a packed byte stream.
///
/// Returns `None` for an empty column: no buffer, no terminator bytes.
pub fn encode_packed<T: MatrixValue>(runs: &[Run<T>]) -> Result<Option<Box<[u8]>>> {
    if runs.is_empty() {
        return Ok(None);
    }
    let size = packed_size(runs);
    let mut out = Vec::new();
    out.try_reserve_exact(size)
        .map_err(|_| alloc_err("a packed column", size))?;
    for run in runs {
        let width = run.index_width();
        run.value.write_le(&mut out);
        out.push(width as u8);
        let mut prev = 0usize;
        for (k, &idx) in run.indices.iter().enumerate() {
            let field = if k == 0 { idx } else { idx - prev };
            write_uint(&mut out, field as u64, width);
            prev = idx;
        }
        write_uint(&mut out, 0, width);
    }
    debug_assert_eq!(out.len(), size);
    trace!(runs = runs.len(), bytes = size, "packed column");
    Ok(Some(out.into_boxed_slice()))
}

/// Builds one column's runs as value-count-index parallel arrays.
///
/// Returns `None` for an empty column. Counts and indices must fit the `I`
/// word; the matrix encoder validates dimensions against `I` up front, so a
/// failure here means the caller skipped that check.
pub fn build_counted<T: MatrixValue, I: MatrixIndex>(
    runs: &[Run<T>],
) -> Result<Option<CountedColumn<T, I>>> {
    if runs.is_empty() {
        return Ok(None);
    }
    let total: usize = runs.iter().map(|run| run.indices.len()).sum();
    let narrow = |what: &'static str, v: usize| -> Result<I> {
        I::from_usize(v).ok_or_else(|| {
            MatrixError::DimensionMismatch(format!(
                "{what} {v} does not fit the {}-byte index type",
                I::WIDTH
            ))
        })
    };
    let mut values = Vec::new();
    values
        .try_reserve_exact(runs.len())
        .map_err(|_| alloc_err("counted column values", runs.len() * T::WIDTH))?;
    let mut counts = Vec::new();
    counts
        .try_reserve_exact(runs.len())
        .map_err(|_| alloc_err("counted column counts", runs.len() * I::WIDTH))?;
    let mut indices = Vec::new();
    indices
        .try_reserve_exact(total)
        .map_err(|_| alloc_err("counted column indices", total * I::WIDTH))?;
    for run in runs {
        values.push(run.value);
        counts.push(narrow("run count", run.indices.len())?);
        for &idx in &run.indices {
            indices.push(narrow("stored index", idx)?);
        }
    }
    Ok(Some(CountedColumn::new(values, counts, indices)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::runs::group_runs;

    #[test]
    fn single_entry_stream_layout() {
        // 1x1 matrix with value 5: value byte, width 1, index 0, terminator.
        let runs = group_runs(&[(0usize, 5u8)]);
        let buf = encode_packed(&runs).unwrap().unwrap();
        assert_eq!(&buf[..], &[5, 1, 0, 0]);
    }

    #[test]
    fn shared_value_column_stream_layout() {
        // Rows [0, 1, 3] all holding 7: fields are absolute 0 then deltas 1, 2.
        let runs = group_runs(&[(0usize, 7i32), (1, 7), (3, 7)]);
        let buf = encode_packed(&runs).unwrap().unwrap();
        let expected: &[u8] = &[
            7, 0, 0, 0, // value 7i32 LE
            1, // width
            0, 1, 2, // absolute 0, delta 1, delta 2
            0, // terminator
        ];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn two_runs_concatenate() {
        let runs = group_runs(&[(0usize, 3u8), (2, 9u8), (5, 3u8)]);
        let buf = encode_packed(&runs).unwrap().unwrap();
        // Run for 3 (first index 0), then run for 9 (first index 2).
        let expected: &[u8] = &[3, 1, 0, 5, 0, 9, 1, 2, 0];
        assert_eq!(&buf[..], expected);
        assert_eq!(buf.len(), packed_size(&runs));
    }

    #[test]
    fn wide_first_index_widens_the_run() {
        let runs = group_runs(&[(300usize, 1u8), (301, 1u8)]);
        let buf = encode_packed(&runs).unwrap().unwrap();
        // value, width 2, first index 300 LE, delta 1, terminator.
        let expected: &[u8] = &[1, 2, 44, 1, 1, 0, 0, 0];
        assert_eq!(&buf[..], expected);
    }

    #[test]
    fn empty_column_is_none() {
        assert!(encode_packed::<u8>(&[]).unwrap().is_none());
        assert!(build_counted::<u8, u32>(&[]).unwrap().is_none());
    }

    #[test]
    fn counted_arrays_parallel_the_runs() {
        let runs = group_runs(&[(0usize, 7i32), (1, 7), (3, 4), (6, 7)]);
        let col = build_counted::<i32, u32>(&runs).unwrap().unwrap();
        assert_eq!(col.values(), &[7, 4]);
        assert_eq!(col.counts(), &[3, 1]);
        assert_eq!(col.indices(), &[0, 1, 6, 3]);
        assert!(col.validate(7).is_ok());
    }

    #[test]
    fn counted_rejects_indices_beyond_the_word() {
        let runs = group_runs(&[(300usize, 1u8)]);
        assert!(matches!(
            build_counted::<u8, u8>(&runs),
            Err(MatrixError::DimensionMismatch(_))
        ));
    }
}
