//! Run grouping for one column.
//!
//! A run is the maximal set of indices in a column sharing one stored value.
//! Grouping keys on the value's exact bit pattern, and runs are ordered by
//! their first (smallest) index. The ordering is derived from content alone,
//! so re-encoding a decoded column reproduces the byte stream exactly.

use rustc_hash::FxHashMap;

use crate::format::width::width_for;
use crate::value::MatrixValue;

/// One run: a value and the ascending inner indices that hold it.
#[derive(Debug, Clone, PartialEq)]
pub struct Run<T> {
    pub value: T,
    pub indices: Vec<usize>,
}

impl<T: MatrixValue> Run<T> {
    /// Minimal byte width holding the first absolute index and every delta.
    pub fn index_width(&self) -> usize {
        let mut max = 0u64;
        let mut prev = 0usize;
        for (k, &idx) in self.indices.iter().enumerate() {
            let field = if k == 0 { idx } else { idx - prev };
            max = max.max(field as u64);
            prev = idx;
        }
        width_for(max)
    }
}

/// Groups one column's entries into runs.
///
/// `entries` must hold nonzero values with strictly ascending indices (the
/// matrix encoder normalizes and validates inputs before this point).
/// Scanning in ascending index order makes each run's first push its
/// smallest index and yields the runs already in first-index order.
pub fn group_runs<T: MatrixValue>(entries: &[(usize, T)]) -> Vec<Run<T>> {
    debug_assert!(
        entries.windows(2).all(|w| w[0].0 < w[1].0),
        "column entries must strictly ascend"
    );
    let mut by_key: FxHashMap<u64, usize> = FxHashMap::default();
    let mut runs: Vec<Run<T>> = Vec::new();
    for &(index, value) in entries {
        debug_assert!(!value.is_zero(), "zeros are never stored");
        let slot = *by_key.entry(value.bit_key()).or_insert_with(|| {
            runs.push(Run {
                value,
                indices: Vec::new(),
            });
            runs.len() - 1
        });
        runs[slot].indices.push(index);
    }
    runs
}
