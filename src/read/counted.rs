//! Cursor over one counted column (parallel value/count/index arrays).
//!
//! The walk visits the flattened index array in order, switching runs when
//! the current run's count is used up. No byte decoding happens here; the
//! arrays were validated when the column was built or loaded.

use crate::format::CountedColumn;
use crate::value::{MatrixIndex, MatrixValue};

pub(crate) struct CountedIter<'a, T: MatrixValue, I: MatrixIndex> {
    values: &'a [T],
    counts: &'a [I],
    indices: &'a [I],
    run: usize,
    left_in_run: usize,
    flat: usize,
}

impl<'a, T: MatrixValue, I: MatrixIndex> CountedIter<'a, T, I> {
    pub(crate) fn new(col: Option<&'a CountedColumn<T, I>>) -> Self {
        match col {
            None => CountedIter {
                values: &[],
                counts: &[],
                indices: &[],
                run: 0,
                left_in_run: 0,
                flat: 0,
            },
            Some(col) => CountedIter {
                values: col.values(),
                counts: col.counts(),
                indices: col.indices(),
                run: 0,
                left_in_run: col.counts().first().map_or(0, |c| c.to_usize()),
                flat: 0,
            },
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        self.flat < self.indices.len()
    }

    pub(crate) fn value(&self) -> T {
        self.values.get(self.run).map_or_else(T::zero, |v| *v)
    }

    pub(crate) fn index(&self) -> usize {
        self.indices.get(self.flat).map_or(0, |i| i.to_usize())
    }

    pub(crate) fn first_of_run(&self) -> bool {
        self.counts
            .get(self.run)
            .map_or(false, |c| c.to_usize() == self.left_in_run)
            && self.has_more()
    }

    pub(crate) fn advance(&mut self) {
        if !self.has_more() {
            return;
        }
        self.flat += 1;
        self.left_in_run -= 1;
        if self.left_in_run == 0 {
            self.run += 1;
            self.left_in_run = self.counts.get(self.run).map_or(0, |c| c.to_usize());
        }
    }
}

/// Mutable counterpart: shares the walk, adds run-value rewrites.
pub(crate) struct CountedIterMut<'a, T: MatrixValue, I: MatrixIndex> {
    values: &'a mut [T],
    counts: &'a [I],
    indices: &'a [I],
    run: usize,
    left_in_run: usize,
    flat: usize,
}

impl<'a, T: MatrixValue, I: MatrixIndex> CountedIterMut<'a, T, I> {
    pub(crate) fn new(col: Option<&'a mut CountedColumn<T, I>>) -> Self {
        match col {
            None => CountedIterMut {
                values: &mut [],
                counts: &[],
                indices: &[],
                run: 0,
                left_in_run: 0,
                flat: 0,
            },
            Some(col) => {
                let (values, counts, indices) = col.parts_mut();
                let left_in_run = counts.first().map_or(0, |c| c.to_usize());
                CountedIterMut {
                    values,
                    counts,
                    indices,
                    run: 0,
                    left_in_run,
                    flat: 0,
                }
            }
        }
    }

    pub(crate) fn has_more(&self) -> bool {
        self.flat < self.indices.len()
    }

    pub(crate) fn value(&self) -> T {
        self.values.get(self.run).map_or_else(T::zero, |v| *v)
    }

    pub(crate) fn index(&self) -> usize {
        self.indices.get(self.flat).map_or(0, |i| i.to_usize())
    }

    pub(crate) fn first_of_run(&self) -> bool {
        self.counts
            .get(self.run)
            .map_or(false, |c| c.to_usize() == self.left_in_run)
            && self.has_more()
    }

    /// Rewrite the current run's stored value for all of its coefficients.
    pub(crate) fn set_value(&mut self, value: T) {
        if !self.has_more() {
            return;
        }
        if let Some(slot) = self.values.get_mut(self.run) {
            *slot = value;
        }
    }

    pub(crate) fn advance(&mut self) {
        if !self.has_more() {
            return;
        }
        self.flat += 1;
        self.left_in_run -= 1;
        if self.left_in_run == 0 {
            self.run += 1;
            self.left_in_run = self.counts.get(self.run).map_or(0, |c| c.to_usize());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::column::build_counted;
    use crate::encode::runs::group_runs;

    fn counted(entries: &[(usize, i32)]) -> CountedColumn<i32, u32> {
        build_counted(&group_runs(entries))
            .expect("build")
            .expect("non-empty column")
    }

    #[test]
    fn walks_runs_in_order() {
        let col = counted(&[(0, 3), (2, 9), (5, 3), (6, 9)]);
        let mut it = CountedIter::new(Some(&col));
        let mut seen = Vec::new();
        while it.has_more() {
            seen.push((it.index(), it.value(), it.first_of_run()));
            it.advance();
        }
        assert_eq!(
            seen,
            vec![(0, 3, true), (5, 3, false), (2, 9, true), (6, 9, false)]
        );
    }

    #[test]
    fn empty_column_is_exhausted() {
        let it = CountedIter::<i32, u32>::new(None);
        assert!(!it.has_more());
        assert!(!it.first_of_run());
    }

    #[test]
    fn set_value_rewrites_run() {
        let mut col = counted(&[(1, 5), (2, 5), (4, 8)]);
        {
            let mut it = CountedIterMut::new(Some(&mut col));
            while it.has_more() {
                if it.value() == 5 {
                    it.set_value(6);
                }
                it.advance();
            }
        }
        assert_eq!(col.values(), &[6, 8]);
    }

    #[test]
    fn advance_past_end_is_a_no_op() {
        let col = counted(&[(3, 1)]);
        let mut it = CountedIter::new(Some(&col));
        it.advance();
        assert!(!it.has_more());
        it.advance();
        assert!(!it.has_more());
    }
}
