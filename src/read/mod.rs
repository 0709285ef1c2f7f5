//! Traversal over compressed columns.
//!
//! [`ColumnIter`] and [`ColumnIterMut`] present one protocol over both
//! layouts: check `has_more`, read `value`/`index`/`row`/`col`, then
//! `advance`. `is_new_run` fires once per stored run, which is how callers
//! touch each unique value exactly once (rewrites through `set_value` apply
//! to the whole run).

pub(crate) mod counted;
pub(crate) mod packed;

use crate::error::Result;
use crate::format::{CountedColumn, MajorOrder};
use crate::value::{MatrixIndex, MatrixValue};

use counted::{CountedIter, CountedIterMut};
use packed::{PackedIter, PackedIterMut};

enum IterKind<'a, T: MatrixValue, I: MatrixIndex> {
    Packed(PackedIter<'a, T>),
    Counted(CountedIter<'a, T, I>),
}

/// Read-only cursor over one compressed outer slot.
pub struct ColumnIter<'a, T: MatrixValue, I: MatrixIndex> {
    kind: IterKind<'a, T, I>,
    outer: usize,
    order: MajorOrder,
}

impl<'a, T: MatrixValue, I: MatrixIndex> ColumnIter<'a, T, I> {
    pub(crate) fn from_packed(
        col: Option<&'a [u8]>,
        outer: usize,
        order: MajorOrder,
    ) -> Result<Self> {
        Ok(ColumnIter {
            kind: IterKind::Packed(PackedIter::new(col)?),
            outer,
            order,
        })
    }

    pub(crate) fn from_counted(
        col: Option<&'a CountedColumn<T, I>>,
        outer: usize,
        order: MajorOrder,
    ) -> Self {
        ColumnIter {
            kind: IterKind::Counted(CountedIter::new(col)),
            outer,
            order,
        }
    }

    /// True while the cursor rests on a stored coefficient.
    pub fn has_more(&self) -> bool {
        match &self.kind {
            IterKind::Packed(it) => it.has_more(),
            IterKind::Counted(it) => it.has_more(),
        }
    }

    /// Step to the next coefficient. Past the end this does nothing.
    pub fn advance(&mut self) -> Result<()> {
        match &mut self.kind {
            IterKind::Packed(it) => it.advance(),
            IterKind::Counted(it) => {
                it.advance();
                Ok(())
            }
        }
    }

    /// Value of the current run.
    pub fn value(&self) -> T {
        match &self.kind {
            IterKind::Packed(it) => it.value(),
            IterKind::Counted(it) => it.value(),
        }
    }

    /// Inner index of the current coefficient.
    pub fn index(&self) -> usize {
        match &self.kind {
            IterKind::Packed(it) => it.index(),
            IterKind::Counted(it) => it.index(),
        }
    }

    /// Outer slot this cursor walks.
    pub fn outer(&self) -> usize {
        self.outer
    }

    /// True on the first coefficient of each stored run.
    pub fn is_new_run(&self) -> bool {
        match &self.kind {
            IterKind::Packed(it) => it.first_of_run(),
            IterKind::Counted(it) => it.first_of_run(),
        }
    }

    /// Matrix row of the current coefficient, independent of storage order.
    pub fn row(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.index(),
            MajorOrder::RowMajor => self.outer,
        }
    }

    /// Matrix column of the current coefficient.
    pub fn col(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.outer,
            MajorOrder::RowMajor => self.index(),
        }
    }
}

enum IterKindMut<'a, T: MatrixValue, I: MatrixIndex> {
    Packed(PackedIterMut<'a, T>),
    Counted(CountedIterMut<'a, T, I>),
}

/// Mutable cursor: the same walk plus [`set_value`](ColumnIterMut::set_value),
/// which rewrites the current run's stored value in place.
pub struct ColumnIterMut<'a, T: MatrixValue, I: MatrixIndex> {
    kind: IterKindMut<'a, T, I>,
    outer: usize,
    order: MajorOrder,
}

impl<'a, T: MatrixValue, I: MatrixIndex> ColumnIterMut<'a, T, I> {
    pub(crate) fn from_packed(
        col: Option<&'a mut [u8]>,
        outer: usize,
        order: MajorOrder,
    ) -> Result<Self> {
        Ok(ColumnIterMut {
            kind: IterKindMut::Packed(PackedIterMut::new(col)?),
            outer,
            order,
        })
    }

    pub(crate) fn from_counted(
        col: Option<&'a mut CountedColumn<T, I>>,
        outer: usize,
        order: MajorOrder,
    ) -> Self {
        ColumnIterMut {
            kind: IterKindMut::Counted(CountedIterMut::new(col)),
            outer,
            order,
        }
    }

    pub fn has_more(&self) -> bool {
        match &self.kind {
            IterKindMut::Packed(it) => it.has_more(),
            IterKindMut::Counted(it) => it.has_more(),
        }
    }

    pub fn advance(&mut self) -> Result<()> {
        match &mut self.kind {
            IterKindMut::Packed(it) => it.advance(),
            IterKindMut::Counted(it) => {
                it.advance();
                Ok(())
            }
        }
    }

    pub fn value(&self) -> T {
        match &self.kind {
            IterKindMut::Packed(it) => it.value(),
            IterKindMut::Counted(it) => it.value(),
        }
    }

    pub fn index(&self) -> usize {
        match &self.kind {
            IterKindMut::Packed(it) => it.index(),
            IterKindMut::Counted(it) => it.index(),
        }
    }

    pub fn outer(&self) -> usize {
        self.outer
    }

    pub fn is_new_run(&self) -> bool {
        match &self.kind {
            IterKindMut::Packed(it) => it.first_of_run(),
            IterKindMut::Counted(it) => it.first_of_run(),
        }
    }

    pub fn row(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.index(),
            MajorOrder::RowMajor => self.outer,
        }
    }

    pub fn col(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.outer,
            MajorOrder::RowMajor => self.index(),
        }
    }

    /// Rewrite the current run's stored value. Affects every coefficient of
    /// the run, not only the cursor position.
    pub fn set_value(&mut self, value: T) {
        match &mut self.kind {
            IterKindMut::Packed(it) => it.set_value(value),
            IterKindMut::Counted(it) => it.set_value(value),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encode::column::{build_counted, encode_packed};
    use crate::encode::runs::group_runs;

    #[test]
    fn row_and_col_track_storage_order() {
        let buf = encode_packed(&group_runs(&[(3usize, 7i32)]))
            .expect("encode")
            .expect("non-empty");

        let by_col = ColumnIter::<i32, u32>::from_packed(Some(&buf), 5, MajorOrder::ColumnMajor)
            .expect("cursor");
        assert_eq!((by_col.row(), by_col.col()), (3, 5));

        let by_row = ColumnIter::<i32, u32>::from_packed(Some(&buf), 5, MajorOrder::RowMajor)
            .expect("cursor");
        assert_eq!((by_row.row(), by_row.col()), (5, 3));
    }

    #[test]
    fn both_layouts_agree_on_the_walk() {
        let entries = [(0usize, 2i32), (1, 4), (6, 2), (9, 4)];
        let runs = group_runs(&entries);
        let buf = encode_packed(&runs).expect("encode").expect("non-empty");
        let col = build_counted::<i32, u32>(&runs)
            .expect("build")
            .expect("non-empty");

        let mut packed = ColumnIter::<i32, u32>::from_packed(Some(&buf), 0, MajorOrder::ColumnMajor)
            .expect("cursor");
        let mut counted =
            ColumnIter::<i32, u32>::from_counted(Some(&col), 0, MajorOrder::ColumnMajor);
        while packed.has_more() {
            assert!(counted.has_more());
            assert_eq!(packed.index(), counted.index());
            assert_eq!(packed.value(), counted.value());
            assert_eq!(packed.is_new_run(), counted.is_new_run());
            packed.advance().expect("advance");
            counted.advance().expect("advance");
        }
        assert!(!counted.has_more());
    }
}
