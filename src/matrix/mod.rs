//! The compressed matrix facade.
//!
//! [`SparseMatrix`] owns one compressed column store per outer slot and
//! exposes construction from CSC/COO/dense input, cursor traversal, column
//! extraction and appends, slicing, transposition, and layout conversion.
//! All byte-level work is delegated to the `encode` and `read` modules.

pub mod csc;
pub mod io;
pub mod ops;
pub mod stats;
pub mod vector;

use std::collections::hash_map::Entry;
use std::fmt;

use rustc_hash::FxHashMap;
use tracing::debug;

use crate::encode::column::{build_counted, encode_packed};
use crate::encode::matrix::{
    check_dims, encode_store, encode_store_from_runs, entry_lists_from_csc,
    entry_lists_from_dense, entry_lists_from_triplets, EncodeOptions, DEFAULT_PARALLEL_THRESHOLD,
};
use crate::encode::runs::{group_runs, Run};
use crate::error::{MatrixError, Result};
use crate::format::{CountedColumn, Layout, MajorOrder};
use crate::read::{ColumnIter, ColumnIterMut};
use crate::value::{MatrixIndex, MatrixValue};

use csc::{CscMatrix, Dense, DenseSource, MatrixSink};
use vector::{SparseVector, VectorColumn};

/// Per-outer compressed columns, one variant per layout. `None` slots are
/// empty columns.
#[derive(Clone)]
pub(crate) enum ColumnStore<T, I> {
    Packed(Vec<Option<Box<[u8]>>>),
    Counted(Vec<Option<CountedColumn<T, I>>>),
}

impl<T: MatrixValue, I: MatrixIndex> ColumnStore<T, I> {
    pub(crate) fn len(&self) -> usize {
        match self {
            ColumnStore::Packed(cols) => cols.len(),
            ColumnStore::Counted(cols) => cols.len(),
        }
    }

    /// Compressed payload bytes across all columns.
    pub(crate) fn byte_size(&self) -> usize {
        match self {
            ColumnStore::Packed(cols) => cols
                .iter()
                .map(|col| col.as_ref().map_or(0, |buf| buf.len()))
                .sum(),
            ColumnStore::Counted(cols) => cols
                .iter()
                .map(|col| col.as_ref().map_or(0, |c| c.byte_size()))
                .sum(),
        }
    }
}

/// Borrowed view of one compressed column.
#[derive(Debug)]
pub enum ColumnRef<'a, T, I> {
    /// No stored coefficients in this outer slot.
    Empty,
    /// Raw packed run stream.
    Packed(&'a [u8]),
    /// Counted value/count/index arrays.
    Counted(&'a CountedColumn<T, I>),
}

/// A run-compressed sparse matrix.
///
/// The value type `T` is one of the fixed-width integers or floats; the
/// index type `I` bounds the inner dimension and sizes the counted layout's
/// arrays. Storage order fixes which axis the compressed columns run along;
/// the layout fixes how each column is compressed.
pub struct SparseMatrix<T: MatrixValue, I: MatrixIndex = u32> {
    layout: Layout,
    order: MajorOrder,
    inner_dim: usize,
    outer_dim: usize,
    nnz: usize,
    bytes: usize,
    store: ColumnStore<T, I>,
}

impl<T: MatrixValue, I: MatrixIndex> SparseMatrix<T, I> {
    fn build(
        lists: Vec<Vec<(usize, T)>>,
        inner_dim: usize,
        layout: Layout,
        options: &EncodeOptions,
    ) -> Result<Self> {
        let nnz = lists.iter().map(Vec::len).sum();
        let (store, bytes) = encode_store(&lists, layout, options.parallel_threshold)?;
        debug!(
            layout = layout.as_str(),
            order = options.order.as_str(),
            inner_dim,
            outer_dim = lists.len(),
            nnz,
            bytes,
            "built matrix"
        );
        Ok(SparseMatrix {
            layout,
            order: options.order,
            inner_dim,
            outer_dim: lists.len(),
            nnz,
            bytes,
            store,
        })
    }

    pub(crate) fn from_parts(
        layout: Layout,
        order: MajorOrder,
        inner_dim: usize,
        outer_dim: usize,
        nnz: usize,
        store: ColumnStore<T, I>,
    ) -> Self {
        let bytes = store.byte_size();
        SparseMatrix {
            layout,
            order,
            inner_dim,
            outer_dim,
            nnz,
            bytes,
            store,
        }
    }

    /// Compress CSC arrays with default options (column-major storage).
    pub fn from_csc(csc: &CscMatrix<T, I>, layout: Layout) -> Result<Self> {
        Self::from_csc_with(csc, layout, EncodeOptions::default())
    }

    pub fn from_csc_with(
        csc: &CscMatrix<T, I>,
        layout: Layout,
        options: EncodeOptions,
    ) -> Result<Self> {
        let inner_dim = match options.order {
            MajorOrder::ColumnMajor => csc.rows,
            MajorOrder::RowMajor => csc.cols,
        };
        let lists = entry_lists_from_csc(csc, options.order)?;
        Self::build(lists, inner_dim, layout, &options)
    }

    /// Compress raw CSC arrays. `nnz` is the caller's claimed coefficient
    /// count and must match the arrays.
    pub fn from_csc_parts(
        rows: usize,
        cols: usize,
        nnz: usize,
        values: Vec<T>,
        row_indices: Vec<I>,
        col_pointers: Vec<I>,
        layout: Layout,
    ) -> Result<Self> {
        if nnz != values.len() {
            return Err(MatrixError::DimensionMismatch(format!(
                "declared {} nonzeros but {} values were given",
                nnz,
                values.len()
            )));
        }
        let csc = CscMatrix::new(rows, cols, values, row_indices, col_pointers)?;
        Self::from_csc(&csc, layout)
    }

    /// Compress `(row, col, value)` triplets with default options.
    pub fn from_triplets(
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, T)],
        layout: Layout,
    ) -> Result<Self> {
        Self::from_triplets_with(rows, cols, triplets, layout, EncodeOptions::default())
    }

    pub fn from_triplets_with(
        rows: usize,
        cols: usize,
        triplets: &[(usize, usize, T)],
        layout: Layout,
        options: EncodeOptions,
    ) -> Result<Self> {
        let inner_dim = match options.order {
            MajorOrder::ColumnMajor => rows,
            MajorOrder::RowMajor => cols,
        };
        let lists = entry_lists_from_triplets::<T, I>(rows, cols, triplets, options.order)?;
        Self::build(lists, inner_dim, layout, &options)
    }

    /// Compress a dense operand with default options.
    pub fn from_dense_source<S: DenseSource<T> + ?Sized>(
        source: &S,
        layout: Layout,
    ) -> Result<Self> {
        Self::from_dense_source_with(source, layout, EncodeOptions::default())
    }

    pub fn from_dense_source_with<S: DenseSource<T> + ?Sized>(
        source: &S,
        layout: Layout,
        options: EncodeOptions,
    ) -> Result<Self> {
        let inner_dim = match options.order {
            MajorOrder::ColumnMajor => source.rows(),
            MajorOrder::RowMajor => source.cols(),
        };
        let lists = entry_lists_from_dense::<S, T, I>(source, options.order)?;
        Self::build(lists, inner_dim, layout, &options)
    }

    /// Stack sparse vectors into a matrix, one outer slot per vector. With
    /// column-major storage the vectors become columns; with row-major,
    /// rows. All vectors must share the same length.
    pub fn from_vectors(vectors: &[SparseVector<T, I>], layout: Layout) -> Result<Self> {
        Self::from_vectors_with(vectors, layout, EncodeOptions::default())
    }

    pub fn from_vectors_with(
        vectors: &[SparseVector<T, I>],
        layout: Layout,
        options: EncodeOptions,
    ) -> Result<Self> {
        let first = vectors.first().ok_or_else(|| {
            MatrixError::DimensionMismatch("cannot stack zero vectors".to_string())
        })?;
        let inner_dim = first.len();
        let mut lists = Vec::with_capacity(vectors.len());
        for vector in vectors {
            if vector.len() != inner_dim {
                return Err(MatrixError::DimensionMismatch(format!(
                    "vector of length {} cannot stack with length {}",
                    vector.len(),
                    inner_dim
                )));
            }
            lists.push(vector.entries()?);
        }
        check_dims::<I>(inner_dim, lists.len())?;
        Self::build(lists, inner_dim, layout, &options)
    }

    /// Matrix rows, independent of storage order.
    pub fn rows(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.inner_dim,
            MajorOrder::RowMajor => self.outer_dim,
        }
    }

    /// Matrix columns, independent of storage order.
    pub fn cols(&self) -> usize {
        match self.order {
            MajorOrder::ColumnMajor => self.outer_dim,
            MajorOrder::RowMajor => self.inner_dim,
        }
    }

    /// Length of each stored column (rows when column-major).
    pub fn inner_dim(&self) -> usize {
        self.inner_dim
    }

    /// Number of stored columns (cols when column-major).
    pub fn outer_dim(&self) -> usize {
        self.outer_dim
    }

    /// Stored coefficients.
    pub fn nnz(&self) -> usize {
        self.nnz
    }

    pub fn layout(&self) -> Layout {
        self.layout
    }

    pub fn order(&self) -> MajorOrder {
        self.order
    }

    pub fn is_column_major(&self) -> bool {
        self.order.is_column_major()
    }

    /// Compressed payload bytes across all columns.
    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    fn check_outer(&self, outer: usize) -> Result<()> {
        if outer >= self.outer_dim {
            return Err(MatrixError::IndexOutOfBounds(format!(
                "outer index {} out of range for {} slots",
                outer, self.outer_dim
            )));
        }
        Ok(())
    }

    /// Cursor over one outer slot.
    pub fn outer_iter(&self, outer: usize) -> Result<ColumnIter<'_, T, I>> {
        self.check_outer(outer)?;
        match &self.store {
            ColumnStore::Packed(cols) => {
                ColumnIter::from_packed(cols[outer].as_deref(), outer, self.order)
            }
            ColumnStore::Counted(cols) => Ok(ColumnIter::from_counted(
                cols[outer].as_ref(),
                outer,
                self.order,
            )),
        }
    }

    /// Mutable cursor over one outer slot, for run-value rewrites.
    pub fn outer_iter_mut(&mut self, outer: usize) -> Result<ColumnIterMut<'_, T, I>> {
        self.check_outer(outer)?;
        let order = self.order;
        match &mut self.store {
            ColumnStore::Packed(cols) => {
                ColumnIterMut::from_packed(cols[outer].as_deref_mut(), outer, order)
            }
            ColumnStore::Counted(cols) => Ok(ColumnIterMut::from_counted(
                cols[outer].as_mut(),
                outer,
                order,
            )),
        }
    }

    /// Borrowed view of one compressed column.
    pub fn column(&self, outer: usize) -> Result<ColumnRef<'_, T, I>> {
        self.check_outer(outer)?;
        Ok(match &self.store {
            ColumnStore::Packed(cols) => match &cols[outer] {
                Some(buf) => ColumnRef::Packed(buf),
                None => ColumnRef::Empty,
            },
            ColumnStore::Counted(cols) => match &cols[outer] {
                Some(col) => ColumnRef::Counted(col),
                None => ColumnRef::Empty,
            },
        })
    }

    /// Coefficient at `(row, col)`; zero when nothing is stored there.
    pub fn coeff(&self, row: usize, col: usize) -> Result<T> {
        if row >= self.rows() || col >= self.cols() {
            return Err(MatrixError::IndexOutOfBounds(format!(
                "({}, {}) out of range for a {}x{} matrix",
                row,
                col,
                self.rows(),
                self.cols()
            )));
        }
        let (outer, inner) = match self.order {
            MajorOrder::ColumnMajor => (col, row),
            MajorOrder::RowMajor => (row, col),
        };
        let mut it = self.outer_iter(outer)?;
        while it.has_more() {
            if it.index() == inner {
                return Ok(it.value());
            }
            it.advance()?;
        }
        Ok(T::zero())
    }

    /// Decode one outer slot to `(inner, value)` entries sorted by index.
    pub(crate) fn decode_outer(&self, outer: usize) -> Result<Vec<(usize, T)>> {
        let mut entries = Vec::new();
        let mut it = self.outer_iter(outer)?;
        while it.has_more() {
            entries.push((it.index(), it.value()));
            it.advance()?;
        }
        entries.sort_unstable_by_key(|&(inner, _)| inner);
        Ok(entries)
    }

    fn outer_nnz(&self, outer: usize) -> Result<usize> {
        match &self.store {
            ColumnStore::Counted(cols) => {
                Ok(cols[outer].as_ref().map_or(0, |col| col.nonzeros()))
            }
            ColumnStore::Packed(_) => {
                let mut count = 0;
                let mut it = self.outer_iter(outer)?;
                while it.has_more() {
                    count += 1;
                    it.advance()?;
                }
                Ok(count)
            }
        }
    }

    /// Deep copy of one outer slot as a sparse vector.
    pub fn vector_at(&self, outer: usize) -> Result<SparseVector<T, I>> {
        self.check_outer(outer)?;
        let nnz = self.outer_nnz(outer)?;
        let col = match &self.store {
            ColumnStore::Packed(cols) => VectorColumn::Packed(cols[outer].clone()),
            ColumnStore::Counted(cols) => VectorColumn::Counted(cols[outer].clone()),
        };
        Ok(SparseVector::from_parts(
            self.layout,
            self.inner_dim,
            nnz,
            col,
        ))
    }

    /// Append one vector as a new outer slot. A vector stored in the other
    /// layout is re-encoded to match.
    pub fn append(&mut self, vector: &SparseVector<T, I>) -> Result<()> {
        if vector.len() != self.inner_dim {
            return Err(MatrixError::DimensionMismatch(format!(
                "vector of length {} cannot append to inner dimension {}",
                vector.len(),
                self.inner_dim
            )));
        }
        check_dims::<I>(self.inner_dim, self.outer_dim + 1)?;
        let added = match (&mut self.store, vector.store()) {
            (ColumnStore::Packed(cols), VectorColumn::Packed(src)) => {
                let bytes = src.as_ref().map_or(0, |buf| buf.len());
                cols.push(src.clone());
                bytes
            }
            (ColumnStore::Counted(cols), VectorColumn::Counted(src)) => {
                let bytes = src.as_ref().map_or(0, |col| col.byte_size());
                cols.push(src.clone());
                bytes
            }
            (store, _) => {
                let entries = vector.entries()?;
                let runs = group_runs(&entries);
                match store {
                    ColumnStore::Packed(cols) => {
                        let encoded = encode_packed(&runs)?;
                        let bytes = encoded.as_ref().map_or(0, |buf| buf.len());
                        cols.push(encoded);
                        bytes
                    }
                    ColumnStore::Counted(cols) => {
                        let built = build_counted::<T, I>(&runs)?;
                        let bytes = built.as_ref().map_or(0, |col| col.byte_size());
                        cols.push(built);
                        bytes
                    }
                }
            }
        };
        self.outer_dim += 1;
        self.nnz += vector.nonzeros();
        self.bytes += added;
        Ok(())
    }

    /// Append every outer slot of `other`. Requires matching inner
    /// dimension and storage order; a layout mismatch re-encodes columns.
    pub fn append_matrix(&mut self, other: &SparseMatrix<T, I>) -> Result<()> {
        if other.inner_dim != self.inner_dim || other.order != self.order {
            return Err(MatrixError::DimensionMismatch(format!(
                "cannot append a {} matrix with inner dimension {} to a {} one with {}",
                other.order.as_str(),
                other.inner_dim,
                self.order.as_str(),
                self.inner_dim
            )));
        }
        check_dims::<I>(self.inner_dim, self.outer_dim + other.outer_dim)?;
        if other.layout == self.layout {
            match (&mut self.store, &other.store) {
                (ColumnStore::Packed(dst), ColumnStore::Packed(src)) => {
                    dst.extend(src.iter().cloned());
                }
                (ColumnStore::Counted(dst), ColumnStore::Counted(src)) => {
                    dst.extend(src.iter().cloned());
                }
                _ => unreachable!("layouts match"),
            }
        } else {
            for outer in 0..other.outer_dim {
                let entries = other.decode_outer(outer)?;
                let runs = group_runs(&entries);
                match &mut self.store {
                    ColumnStore::Packed(cols) => cols.push(encode_packed(&runs)?),
                    ColumnStore::Counted(cols) => cols.push(build_counted::<T, I>(&runs)?),
                }
            }
        }
        self.outer_dim += other.outer_dim;
        self.nnz += other.nnz;
        self.bytes = self.store.byte_size();
        Ok(())
    }

    /// Copy of the outer slots in `[start, end)`, sharing dimensions with
    /// the source along the inner axis.
    pub fn slice(&self, start: usize, end: usize) -> Result<SparseMatrix<T, I>> {
        if start > end || end > self.outer_dim {
            return Err(MatrixError::IndexOutOfBounds(format!(
                "slice {}..{} out of range for {} slots",
                start, end, self.outer_dim
            )));
        }
        let store = match &self.store {
            ColumnStore::Packed(cols) => ColumnStore::Packed(cols[start..end].to_vec()),
            ColumnStore::Counted(cols) => ColumnStore::Counted(cols[start..end].to_vec()),
        };
        let mut nnz = 0;
        for outer in start..end {
            nnz += self.outer_nnz(outer)?;
        }
        Ok(SparseMatrix::from_parts(
            self.layout,
            self.order,
            self.inner_dim,
            end - start,
            nnz,
            store,
        ))
    }

    /// Transposed copy. Storage order and layout carry over; the inner and
    /// outer axes swap.
    pub fn transpose(&self) -> Result<SparseMatrix<T, I>> {
        check_dims::<I>(self.outer_dim, self.inner_dim)?;
        // Bucket runs by the old inner index. Scanning outers in ascending
        // order keeps each new run's indices sorted and yields runs ordered
        // by first index, the same shape group_runs produces.
        let mut slots: Vec<FxHashMap<u64, usize>> = vec![FxHashMap::default(); self.inner_dim];
        let mut buckets: Vec<Vec<Run<T>>> = vec![Vec::new(); self.inner_dim];
        for outer in 0..self.outer_dim {
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                let value = it.value();
                let inner = it.index();
                match slots[inner].entry(value.bit_key()) {
                    Entry::Occupied(slot) => buckets[inner][*slot.get()].indices.push(outer),
                    Entry::Vacant(vacant) => {
                        vacant.insert(buckets[inner].len());
                        buckets[inner].push(Run {
                            value,
                            indices: vec![outer],
                        });
                    }
                }
                it.advance()?;
            }
        }
        let (store, _) =
            encode_store_from_runs(&buckets, self.layout, DEFAULT_PARALLEL_THRESHOLD)?;
        Ok(SparseMatrix::from_parts(
            self.layout,
            self.order,
            self.outer_dim,
            self.inner_dim,
            self.nnz,
            store,
        ))
    }

    pub fn transpose_in_place(&mut self) -> Result<()> {
        *self = self.transpose()?;
        Ok(())
    }

    /// Re-encode into the other layout (or clone when it already matches).
    pub fn to_layout(&self, layout: Layout) -> Result<SparseMatrix<T, I>> {
        if layout == self.layout {
            return Ok(self.clone());
        }
        let mut lists = Vec::with_capacity(self.outer_dim);
        for outer in 0..self.outer_dim {
            lists.push(self.decode_outer(outer)?);
        }
        let (store, _) = encode_store(&lists, layout, DEFAULT_PARALLEL_THRESHOLD)?;
        Ok(SparseMatrix::from_parts(
            layout,
            self.order,
            self.inner_dim,
            self.outer_dim,
            self.nnz,
            store,
        ))
    }

    /// Decompress to CSC arrays. Fails when the coefficient count overflows
    /// the index type's pointer range.
    pub fn to_csc(&self) -> Result<CscMatrix<T, I>> {
        let rows = self.rows();
        let cols = self.cols();
        let mut per_col: Vec<Vec<(usize, T)>> = vec![Vec::new(); cols];
        match self.order {
            MajorOrder::ColumnMajor => {
                for outer in 0..self.outer_dim {
                    per_col[outer] = self.decode_outer(outer)?;
                }
            }
            MajorOrder::RowMajor => {
                for outer in 0..self.outer_dim {
                    let mut it = self.outer_iter(outer)?;
                    while it.has_more() {
                        per_col[it.index()].push((outer, it.value()));
                        it.advance()?;
                    }
                }
            }
        }
        let overflow = |what: &str| {
            MatrixError::DimensionMismatch(format!(
                "{} does not fit a {}-byte index type",
                what,
                I::WIDTH
            ))
        };
        let mut values = Vec::with_capacity(self.nnz);
        let mut row_indices = Vec::with_capacity(self.nnz);
        let mut col_pointers = Vec::with_capacity(cols + 1);
        col_pointers.push(I::ZERO);
        let mut total = 0usize;
        for entries in &per_col {
            total += entries.len();
            col_pointers.push(I::from_usize(total).ok_or_else(|| overflow("column pointer"))?);
            for &(row, value) in entries {
                row_indices.push(I::from_usize(row).ok_or_else(|| overflow("row index"))?);
                values.push(value);
            }
        }
        Ok(CscMatrix {
            rows,
            cols,
            values,
            row_indices,
            col_pointers,
        })
    }

    /// Decompress into a sink, visiting every stored coefficient once.
    pub fn to_dense_sink<S: MatrixSink<T>>(&self, sink: &mut S) -> Result<()> {
        sink.set_dims(self.rows(), self.cols());
        for outer in 0..self.outer_dim {
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                sink.insert(it.row(), it.col(), it.value());
                it.advance()?;
            }
        }
        Ok(())
    }

    /// Decompress to a column-major dense buffer.
    pub fn to_dense(&self) -> Result<Dense<T>> {
        let mut dense = Dense::zeros(0, 0);
        self.to_dense_sink(&mut dense)?;
        Ok(dense)
    }

    pub(crate) fn store(&self) -> &ColumnStore<T, I> {
        &self.store
    }

    fn triples(&self) -> Result<Vec<(usize, usize, T)>> {
        let mut out = Vec::with_capacity(self.nnz);
        for outer in 0..self.outer_dim {
            let mut it = self.outer_iter(outer)?;
            while it.has_more() {
                out.push((it.row(), it.col(), it.value()));
                it.advance()?;
            }
        }
        out.sort_unstable_by_key(|&(row, col, _)| (row, col));
        Ok(out)
    }
}

impl<T: MatrixValue, I: MatrixIndex> Clone for SparseMatrix<T, I> {
    fn clone(&self) -> Self {
        SparseMatrix {
            layout: self.layout,
            order: self.order,
            inner_dim: self.inner_dim,
            outer_dim: self.outer_dim,
            nnz: self.nnz,
            bytes: self.bytes,
            store: self.store.clone(),
        }
    }
}

/// Element-wise equality on the logical matrix: dimensions and coefficients
/// must agree, layout and storage order may differ.
impl<T: MatrixValue, I: MatrixIndex> PartialEq for SparseMatrix<T, I> {
    fn eq(&self, other: &Self) -> bool {
        if self.rows() != other.rows() || self.cols() != other.cols() || self.nnz != other.nnz {
            return false;
        }
        match (self.triples(), other.triples()) {
            (Ok(a), Ok(b)) => a == b,
            _ => false,
        }
    }
}

impl<T: MatrixValue, I: MatrixIndex> fmt::Debug for SparseMatrix<T, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SparseMatrix")
            .field("layout", &self.layout.as_str())
            .field("order", &self.order.as_str())
            .field("rows", &self.rows())
            .field("cols", &self.cols())
            .field("nnz", &self.nnz)
            .field("bytes", &self.bytes)
            .finish()
    }
}
