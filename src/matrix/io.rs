//! Matrix file serialization.
//!
//! Both layouts share the 24-byte header described in
//! [`format::metadata`](crate::format::metadata); everything after it is
//! layout-specific.
//!
//! ## Packed file body
//!
//! ```text
//! col_bytes: outer_dim x u64   per-column payload length, 0 = empty column
//! payloads:  concatenated packed run streams, in outer order
//! ```
//!
//! ## Counted file body
//!
//! ```text
//! value_counts: outer_dim x I   runs per column, 0 = empty column
//! index_counts: outer_dim x I   coefficients per column
//! values:       per column, value_counts[k] x T
//! counts:       per column, value_counts[k] x I
//! indices:      per column, index_counts[k] x I
//! ```
//!
//! Loading is a full decode walk: header tags are matched against the
//! instantiated types, every column is bounds-checked, and the coefficient
//! total is cross-checked against the header before a matrix is returned.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use tracing::debug;

use crate::encode::column::alloc_err;
use crate::error::Result;
use crate::format::cursor::{checked_range, corrupt, read_uint};
use crate::format::metadata::{Metadata, METADATA_LEN};
use crate::format::{CountedColumn, Layout};
use crate::matrix::{ColumnStore, SparseMatrix};
use crate::read::packed::validate_packed;
use crate::value::{MatrixIndex, MatrixValue};

impl<T: MatrixValue, I: MatrixIndex> SparseMatrix<T, I> {
    fn metadata(&self) -> Result<Metadata> {
        Metadata::new::<T, I>(
            self.layout(),
            self.order(),
            self.inner_dim(),
            self.outer_dim(),
            self.nnz(),
        )
    }

    /// Serialize to an in-memory buffer.
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let meta = self.metadata()?;
        let table_bytes = match self.store() {
            ColumnStore::Packed(_) => self.outer_dim() * 8,
            ColumnStore::Counted(_) => self.outer_dim() * 2 * I::WIDTH,
        };
        let total = METADATA_LEN + table_bytes + self.byte_size();
        let mut out = Vec::new();
        out.try_reserve_exact(total)
            .map_err(|_| alloc_err("a serialized matrix", total))?;
        meta.write_le(&mut out);
        match self.store() {
            ColumnStore::Packed(cols) => {
                for col in cols {
                    let len = col.as_ref().map_or(0, |buf| buf.len()) as u64;
                    out.extend_from_slice(&len.to_le_bytes());
                }
                for col in cols.iter().flatten() {
                    out.extend_from_slice(col);
                }
            }
            ColumnStore::Counted(cols) => {
                let size = |n: usize| -> Result<I> {
                    I::from_usize(n).ok_or_else(|| {
                        corrupt(format!("size {} does not fit a {}-byte index", n, I::WIDTH))
                    })
                };
                for col in cols {
                    size(col.as_ref().map_or(0, |c| c.values().len()))?.write_le(&mut out);
                }
                for col in cols {
                    size(col.as_ref().map_or(0, |c| c.indices().len()))?.write_le(&mut out);
                }
                for col in cols.iter().flatten() {
                    for &value in col.values() {
                        value.write_le(&mut out);
                    }
                }
                for col in cols.iter().flatten() {
                    for &count in col.counts() {
                        count.write_le(&mut out);
                    }
                }
                for col in cols.iter().flatten() {
                    for &index in col.indices() {
                        index.write_le(&mut out);
                    }
                }
            }
        }
        Ok(out)
    }

    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let bytes = self.to_bytes()?;
        writer.write_all(&bytes)?;
        debug!(
            layout = self.layout().as_str(),
            bytes = bytes.len(),
            "wrote matrix"
        );
        Ok(())
    }

    pub fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let mut file = File::create(path)?;
        self.write_to(&mut file)
    }

    /// Deserialize from an in-memory buffer, validating header tags and
    /// every column before trusting the data.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let meta = Metadata::read_le(bytes)?;
        let layout = meta.layout()?;
        meta.validate_types::<T, I>()?;
        let inner_dim = meta.inner_dim as usize;
        let outer_dim = meta.outer_dim as usize;
        let (store, nnz) = match layout {
            Layout::Packed => read_packed_store::<T, I>(bytes, inner_dim, outer_dim)?,
            Layout::Counted => read_counted_store::<T, I>(bytes, inner_dim, outer_dim)?,
        };
        if nnz != meta.nnz as usize {
            return Err(corrupt(format!(
                "header claims {} nonzeros but the payload holds {}",
                meta.nnz, nnz
            )));
        }
        debug!(
            layout = layout.as_str(),
            inner_dim, outer_dim, nnz, "read matrix"
        );
        Ok(SparseMatrix::from_parts(
            layout,
            meta.major_order(),
            inner_dim,
            outer_dim,
            nnz,
            store,
        ))
    }

    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        Self::from_bytes(&bytes)
    }

    pub fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }
}

fn read_packed_store<T: MatrixValue, I: MatrixIndex>(
    bytes: &[u8],
    inner_dim: usize,
    outer_dim: usize,
) -> Result<(ColumnStore<T, I>, usize)> {
    let mut pos = METADATA_LEN;
    let mut lens = Vec::with_capacity(outer_dim);
    for _ in 0..outer_dim {
        let len = read_uint(bytes, pos, 8, "column length table")?;
        lens.push(
            usize::try_from(len)
                .map_err(|_| corrupt("column length exceeds the address space"))?,
        );
        pos += 8;
    }
    let mut cols = Vec::with_capacity(outer_dim);
    let mut nnz = 0usize;
    for len in lens {
        if len == 0 {
            cols.push(None);
            continue;
        }
        let payload = checked_range(bytes, pos, len, "column payload")?;
        nnz += validate_packed::<T>(payload, inner_dim)?;
        let mut buf = Vec::new();
        buf.try_reserve_exact(len)
            .map_err(|_| alloc_err("a packed column", len))?;
        buf.extend_from_slice(payload);
        cols.push(Some(buf.into_boxed_slice()));
        pos += len;
    }
    if pos != bytes.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after the last column",
            bytes.len() - pos
        )));
    }
    Ok((ColumnStore::Packed(cols), nnz))
}

fn read_counted_store<T: MatrixValue, I: MatrixIndex>(
    bytes: &[u8],
    inner_dim: usize,
    outer_dim: usize,
) -> Result<(ColumnStore<T, I>, usize)> {
    let mut pos = METADATA_LEN;
    let mut read_sizes = |what: &'static str| -> Result<Vec<usize>> {
        let mut sizes = Vec::with_capacity(outer_dim);
        for _ in 0..outer_dim {
            let slice = checked_range(bytes, pos, I::WIDTH, what)?;
            sizes.push(I::read_le(slice).to_usize());
            pos += I::WIDTH;
        }
        Ok(sizes)
    };
    let value_counts = read_sizes("run count table")?;
    let index_counts = read_sizes("index count table")?;

    let mut values_per = Vec::with_capacity(outer_dim);
    for &n in &value_counts {
        let len = n
            .checked_mul(T::WIDTH)
            .ok_or_else(|| corrupt("value section size overflows"))?;
        let section = checked_range(bytes, pos, len, "column values")?;
        let mut values = Vec::new();
        values
            .try_reserve_exact(n)
            .map_err(|_| alloc_err("counted column values", len))?;
        for chunk in section.chunks_exact(T::WIDTH) {
            values.push(T::read_le(chunk));
        }
        values_per.push(values);
        pos += len;
    }
    let mut read_index_sections = |counts: &[usize], what: &'static str| -> Result<Vec<Vec<I>>> {
        let mut sections = Vec::with_capacity(outer_dim);
        for &n in counts {
            let len = n
                .checked_mul(I::WIDTH)
                .ok_or_else(|| corrupt("index section size overflows"))?;
            let section = checked_range(bytes, pos, len, what)?;
            let mut words = Vec::new();
            words
                .try_reserve_exact(n)
                .map_err(|_| alloc_err("counted column indices", len))?;
            for chunk in section.chunks_exact(I::WIDTH) {
                words.push(I::read_le(chunk));
            }
            sections.push(words);
            pos += len;
        }
        Ok(sections)
    };
    let counts_per = read_index_sections(&value_counts, "column counts")?;
    let indices_per = read_index_sections(&index_counts, "column indices")?;

    if pos != bytes.len() {
        return Err(corrupt(format!(
            "{} trailing bytes after the last column",
            bytes.len() - pos
        )));
    }

    let mut cols = Vec::with_capacity(outer_dim);
    let mut nnz = 0usize;
    for ((values, counts), indices) in values_per
        .into_iter()
        .zip(counts_per.into_iter())
        .zip(indices_per.into_iter())
    {
        if values.is_empty() && counts.is_empty() && indices.is_empty() {
            cols.push(None);
            continue;
        }
        let col = CountedColumn::new(values, counts, indices);
        col.validate(inner_dim)?;
        nnz += col.nonzeros();
        cols.push(Some(col));
    }
    Ok((ColumnStore::Counted(cols), nnz))
}
