//! Run-compressed sparse matrix storage.
//!
//! Matrices are stored one compressed column per outer slot, in one of two
//! layouts that both exploit value redundancy: the packed layout
//! (delta-encoded run streams with per-run index widths, schema level 3)
//! and the counted layout (parallel value/count/index arrays, schema
//! level 2). One cursor protocol walks both, and both serialize to a
//! self-describing file format that is fully validated on load.
//!
//! ```
//! use runcol::{Layout, SparseMatrix};
//!
//! let m = SparseMatrix::<i32>::from_triplets(
//!     3,
//!     3,
//!     &[(0, 0, 5), (2, 0, 5), (1, 2, 9)],
//!     Layout::Packed,
//! )?;
//! assert_eq!(m.coeff(2, 0)?, 5);
//!
//! let bytes = m.to_bytes()?;
//! let back = SparseMatrix::<i32>::from_bytes(&bytes)?;
//! assert_eq!(back, m);
//! # Ok::<(), runcol::MatrixError>(())
//! ```

pub mod error;
pub mod value;

pub mod encode;
pub mod format;
pub mod matrix;
pub mod read;

// ── Errors ───────────────────────────────────────────────────────────────────
pub use error::{MatrixError, Result};

// ── Core matrix types ────────────────────────────────────────────────────────
pub use matrix::csc::{CscMatrix, Dense, DenseSource, MatrixSink};
pub use matrix::stats::MatrixStats;
pub use matrix::vector::SparseVector;
pub use matrix::{ColumnRef, SparseMatrix};

// ── Formats ──────────────────────────────────────────────────────────────────
pub use format::metadata::{Metadata, METADATA_LEN};
pub use format::{CountedColumn, Layout, MajorOrder};

// ── Encoding ─────────────────────────────────────────────────────────────────
pub use encode::{EncodeOptions, Run};

// ── Traversal ────────────────────────────────────────────────────────────────
pub use read::{ColumnIter, ColumnIterMut};

// ── Value and index words ────────────────────────────────────────────────────
pub use value::{MatrixIndex, MatrixValue};
