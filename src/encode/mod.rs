//! Compression: turning CSC/COO/dense input into encoded column stores.

pub mod column;
pub mod matrix;
pub mod runs;

pub use matrix::EncodeOptions;
pub use runs::Run;
