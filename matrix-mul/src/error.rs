//! Error types for matrix-mul operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("communication error: {0}")]
    Comm(#[from] rank_comm::Error),

    #[error("matrix dimension mismatch: A is {0}x{1}, B is {2}x{3}")]
    DimensionMismatch(usize, usize, usize, usize),

    #[error("result must be {expected_rows}x{expected_cols}, got {rows}x{cols}")]
    ResultShape {
        expected_rows: usize,
        expected_cols: usize,
        rows: usize,
        cols: usize,
    },

    #[error("a {rows}x{cols} matrix cannot hold {len} values")]
    Shape { rows: usize, cols: usize, len: usize },

    #[error("source rank {0} is outside a world of size {1}")]
    InvalidSource(usize, usize),

    #[error("parse error: {0}")]
    Parse(#[from] std::num::ParseIntError),

    #[error("usage: {0}")]
    Usage(String),
}
