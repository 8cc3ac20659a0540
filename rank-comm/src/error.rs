//! Error types for rank-comm operations.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("gRPC transport error: {0}")]
    Transport(#[from] tonic::transport::Error),

    #[error("gRPC status error: {0}")]
    Status(#[from] tonic::Status),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("world size must be at least 1")]
    EmptyWorld,

    #[error("rank {rank} is outside a world of size {world_size}")]
    InvalidRank { rank: usize, world_size: usize },

    #[error("slice at {offset} of length {len} exceeds buffer of {buffer_len} elements")]
    OutOfBounds {
        offset: usize,
        len: usize,
        buffer_len: usize,
    },

    #[error("expected {expected} elements from rank {peer}, got {actual}")]
    LengthMismatch {
        peer: usize,
        expected: usize,
        actual: usize,
    },

    #[error("malformed payload of {0} bytes")]
    MalformedPayload(usize),

    #[error("unknown envelope kind {0}")]
    UnknownKind(i32),

    #[error("receive task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl Error {
    pub(crate) fn check_rank(rank: usize, world_size: usize) -> Result<(), Error> {
        if rank < world_size {
            Ok(())
        } else {
            Err(Error::InvalidRank { rank, world_size })
        }
    }

    pub(crate) fn check_extent(offset: usize, len: usize, buffer_len: usize) -> Result<(), Error> {
        match offset.checked_add(len) {
            Some(end) if end <= buffer_len => Ok(()),
            _ => Err(Error::OutOfBounds {
                offset,
                len,
                buffer_len,
            }),
        }
    }

    pub(crate) fn check_len(peer: usize, expected: usize, actual: usize) -> Result<(), Error> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::LengthMismatch {
                peer,
                expected,
                actual,
            })
        }
    }
}
