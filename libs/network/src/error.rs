//! Transport Error Types
//!
//! Framing and pooling failures. Callers above this crate decide how each one
//! affects endpoint health; nothing here retries.

use thiserror::Error;

/// Failures reading or writing one length-prefixed frame
#[derive(Error, Debug)]
pub enum FramingError {
    /// Deadline elapsed before any byte of the frame arrived, or while sending
    #[error("Timeout error: frame transfer exceeded {waited_ms}ms")]
    Timeout { waited_ms: u64 },

    /// Frame started but did not complete, because the peer closed the stream or
    /// the deadline passed. Counts are relative to the part being read (the 4-byte
    /// prefix, or the body once the prefix is complete).
    #[error("Short read: expected {expected} bytes, received {received}")]
    ShortRead { expected: usize, received: usize },

    /// Length prefix or outgoing body exceeds the configured maximum
    #[error("Frame of {size} bytes exceeds maximum {max}")]
    FrameTooLarge { size: usize, max: usize },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures checking out a pooled connection
#[derive(Error, Debug)]
pub enum PoolError {
    /// Every slot is in use or currently connecting
    #[error("Resource exhausted: all {pool_size} pooled connections are in use")]
    Exhausted { pool_size: usize },

    /// Pool was shut down with `close_all`
    #[error("Connection pool is closed")]
    Closed,

    #[error("Connection error: failed to connect to {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: std::io::Error,
    },
}

pub type FramingResult<T> = std::result::Result<T, FramingError>;
pub type PoolResult<T> = std::result::Result<T, PoolError>;
