//! Scoring client errors
//!
//! Every variant is caught inside [`ResilientScoringClient::get_score`](crate::ResilientScoringClient::get_score)
//! and turned into a fallback score. None of them reaches the caller.

use codec::DecodeError;
use network::{FramingError, PoolError};
use std::io;
use thiserror::Error;

/// Why a remote score could not be obtained
#[derive(Debug, Error)]
pub enum ScoringError {
    #[error("Failed to connect to scoring service at {endpoint}: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("All {pool_size} pooled connections are in use")]
    PoolExhausted { pool_size: usize },

    #[error("Client has been shut down")]
    PoolClosed,

    #[error("Failed to send scoring request: {0}")]
    Send(#[source] FramingError),

    #[error("No complete response within {waited_ms}ms")]
    RecvTimeout { waited_ms: u64 },

    #[error("Response cut short after {received} of {expected} bytes")]
    RecvShort { expected: usize, received: usize },

    #[error("Failed to receive scoring response: {0}")]
    Recv(#[source] io::Error),

    #[error("Response frame of {size} bytes exceeds limit of {max}")]
    ResponseTooLarge { size: usize, max: usize },

    #[error("Malformed scoring response: {0}")]
    Decode(#[from] DecodeError),

    #[error("Response carries no score in field {field}")]
    ScoreMissing { field: u32 },

    #[error("Score {score} is outside [0, 1]")]
    ScoreOutOfRange { score: f32 },
}

/// Failure classes tracked by [`ScoringStats`](crate::ScoringStats)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Connect,
    PoolExhausted,
    Send,
    RecvTimeout,
    RecvShort,
    Decode,
    InvalidScore,
}

impl ScoringError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ScoringError::Connect { .. } => FailureKind::Connect,
            ScoringError::PoolExhausted { .. } | ScoringError::PoolClosed => {
                FailureKind::PoolExhausted
            }
            ScoringError::Send(_) => FailureKind::Send,
            ScoringError::RecvTimeout { .. } => FailureKind::RecvTimeout,
            // A reset mid-response is the same condition as an orderly close
            ScoringError::RecvShort { .. } | ScoringError::Recv(_) => FailureKind::RecvShort,
            ScoringError::ResponseTooLarge { .. } | ScoringError::Decode(_) => FailureKind::Decode,
            ScoringError::ScoreMissing { .. } | ScoringError::ScoreOutOfRange { .. } => {
                FailureKind::InvalidScore
            }
        }
    }
}

impl From<PoolError> for ScoringError {
    fn from(err: PoolError) -> Self {
        match err {
            PoolError::Exhausted { pool_size } => ScoringError::PoolExhausted { pool_size },
            PoolError::Closed => ScoringError::PoolClosed,
            PoolError::Connect { endpoint, source } => ScoringError::Connect { endpoint, source },
        }
    }
}

/// Receive-side framing failures. Send-side failures are wrapped in [`ScoringError::Send`].
impl From<FramingError> for ScoringError {
    fn from(err: FramingError) -> Self {
        match err {
            FramingError::Timeout { waited_ms } => ScoringError::RecvTimeout { waited_ms },
            FramingError::ShortRead { expected, received } => {
                ScoringError::RecvShort { expected, received }
            }
            FramingError::FrameTooLarge { size, max } => {
                ScoringError::ResponseTooLarge { size, max }
            }
            FramingError::Io(e) => ScoringError::Recv(e),
        }
    }
}

pub type ScoringResult<T> = std::result::Result<T, ScoringError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_framing_errors_map_to_receive_classes() {
        let timeout: ScoringError = FramingError::Timeout { waited_ms: 5000 }.into();
        assert_eq!(timeout.kind(), FailureKind::RecvTimeout);

        let short: ScoringError = FramingError::ShortRead {
            expected: 10,
            received: 6,
        }
        .into();
        assert!(matches!(
            short,
            ScoringError::RecvShort {
                expected: 10,
                received: 6
            }
        ));

        let large: ScoringError = FramingError::FrameTooLarge { size: 9, max: 4 }.into();
        assert_eq!(large.kind(), FailureKind::Decode);
    }

    #[test]
    fn test_pool_errors_map() {
        let exhausted: ScoringError = PoolError::Exhausted { pool_size: 4 }.into();
        assert_eq!(exhausted.kind(), FailureKind::PoolExhausted);

        let closed: ScoringError = PoolError::Closed.into();
        assert!(matches!(closed, ScoringError::PoolClosed));

        let connect: ScoringError = PoolError::Connect {
            endpoint: "127.0.0.1:1".to_string(),
            source: io::Error::from(io::ErrorKind::ConnectionRefused),
        }
        .into();
        assert_eq!(connect.kind(), FailureKind::Connect);
        assert!(connect.to_string().contains("127.0.0.1:1"));
    }

    #[test]
    fn test_score_failures_share_a_class() {
        assert_eq!(
            ScoringError::ScoreMissing { field: 1 }.kind(),
            ScoringError::ScoreOutOfRange { score: 1.5 }.kind()
        );
    }
}
