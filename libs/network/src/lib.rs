//! # Scoring Network Infrastructure
//!
//! Blocking stream plumbing between the scoring client and the remote scoring service:
//!
//! - [`framer`]: `[4-byte big-endian length][body]` framing with all-or-nothing,
//!   deadline-bounded reads
//! - [`stream`]: the [`ScoringStream`] / [`Connector`] seams and the TCP implementation
//! - [`pool`]: a bounded pool of persistent connections with checkout/return discipline
//!
//! No TLS and no application-level authentication are spoken on this link.

pub mod error;
pub mod framer;
pub mod pool;
pub mod stream;

pub use error::{FramingError, FramingResult, PoolError, PoolResult};
pub use framer::{frame, read_framed, write_framed, FRAME_HEADER_LEN};
pub use pool::{ConnectionPool, PoolStats, PooledConnection};
pub use stream::{Connector, ScoringStream, TcpConnector};

