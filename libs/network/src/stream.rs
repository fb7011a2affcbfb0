//! Stream and connector seams
//!
//! The pool and framer only need a blocking duplex byte stream with adjustable
//! timeouts and a non-destructive liveness probe. [`TcpConnector`] is the
//! production implementation; tests may supply their own.

use std::io::{self, ErrorKind, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Blocking duplex stream to the scoring service
pub trait ScoringStream: Read + Write + Send {
    /// Bound the next blocking read. `None` blocks indefinitely.
    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Bound the next blocking write. `None` blocks indefinitely.
    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;

    /// Non-destructive check that an idle stream is still usable
    ///
    /// Alive means the stream is open with nothing pending. Peer close, socket
    /// errors, and unsolicited pending bytes all count as dead.
    fn probe_alive(&self) -> bool;

    /// Close the underlying stream. Errors are ignored.
    fn close(&self);
}

/// Opens new streams to one endpoint
pub trait Connector: Send + Sync {
    type Stream: ScoringStream;

    fn connect(&self) -> io::Result<Self::Stream>;

    fn endpoint(&self) -> &str;
}

impl ScoringStream for TcpStream {
    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_write_timeout(timeout)
    }

    fn probe_alive(&self) -> bool {
        if self.set_nonblocking(true).is_err() {
            return false;
        }
        let mut byte = [0u8; 1];
        let alive = match self.peek(&mut byte) {
            Err(e) if e.kind() == ErrorKind::WouldBlock => true,
            Ok(0) => false,
            Ok(pending) => {
                warn!(pending, "Idle connection has unsolicited bytes pending");
                false
            }
            Err(e) => {
                debug!(error = %e, "Liveness probe failed");
                false
            }
        };
        alive && self.set_nonblocking(false).is_ok()
    }

    fn close(&self) {
        let _ = self.shutdown(Shutdown::Both);
    }
}

/// TCP connector with a bounded connect timeout
///
/// The endpoint is resolved once at construction, so no name lookup happens on the
/// request path. All resolved addresses share one `connect_timeout` budget per
/// connect.
#[derive(Debug, Clone)]
pub struct TcpConnector {
    endpoint: String,
    addrs: Vec<SocketAddr>,
    connect_timeout: Duration,
}

impl TcpConnector {
    /// Resolve a `host:port` endpoint
    pub fn new(endpoint: impl Into<String>, connect_timeout: Duration) -> io::Result<Self> {
        let endpoint = endpoint.into();
        let addrs: Vec<SocketAddr> = endpoint.to_socket_addrs()?.collect();
        if addrs.is_empty() {
            return Err(io::Error::new(
                ErrorKind::NotFound,
                format!("{} resolved to no addresses", endpoint),
            ));
        }
        debug!(endpoint = %endpoint, addrs = ?addrs, "Resolved scoring endpoint");
        Ok(Self::from_addrs(endpoint, addrs, connect_timeout))
    }

    /// Use already-resolved addresses, tried in order
    pub fn from_addrs(
        endpoint: impl Into<String>,
        addrs: Vec<SocketAddr>,
        connect_timeout: Duration,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            addrs,
            connect_timeout,
        }
    }

    pub fn addrs(&self) -> &[SocketAddr] {
        &self.addrs
    }
}

impl Connector for TcpConnector {
    type Stream = TcpStream;

    fn connect(&self) -> io::Result<TcpStream> {
        let deadline = Instant::now() + self.connect_timeout;
        let mut last_error = None;

        for addr in &self.addrs {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }
            // connect_timeout connects non-blocking and hands back a blocking stream
            match TcpStream::connect_timeout(addr, remaining) {
                Ok(stream) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!("Failed to set TCP_NODELAY: {}", e);
                    }
                    debug!(endpoint = %self.endpoint, peer = %addr, "Connected to scoring service");
                    return Ok(stream);
                }
                Err(e) => {
                    debug!(peer = %addr, error = %e, "Connect attempt failed");
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| {
            io::Error::new(
                ErrorKind::TimedOut,
                format!(
                    "connect to {} exceeded {}ms",
                    self.endpoint,
                    self.connect_timeout.as_millis()
                ),
            )
        }))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}
