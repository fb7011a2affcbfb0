//! Connection Pool for Scoring Service Streams
//!
//! A fixed number of slots, each holding at most one persistent stream to the
//! scoring endpoint. Streams are created lazily on first need and reused across
//! requests so a trade never pays for a connect handshake when an idle stream is
//! available.
//!
//! Slot lifecycle: `Empty → Connecting → InUse → Idle → InUse → …`; an idle stream
//! that fails its liveness probe is closed and its slot returns to `Empty`.
//!
//! The pool lock is held only for slot bookkeeping and the non-blocking liveness
//! probe. Connecting, sending and receiving all happen outside it.

use crate::error::{PoolError, PoolResult};
use crate::stream::{Connector, ScoringStream};
use parking_lot::Mutex;
use std::io::{self, ErrorKind, Read, Write};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

enum Slot<S> {
    Empty,
    Connecting,
    Idle { stream: S, idle_since: Instant },
    InUse,
}

/// Bounded pool of persistent connections to one endpoint
pub struct ConnectionPool<C: Connector> {
    connector: C,
    slots: Mutex<Vec<Slot<C::Stream>>>,
    closed: AtomicBool,
    connects: AtomicU64,
    dead_evictions: AtomicU64,
}

impl<C: Connector> ConnectionPool<C> {
    /// Create a pool with `pool_size` empty slots. No connection is opened yet.
    pub fn new(connector: C, pool_size: usize) -> Self {
        let slots = (0..pool_size).map(|_| Slot::Empty).collect();
        info!(
            endpoint = connector.endpoint(),
            pool_size, "Created scoring connection pool"
        );
        Self {
            connector,
            slots: Mutex::new(slots),
            closed: AtomicBool::new(false),
            connects: AtomicU64::new(0),
            dead_evictions: AtomicU64::new(0),
        }
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }

    pub fn pool_size(&self) -> usize {
        self.slots.lock().len()
    }

    /// Check out a live connection, opening one in a free slot if no idle one survives
    ///
    /// Fails with [`PoolError::Closed`] once [`close_all`](Self::close_all) has run.
    pub fn checkout(&self) -> PoolResult<PooledConnection<'_, C>> {
        if self.is_closed() {
            return Err(PoolError::Closed);
        }

        // Fast path: reuse an idle stream that passes the liveness probe
        let slot = {
            let mut slots = self.slots.lock();
            let pool_size = slots.len();

            for (index, slot) in slots.iter_mut().enumerate() {
                if !matches!(slot, Slot::Idle { .. }) {
                    continue;
                }
                if let Slot::Idle { stream, idle_since } = std::mem::replace(slot, Slot::InUse) {
                    if stream.probe_alive() {
                        debug!(slot = index, "Reusing pooled connection");
                        return Ok(PooledConnection::new(self, index, stream));
                    }
                    warn!(
                        slot = index,
                        idle_ms = idle_since.elapsed().as_millis() as u64,
                        endpoint = self.connector.endpoint(),
                        "Pooled connection is dead, closing"
                    );
                    stream.close();
                    *slot = Slot::Empty;
                    self.dead_evictions.fetch_add(1, Ordering::Relaxed);
                }
            }

            match slots.iter().position(|s| matches!(s, Slot::Empty)) {
                Some(index) => {
                    slots[index] = Slot::Connecting;
                    index
                }
                None => return Err(PoolError::Exhausted { pool_size }),
            }
        };

        // Slow path: connect without holding the pool lock
        match self.connector.connect() {
            Ok(stream) => {
                self.connects.fetch_add(1, Ordering::Relaxed);
                self.set_slot(slot, Slot::InUse);
                info!(
                    slot,
                    endpoint = self.connector.endpoint(),
                    "Opened pooled connection"
                );
                Ok(PooledConnection::new(self, slot, stream))
            }
            Err(source) => {
                self.set_slot(slot, Slot::Empty);
                Err(PoolError::Connect {
                    endpoint: self.connector.endpoint().to_string(),
                    source,
                })
            }
        }
    }

    /// Hand a connection back for reuse. The stream stays open.
    pub fn return_connection(&self, conn: PooledConnection<'_, C>) {
        drop(conn);
    }

    /// Close every idle stream and refuse further checkouts.
    /// Streams currently checked out are closed when they come back.
    pub fn close_all(&self) {
        self.closed.store(true, Ordering::Release);
        let mut slots = self.slots.lock();
        let mut closed = 0;
        for slot in slots.iter_mut() {
            if !matches!(slot, Slot::Idle { .. }) {
                continue;
            }
            if let Slot::Idle { stream, .. } = std::mem::replace(slot, Slot::Empty) {
                stream.close();
                closed += 1;
            }
        }
        if closed > 0 {
            info!(
                closed,
                endpoint = self.connector.endpoint(),
                "Closed pooled connections"
            );
        }
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> PoolStats {
        let slots = self.slots.lock();
        let mut stats = PoolStats {
            pool_size: slots.len(),
            connects: self.connects.load(Ordering::Relaxed),
            dead_evictions: self.dead_evictions.load(Ordering::Relaxed),
            ..Default::default()
        };
        for slot in slots.iter() {
            match slot {
                Slot::Empty => stats.empty += 1,
                Slot::Connecting => stats.connecting += 1,
                Slot::Idle { .. } => stats.idle += 1,
                Slot::InUse => stats.in_use += 1,
            }
        }
        stats
    }

    fn set_slot(&self, index: usize, state: Slot<C::Stream>) {
        let mut slots = self.slots.lock();
        if let Some(slot) = slots.get_mut(index) {
            *slot = state;
        }
    }

    fn give_back(&self, index: usize, stream: C::Stream) {
        if self.is_closed() {
            stream.close();
            self.set_slot(index, Slot::Empty);
            return;
        }
        self.set_slot(
            index,
            Slot::Idle {
                stream,
                idle_since: Instant::now(),
            },
        );
        debug!(slot = index, "Returned connection to pool");
    }

    fn discard(&self, index: usize, stream: C::Stream) {
        stream.close();
        self.set_slot(index, Slot::Empty);
        debug!(slot = index, "Discarded pooled connection");
    }
}

impl<C: Connector> Drop for ConnectionPool<C> {
    fn drop(&mut self) {
        self.close_all();
    }
}

/// Pool statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pool_size: usize,
    pub idle: usize,
    pub in_use: usize,
    pub connecting: usize,
    pub empty: usize,
    /// Streams opened over the pool's lifetime
    pub connects: u64,
    /// Idle streams closed after failing the liveness probe
    pub dead_evictions: u64,
}

/// Exclusive handle on one pooled stream
///
/// Dropping the handle returns the stream to its slot. Call [`discard`](Self::discard)
/// instead when the stream can no longer be trusted, for example after a failed or
/// timed-out exchange left unread bytes behind.
pub struct PooledConnection<'a, C: Connector> {
    pool: &'a ConnectionPool<C>,
    slot: usize,
    stream: Option<C::Stream>,
}

impl<'a, C: Connector> PooledConnection<'a, C> {
    fn new(pool: &'a ConnectionPool<C>, slot: usize, stream: C::Stream) -> Self {
        Self {
            pool,
            slot,
            stream: Some(stream),
        }
    }

    pub fn slot(&self) -> usize {
        self.slot
    }

    /// Return the stream to the pool for reuse
    pub fn release(self) {
        drop(self);
    }

    /// Close the stream and free the slot for a fresh connection
    pub fn discard(mut self) {
        if let Some(stream) = self.stream.take() {
            self.pool.discard(self.slot, stream);
        }
    }

    fn stream(&self) -> io::Result<&C::Stream> {
        self.stream
            .as_ref()
            .ok_or_else(|| io::Error::from(ErrorKind::NotConnected))
    }

    fn stream_mut(&mut self) -> io::Result<&mut C::Stream> {
        self.stream
            .as_mut()
            .ok_or_else(|| io::Error::from(ErrorKind::NotConnected))
    }
}

impl<C: Connector> Drop for PooledConnection<'_, C> {
    fn drop(&mut self) {
        if let Some(stream) = self.stream.take() {
            self.pool.give_back(self.slot, stream);
        }
    }
}

impl<C: Connector> Read for PooledConnection<'_, C> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.stream_mut()?.read(buf)
    }
}

impl<C: Connector> Write for PooledConnection<'_, C> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream_mut()?.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream_mut()?.flush()
    }
}

impl<C: Connector> ScoringStream for PooledConnection<'_, C> {
    fn set_recv_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream()?.set_recv_timeout(timeout)
    }

    fn set_send_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        self.stream()?.set_send_timeout(timeout)
    }

    fn probe_alive(&self) -> bool {
        self.stream().map(|s| s.probe_alive()).unwrap_or(false)
    }

    fn close(&self) {
        if let Ok(stream) = self.stream() {
            stream.close();
        }
    }
}
