//! Length-prefixed framing
//!
//! Each message on the stream is `[u32 big-endian body length][body]`. Reads are
//! all-or-nothing: a caller either gets the complete body or an error, never a
//! partial frame.
//!
//! A deadline that passes before any byte of the frame arrived is a `Timeout`.
//! Once the frame has started, running out of time or a peer close mid-frame are
//! both a `ShortRead`.

use crate::error::{FramingError, FramingResult};
use crate::stream::ScoringStream;
use byteorder::{BigEndian, ByteOrder};
use bytes::{BufMut, Bytes, BytesMut};
use std::io::{ErrorKind, Read, Write};
use std::time::{Duration, Instant};
use tracing::debug;

/// Bytes in the length prefix
pub const FRAME_HEADER_LEN: usize = 4;

/// Prepend the 4-byte big-endian body length
pub fn frame(body: &[u8]) -> FramingResult<Bytes> {
    let len = u32::try_from(body.len()).map_err(|_| FramingError::FrameTooLarge {
        size: body.len(),
        max: u32::MAX as usize,
    })?;

    let mut header = [0u8; FRAME_HEADER_LEN];
    BigEndian::write_u32(&mut header, len);

    let mut framed = BytesMut::with_capacity(FRAME_HEADER_LEN + body.len());
    framed.put_slice(&header);
    framed.put_slice(body);
    Ok(framed.freeze())
}

/// Frame `body` and write it in full within `timeout`
pub fn write_framed<S: ScoringStream>(
    stream: &mut S,
    body: &[u8],
    timeout: Duration,
) -> FramingResult<()> {
    let framed = frame(body)?;
    stream.set_send_timeout(Some(timeout))?;

    stream
        .write_all(&framed)
        .and_then(|_| stream.flush())
        .map_err(|e| match e.kind() {
            ErrorKind::WouldBlock | ErrorKind::TimedOut => FramingError::Timeout {
                waited_ms: timeout.as_millis() as u64,
            },
            _ => FramingError::Io(e),
        })?;

    debug!(bytes = body.len(), "Sent framed message");
    Ok(())
}

/// Read one complete frame, failing if the whole frame has not arrived by the deadline
pub fn read_framed<S: ScoringStream>(
    stream: &mut S,
    timeout: Duration,
    max_frame_size: usize,
) -> FramingResult<Bytes> {
    let deadline = Instant::now() + timeout;

    let mut header = [0u8; FRAME_HEADER_LEN];
    read_exact_until(stream, &mut header, deadline, timeout, false)?;

    let len = BigEndian::read_u32(&header) as usize;
    if len > max_frame_size {
        return Err(FramingError::FrameTooLarge {
            size: len,
            max: max_frame_size,
        });
    }

    let mut body = vec![0u8; len];
    read_exact_until(stream, &mut body, deadline, timeout, true)?;

    debug!(bytes = len, "Received framed message");
    Ok(Bytes::from(body))
}

/// `frame_started` is set once earlier parts of the frame were read
fn read_exact_until<S: ScoringStream>(
    stream: &mut S,
    buf: &mut [u8],
    deadline: Instant,
    timeout: Duration,
    frame_started: bool,
) -> FramingResult<()> {
    let expected = buf.len();
    let out_of_time = |filled: usize| {
        if frame_started || filled > 0 {
            FramingError::ShortRead {
                expected,
                received: filled,
            }
        } else {
            FramingError::Timeout {
                waited_ms: timeout.as_millis() as u64,
            }
        }
    };

    let mut filled = 0;
    while filled < buf.len() {
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return Err(out_of_time(filled));
        }
        stream.set_recv_timeout(Some(remaining))?;

        match stream.read(&mut buf[filled..]) {
            Ok(0) => {
                return Err(FramingError::ShortRead {
                    expected,
                    received: filled,
                })
            }
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                return Err(out_of_time(filled))
            }
            Err(e) => return Err(FramingError::Io(e)),
        }
    }
    Ok(())
}
