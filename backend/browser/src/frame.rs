//! Length-prefixed frame codec.
//!
//! Every Marionette message travels as `<decimal byte length>:<payload>`.
//! The codec knows nothing about the payload; it only moves bytes.

use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::time::{Duration, Instant};

use crate::error::FrameError;

/// Default deadline for reading one whole frame. Navigation responses only
/// arrive once the page has loaded, so this is generous.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Default upper bound on a single frame's payload.
pub const DEFAULT_MAX_FRAME_LEN: usize = 64 * 1024 * 1024;

/// `usize::MAX` has 20 decimal digits on 64-bit targets.
const MAX_PREFIX_DIGITS: usize = 20;

const DELIMITER: u8 = b':';

/// Streams whose blocking reads can be bounded by a timeout.
pub trait ReadTimeout {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()>;
}

impl ReadTimeout for TcpStream {
    fn set_read_timeout(&self, timeout: Option<Duration>) -> io::Result<()> {
        TcpStream::set_read_timeout(self, timeout)
    }
}

/// Encode a payload as a complete frame.
pub fn encode_frame(payload: &[u8]) -> Vec<u8> {
    let prefix = payload.len().to_string();
    let mut frame = Vec::with_capacity(prefix.len() + 1 + payload.len());
    frame.extend_from_slice(prefix.as_bytes());
    frame.push(DELIMITER);
    frame.extend_from_slice(payload);
    frame
}

/// Reads and writes frames on an exclusively owned stream.
///
/// No bytes are buffered between calls: each `read_frame` consumes exactly one
/// frame from the stream and nothing beyond it.
#[derive(Debug)]
pub struct FrameCodec<S> {
    stream: S,
    read_timeout: Duration,
    max_frame_len: usize,
}

impl<S> FrameCodec<S>
where
    S: Read + Write + ReadTimeout,
{
    pub fn new(stream: S) -> Self {
        Self {
            stream,
            read_timeout: DEFAULT_READ_TIMEOUT,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_max_frame_len(mut self, max: usize) -> Self {
        self.max_frame_len = max;
        self
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    pub fn get_ref(&self) -> &S {
        &self.stream
    }

    pub fn into_inner(self) -> S {
        self.stream
    }

    /// Write one frame in a single `write_all`.
    pub fn write_frame(&mut self, payload: &[u8]) -> Result<(), FrameError> {
        let frame = encode_frame(payload);
        self.stream.write_all(&frame)?;
        self.stream.flush()?;
        Ok(())
    }

    /// Read one frame, bounded by the codec's read deadline.
    ///
    /// A timeout is reported as a failure of the whole read even when part of
    /// the frame was already consumed; the stream is then out of alignment.
    pub fn read_frame(&mut self) -> Result<Vec<u8>, FrameError> {
        let deadline = Instant::now() + self.read_timeout;
        let len = self.read_size_prefix(deadline)?;
        if len > self.max_frame_len {
            return Err(FrameError::Oversized {
                len,
                max: self.max_frame_len,
            });
        }
        self.read_payload(len, deadline)
    }

    fn read_size_prefix(&mut self, deadline: Instant) -> Result<usize, FrameError> {
        let mut digits = String::new();
        let mut byte = [0u8; 1];

        loop {
            if self.read_some(&mut byte, deadline)? == 0 {
                return Err(FrameError::BadSizePrefix { prefix: digits });
            }
            match byte[0] {
                DELIMITER => break,
                b @ b'0'..=b'9' if digits.len() < MAX_PREFIX_DIGITS => digits.push(b as char),
                other => {
                    digits.push_str(&String::from_utf8_lossy(&[other]));
                    return Err(FrameError::BadSizePrefix { prefix: digits });
                }
            }
        }

        if digits.is_empty() {
            return Err(FrameError::BadSizePrefix { prefix: digits });
        }
        digits
            .parse::<usize>()
            .map_err(|_| FrameError::BadSizePrefix { prefix: digits })
    }

    fn read_payload(&mut self, len: usize, deadline: Instant) -> Result<Vec<u8>, FrameError> {
        let mut payload = vec![0u8; len];
        let mut filled = 0;
        while filled < len {
            match self.read_some(&mut payload[filled..], deadline)? {
                0 => {
                    return Err(FrameError::Truncated {
                        expected: len,
                        received: filled,
                    })
                }
                n => filled += n,
            }
        }
        Ok(payload)
    }

    /// One blocking read with whatever is left of the deadline.
    fn read_some(&mut self, buf: &mut [u8], deadline: Instant) -> Result<usize, FrameError> {
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(FrameError::Timeout);
            }
            self.stream.set_read_timeout(Some(remaining))?;
            match self.stream.read(buf) {
                Ok(n) => return Ok(n),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(FrameError::Timeout)
                }
                Err(e) => return Err(FrameError::Io(e)),
            }
        }
    }
}
