//! Error types for the Marionette client.
//!
//! Each layer has its own enum: framing ([`FrameError`]), envelope encoding
//! ([`EncodeError`]) and decoding ([`DecodeError`]), the remote endpoint's own
//! rejection ([`ProtocolError`]), and the client-level [`ClientError`] that
//! wraps all of them.

use std::fmt;
use std::io;

use thiserror::Error;

use crate::client::ConnectionState;

/// Result alias used throughout the client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Transport-level failure while reading or writing a frame.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("bad frame size prefix: {prefix:?}")]
    BadSizePrefix { prefix: String },

    #[error("frame truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    #[error("timed out reading frame")]
    Timeout,

    #[error("frame of {len} bytes exceeds the {max} byte limit")]
    Oversized { len: usize, max: usize },

    #[error("frame I/O error: {0}")]
    Io(#[from] io::Error),
}

/// The outgoing envelope could not be produced.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("command parameters for {command} must serialize to a JSON object")]
    ParamsNotObject { command: String },

    #[error("failed to serialize command envelope: {0}")]
    Json(#[from] serde_json::Error),
}

/// A frame was read but does not carry valid protocol data.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("frame is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),

    #[error("malformed envelope: {0}")]
    MalformedEnvelope(String),
}

/// An error reported by the remote end in slot 2 of a response envelope.
///
/// `kind` is the machine-readable WebDriver error code (e.g. `invalid session
/// id`), `detail` the human-readable message and `trace` the remote stack.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub struct ProtocolError {
    kind: String,
    detail: Option<String>,
    trace: Option<String>,
}

/// Kind used when the remote error object carries no `error` field.
pub const UNKNOWN_ERROR_KIND: &str = "unknown error";

impl ProtocolError {
    pub fn new(
        kind: impl Into<String>,
        detail: Option<String>,
        trace: Option<String>,
    ) -> Self {
        let kind = kind.into();
        Self {
            kind: if kind.is_empty() {
                UNKNOWN_ERROR_KIND.to_string()
            } else {
                kind
            },
            detail: detail.filter(|d| !d.is_empty()),
            trace: trace.filter(|t| !t.is_empty()),
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn trace(&self) -> Option<&str> {
        self.trace.as_deref()
    }
}

impl fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ProtocolError Kind: {}", self.kind)?;
        if let Some(detail) = &self.detail {
            write!(f, ", Detail: {detail}")?;
        }
        if let Some(trace) = &self.trace {
            write!(f, ", Trace: {trace}")?;
        }
        Ok(())
    }
}

/// Why the handshake step failed.
#[derive(Debug, Error)]
pub enum InitError {
    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("first frame was not a handshake")]
    NotHandshake,
}

/// Top-level error type for client operations.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("could not open connection to {addr}: {source}")]
    Connection {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("session initialisation failed: {0}")]
    Init(#[source] InitError),

    #[error(transparent)]
    Frame(#[from] FrameError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error("protocol violation in {command}: {detail}")]
    ProtocolViolation { command: String, detail: String },

    #[error(transparent)]
    Remote(#[from] ProtocolError),

    #[error("client is {actual}, operation requires {expected}")]
    InvalidState {
        expected: ConnectionState,
        actual: ConnectionState,
    },
}

impl ClientError {
    pub fn protocol_violation(command: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ProtocolViolation {
            command: command.into(),
            detail: detail.into(),
        }
    }

    /// The remote error, if this failure was reported by the remote end.
    pub fn as_remote(&self) -> Option<&ProtocolError> {
        match self {
            Self::Remote(err) => Some(err),
            _ => None,
        }
    }
}
