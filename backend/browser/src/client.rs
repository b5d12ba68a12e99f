//! Marionette protocol client.
//!
//! Owns one TCP connection to a Marionette endpoint and drives it through
//! `Disconnected -> Connected -> Ready -> Closed`. Every command is a blocking
//! round trip: exactly one request is in flight at a time.

use std::fmt;
use std::io;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Map, Value};
use tracing::{debug, trace};

use crate::envelope::{self, HandshakeInfo, Incoming};
use crate::error::{ClientError, ClientResult, EncodeError, InitError, ProtocolError};
use crate::frame::{FrameCodec, DEFAULT_MAX_FRAME_LEN, DEFAULT_READ_TIMEOUT};

pub const DEFAULT_HOST: &str = "localhost";
pub const DEFAULT_PORT: u16 = 2828;

pub const NEW_SESSION: &str = "WebDriver:NewSession";

/// Connection parameters for [`MarionetteClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientOptions {
    pub host: String,
    pub port: u16,
    /// Deadline for reading one whole response frame.
    pub read_timeout: Duration,
    /// Bound on opening the socket; `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    pub max_frame_len: usize,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            read_timeout: DEFAULT_READ_TIMEOUT,
            connect_timeout: None,
            max_frame_len: DEFAULT_MAX_FRAME_LEN,
        }
    }
}

impl ClientOptions {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = Some(timeout);
        self
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Lifecycle of a client's connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    /// Socket open, handshake not yet read.
    Connected,
    /// Handshake consumed; commands may be sent.
    Ready,
    Closed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connected => "connected",
            Self::Ready => "ready",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

/// Sees every command envelope the client sends and the outcome read back
/// for it. Events for one command share its correlation id.
pub trait CommandObserver {
    fn command_sent(&mut self, _id: u64, _name: &str, _params: &Value) {}
    fn response_received(&mut self, _id: u64, _payload: &Map<String, Value>) {}
    fn remote_error(&mut self, _id: u64, _error: &ProtocolError) {}
}

/// Blocking client for one Marionette connection.
///
/// Not meant to be shared between threads; every operation takes `&mut self`.
/// After a framing failure the client closes itself, since the stream can no
/// longer be trusted to sit on a frame boundary. Open a new client instead.
pub struct MarionetteClient {
    options: ClientOptions,
    state: ConnectionState,
    codec: Option<FrameCodec<TcpStream>>,
    next_id: u64,
    handshake: Option<HandshakeInfo>,
    session_id: Option<String>,
    observer: Option<Box<dyn CommandObserver + Send>>,
}

impl fmt::Debug for MarionetteClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MarionetteClient")
            .field("options", &self.options)
            .field("state", &self.state)
            .field("next_id", &self.next_id)
            .field("handshake", &self.handshake)
            .field("session_id", &self.session_id)
            .field("observed", &self.observer.is_some())
            .finish_non_exhaustive()
    }
}

impl MarionetteClient {
    pub fn new(options: ClientOptions) -> Self {
        Self {
            options,
            state: ConnectionState::Disconnected,
            codec: None,
            next_id: 1,
            handshake: None,
            session_id: None,
            observer: None,
        }
    }

    /// Report every later command round trip to `observer`, replacing any
    /// previous one.
    pub fn set_observer(&mut self, observer: impl CommandObserver + Send + 'static) {
        self.observer = Some(Box::new(observer));
    }

    /// Connect and consume the handshake in one step.
    pub fn open(options: ClientOptions) -> ClientResult<Self> {
        let mut client = Self::new(options);
        client.connect()?;
        client.read_handshake()?;
        Ok(client)
    }

    pub fn options(&self) -> &ClientOptions {
        &self.options
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Handshake metadata, once the client is `Ready`.
    pub fn handshake(&self) -> Option<&HandshakeInfo> {
        self.handshake.as_ref()
    }

    pub fn protocol_version(&self) -> Option<u64> {
        self.handshake.as_ref().map(|h| h.protocol_version)
    }

    /// Session id returned by the last successful [`new_session`](Self::new_session).
    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    /// Correlation id the next command will carry.
    pub fn next_correlation_id(&self) -> u64 {
        self.next_id
    }

    /// Open the TCP connection. `Disconnected -> Connected`.
    pub fn connect(&mut self) -> ClientResult<()> {
        self.expect_state(ConnectionState::Disconnected)?;

        let addr = self.options.addr();
        let stream = self
            .open_stream()
            .map_err(|source| ClientError::Connection {
                addr: addr.clone(),
                source,
            })?;

        let codec = FrameCodec::new(stream)
            .with_read_timeout(self.options.read_timeout)
            .with_max_frame_len(self.options.max_frame_len);
        debug!(addr = %addr, read_timeout = ?codec.read_timeout(), "connected to Marionette endpoint");
        self.codec = Some(codec);
        self.state = ConnectionState::Connected;
        Ok(())
    }

    fn open_stream(&self) -> io::Result<TcpStream> {
        let host = self.options.host.as_str();
        let stream = match self.options.connect_timeout {
            None => TcpStream::connect((host, self.options.port))?,
            Some(timeout) => {
                let mut last_err = None;
                let mut connected = None;
                for addr in (host, self.options.port).to_socket_addrs()? {
                    match TcpStream::connect_timeout(&addr, timeout) {
                        Ok(stream) => {
                            connected = Some(stream);
                            break;
                        }
                        Err(e) => last_err = Some(e),
                    }
                }
                match connected {
                    Some(stream) => stream,
                    None => {
                        return Err(last_err.unwrap_or_else(|| {
                            io::Error::new(
                                io::ErrorKind::AddrNotAvailable,
                                "host did not resolve to any address",
                            )
                        }))
                    }
                }
            }
        };
        stream.set_nodelay(true)?;
        Ok(stream)
    }

    /// Read the handshake frame. `Connected -> Ready`.
    ///
    /// Any failure here is fatal: the socket is released and the client is
    /// left `Closed`.
    pub fn read_handshake(&mut self) -> ClientResult<&HandshakeInfo> {
        self.expect_state(ConnectionState::Connected)?;

        let outcome = match self.codec.as_mut() {
            Some(codec) => codec
                .read_frame()
                .map_err(InitError::from)
                .and_then(|frame| envelope::decode_incoming(&frame).map_err(InitError::from)),
            None => return Err(self.invalid_state(ConnectionState::Connected)),
        };

        let info = match outcome {
            Ok(Incoming::Handshake(info)) => info,
            Ok(_) => {
                self.release();
                return Err(ClientError::Init(InitError::NotHandshake));
            }
            Err(e) => {
                self.release();
                return Err(ClientError::Init(e));
            }
        };

        debug!(
            protocol_version = info.protocol_version,
            application_type = info.application_type.as_deref().unwrap_or("unknown"),
            "Marionette handshake received"
        );
        self.state = ConnectionState::Ready;
        Ok(self.handshake.insert(info))
    }

    /// Send one command and block until its response arrives.
    ///
    /// Returns the result object of a successful response. A remote error is
    /// returned as [`ClientError::Remote`] and leaves the client `Ready`.
    pub fn send_command<P>(&mut self, command: &str, params: &P) -> ClientResult<Map<String, Value>>
    where
        P: Serialize + ?Sized,
    {
        self.expect_state(ConnectionState::Ready)?;

        let id = self.next_id;
        let params = serde_json::to_value(params).map_err(EncodeError::from)?;
        let request = envelope::encode_command(command, &params, id)?;
        self.next_id += 1;
        if let Some(observer) = self.observer.as_mut() {
            observer.command_sent(id, command, &params);
        }

        trace!(id, command, "sending command");
        let exchanged = match self.codec.as_mut() {
            Some(codec) => codec
                .write_frame(&request)
                .and_then(|()| codec.read_frame()),
            None => return Err(self.invalid_state(ConnectionState::Ready)),
        };
        let response = match exchanged {
            Ok(frame) => frame,
            Err(e) => {
                self.release();
                return Err(e.into());
            }
        };

        match envelope::decode_incoming(&response)? {
            Incoming::Success { id: response_id, payload, .. } => {
                trace!(id, response_id, command, "command succeeded");
                if let Some(observer) = self.observer.as_mut() {
                    observer.response_received(id, &payload);
                }
                Ok(payload)
            }
            Incoming::Error { error, .. } => {
                if let Some(observer) = self.observer.as_mut() {
                    observer.remote_error(id, &error);
                }
                Err(ClientError::Remote(error))
            }
            Incoming::Handshake(_) => Err(ClientError::protocol_violation(
                command,
                "received a handshake frame instead of a response",
            )),
            Incoming::Command { name, .. } => Err(ClientError::protocol_violation(
                command,
                format!("received command {name} instead of a response"),
            )),
        }
    }

    /// `WebDriver:NewSession`. Returns the new session id.
    pub fn new_session(&mut self) -> ClientResult<String> {
        let params = json!({ "capabilities": { "pageLoadStrategy": "normal" } });
        let payload = self.send_command(NEW_SESSION, &params)?;

        let session_id = payload
            .get("sessionId")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .ok_or_else(|| {
                ClientError::protocol_violation(NEW_SESSION, "response has no sessionId")
            })?
            .to_string();

        debug!(session_id = %session_id, "session started");
        self.session_id = Some(session_id.clone());
        Ok(session_id)
    }

    /// Release the socket. Closing twice, or closing a client that never
    /// connected, does nothing.
    pub fn close(&mut self) {
        if self.state == ConnectionState::Disconnected {
            return;
        }
        self.release();
    }

    fn release(&mut self) {
        if let Some(codec) = self.codec.take() {
            let _ = codec.into_inner().shutdown(Shutdown::Both);
            debug!(addr = %self.options.addr(), "connection closed");
        }
        self.state = ConnectionState::Closed;
    }

    fn expect_state(&self, expected: ConnectionState) -> ClientResult<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(self.invalid_state(expected))
        }
    }

    fn invalid_state(&self, expected: ConnectionState) -> ClientError {
        ClientError::InvalidState {
            expected,
            actual: self.state,
        }
    }
}

impl Drop for MarionetteClient {
    fn drop(&mut self) {
        self.close();
    }
}
