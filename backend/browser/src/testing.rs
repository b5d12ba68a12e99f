//! Fake Marionette endpoint for tests.
//!
//! Listens on an ephemeral loopback port, sends a handshake, then answers each
//! command frame with whatever the test's responder returns.

use std::io::Read;
use std::net::{TcpListener, TcpStream};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::{json, Value};

use crate::client::ClientOptions;
use crate::frame::{encode_frame, FrameCodec};

pub(crate) const GECKO_HANDSHAKE: &[u8] = br#"{"applicationType":"gecko","marionetteProtocol":3}"#;

/// What the endpoint does after receiving a command.
pub(crate) enum Reply {
    /// Send this payload as one frame and keep serving.
    Frame(Vec<u8>),
    /// Write these bytes as-is and keep serving.
    Raw(Vec<u8>),
    /// Write these bytes as-is, then close the connection.
    RawThenHangup(Vec<u8>),
    /// Never answer; hold the socket open until the client goes away.
    Stall,
    /// Close the connection without answering.
    Hangup,
}

pub(crate) struct FakeEndpoint {
    port: u16,
    handle: JoinHandle<Vec<Value>>,
}

impl FakeEndpoint {
    pub(crate) fn serve<F>(responder: F) -> Self
    where
        F: FnMut(&Value) -> Reply + Send + 'static,
    {
        Self::serve_with_handshake(gecko_handshake(), responder)
    }

    /// `handshake` is written verbatim, so it must already be framed.
    pub(crate) fn serve_with_handshake<F>(handshake: Vec<u8>, mut responder: F) -> Self
    where
        F: FnMut(&Value) -> Reply + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut received = Vec::new();
            let mut codec = FrameCodec::new(stream).with_read_timeout(Duration::from_secs(10));
            if write_raw(&mut codec, &handshake).is_err() {
                return received;
            }

            while let Ok(frame) = codec.read_frame() {
                let Ok(command) = serde_json::from_slice::<Value>(&frame) else {
                    break;
                };
                let reply = responder(&command);
                received.push(command);
                match reply {
                    Reply::Frame(payload) => {
                        if codec.write_frame(&payload).is_err() {
                            break;
                        }
                    }
                    Reply::Raw(bytes) => {
                        if write_raw(&mut codec, &bytes).is_err() {
                            break;
                        }
                    }
                    Reply::RawThenHangup(bytes) => {
                        let _ = write_raw(&mut codec, &bytes);
                        break;
                    }
                    Reply::Stall => {
                        drain(codec.into_inner());
                        return received;
                    }
                    Reply::Hangup => break,
                }
            }
            received
        });

        Self { port, handle }
    }

    pub(crate) fn options(&self) -> ClientOptions {
        ClientOptions::new("127.0.0.1", self.port).with_read_timeout(Duration::from_secs(5))
    }

    /// Wait for the connection to end and return every command received.
    pub(crate) fn join(self) -> Vec<Value> {
        self.handle.join().unwrap()
    }
}

fn write_raw(codec: &mut FrameCodec<TcpStream>, bytes: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    let mut stream = codec.get_ref();
    stream.write_all(bytes)?;
    stream.flush()
}

fn drain(mut stream: TcpStream) {
    let _ = stream.set_read_timeout(None);
    let mut buf = [0u8; 256];
    while matches!(stream.read(&mut buf), Ok(n) if n > 0) {}
}

pub(crate) fn gecko_handshake() -> Vec<u8> {
    encode_frame(GECKO_HANDSHAKE)
}

/// Success response payload answering `command`.
pub(crate) fn reply(command: &Value, result: Value) -> Vec<u8> {
    serde_json::to_vec(&json!([1, command[1], null, result])).unwrap()
}

/// Error response payload answering `command`.
pub(crate) fn error_reply(command: &Value, kind: &str, message: &str) -> Vec<u8> {
    serde_json::to_vec(&json!([
        1,
        command[1],
        {"error": kind, "message": message, "stacktrace": ""},
        null
    ]))
    .unwrap()
}
