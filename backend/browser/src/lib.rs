//! Marionette wire protocol client.
//!
//! Talks to a browser's Marionette endpoint (Firefox listens on
//! `localhost:2828` when started with `--marionette`) over a blocking TCP
//! connection.
//!
//! # Layers
//!
//! - **`frame`**: `<length>:<payload>` framing over any byte stream.
//! - **`envelope`**: the 4-slot JSON command/response envelopes and the
//!   one-time handshake object.
//! - **`client`**: connection lifecycle, correlation ids, and the blocking
//!   command round trip.
//! - **`page_control`**, **`element_query`**, **`local_storage`**: the
//!   WebDriver commands built on top.
//!
//! ```no_run
//! use marionette_browser::{ClientOptions, MarionetteClient, Strategy};
//!
//! let mut client = MarionetteClient::open(ClientOptions::default())?;
//! client.new_session()?;
//! client.navigate("https://example.com")?;
//! let title = client.execute_script("return document.title;", &[])?;
//! let link = client.find_element_by(Strategy::CssSelector, "a")?;
//! # Ok::<(), marionette_browser::ClientError>(())
//! ```

pub mod client;
pub mod element_query;
pub mod envelope;
pub mod error;
pub mod frame;
pub mod local_storage;
pub mod page_control;

#[cfg(test)]
mod testing;

pub use client::{
    ClientOptions, CommandObserver, ConnectionState, MarionetteClient, DEFAULT_HOST, DEFAULT_PORT,
};
pub use element_query::{element_reference, Strategy};
pub use envelope::{decode_incoming, encode_command, HandshakeInfo, Incoming};
pub use error::{
    ClientError, ClientResult, DecodeError, EncodeError, FrameError, InitError, ProtocolError,
};
pub use frame::{FrameCodec, ReadTimeout};
pub use local_storage::LocalStorage;
