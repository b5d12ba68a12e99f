//! Structured logging components for the Marionette client.
//!
//! Handles log redaction, JSON output generation, file rotation, and wire event logging.

pub mod event_logger;
pub mod logger;
pub mod redact;

pub use event_logger::{WireEvent, WireEventLogEntry, WireEventLogger};
pub use logger::{LoggerOptions, init_logger};
pub use redact::redact_sensitive_data;
