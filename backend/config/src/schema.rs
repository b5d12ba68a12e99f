//! Configuration schema.
//!
//! Every field is optional in the file; [`crate::defaults`] fills the gaps
//! after loading.

use std::time::Duration;

use marionette_browser::ClientOptions;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarionetteConfig {
    /// Where and how to reach the Marionette endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection: Option<ConnectionConfig>,

    /// Logging configuration
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub logging: Option<LoggingConfig>,
}

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub port: Option<u16>,

    /// Deadline for one response frame, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,

    /// Bound on opening the socket, in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connect_timeout_secs: Option<u64>,

    /// Largest accepted response frame, in bytes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_frame_bytes: Option<usize>,
}

impl ConnectionConfig {
    /// Client options for this connection; unset fields take the client's defaults.
    pub fn client_options(&self) -> ClientOptions {
        let defaults = ClientOptions::default();
        ClientOptions {
            host: self.host.clone().unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            read_timeout: self
                .read_timeout_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.read_timeout),
            connect_timeout: self
                .connect_timeout_secs
                .map(Duration::from_secs)
                .or(defaults.connect_timeout),
            max_frame_len: self.max_frame_bytes.unwrap_or(defaults.max_frame_len),
        }
    }
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. `info` or `marionette_browser=trace`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level: Option<String>,

    /// Emit JSON lines on the console instead of human-readable text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub json: Option<bool>,

    /// Directory for daily rolling NDJSON log files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_camel_case_yaml() {
        let yaml = "connection:\n  host: 127.0.0.1\n  port: 2829\n  readTimeoutSecs: 60\nlogging:\n  level: debug\n";
        let cfg: MarionetteConfig = serde_yaml::from_str(yaml).unwrap();
        let conn = cfg.connection.unwrap();
        assert_eq!(conn.host.as_deref(), Some("127.0.0.1"));
        assert_eq!(conn.port, Some(2829));
        assert_eq!(conn.read_timeout_secs, Some(60));
        assert_eq!(cfg.logging.unwrap().level.as_deref(), Some("debug"));
    }

    #[test]
    fn empty_connection_maps_to_client_defaults() {
        assert_eq!(ConnectionConfig::default().client_options(), ClientOptions::default());
    }

    #[test]
    fn connection_fields_override_client_defaults() {
        let conn = ConnectionConfig {
            host: Some("10.0.0.2".to_string()),
            port: Some(4444),
            read_timeout_secs: Some(5),
            connect_timeout_secs: Some(2),
            max_frame_bytes: Some(1024),
        };
        let options = conn.client_options();
        assert_eq!(options.addr(), "10.0.0.2:4444");
        assert_eq!(options.read_timeout, Duration::from_secs(5));
        assert_eq!(options.connect_timeout, Some(Duration::from_secs(2)));
        assert_eq!(options.max_frame_len, 1024);
    }
}
