//! Config defaults: applies default values to a parsed config.

use marionette_browser::frame::{DEFAULT_MAX_FRAME_LEN, DEFAULT_READ_TIMEOUT};
use marionette_browser::{DEFAULT_HOST, DEFAULT_PORT};

use crate::schema::{ConnectionConfig, LoggingConfig, MarionetteConfig};

/// Default log filter.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Apply all defaults to a freshly loaded config.
pub fn apply_all_defaults(config: MarionetteConfig) -> MarionetteConfig {
    let config = apply_connection_defaults(config);
    apply_logging_defaults(config)
}

/// Fill host, port, read timeout and frame limit. The connect timeout stays
/// unset unless configured, leaving it to the OS.
fn apply_connection_defaults(mut config: MarionetteConfig) -> MarionetteConfig {
    let connection = config.connection.get_or_insert_with(ConnectionConfig::default);
    if connection.host.is_none() {
        connection.host = Some(DEFAULT_HOST.to_string());
    }
    if connection.port.is_none() {
        connection.port = Some(DEFAULT_PORT);
    }
    if connection.read_timeout_secs.is_none() {
        connection.read_timeout_secs = Some(DEFAULT_READ_TIMEOUT.as_secs());
    }
    if connection.max_frame_bytes.is_none() {
        connection.max_frame_bytes = Some(DEFAULT_MAX_FRAME_LEN);
    }
    config
}

fn apply_logging_defaults(mut config: MarionetteConfig) -> MarionetteConfig {
    let logging = config.logging.get_or_insert_with(LoggingConfig::default);
    if logging.level.is_none() {
        logging.level = Some(DEFAULT_LOG_LEVEL.to_string());
    }
    if logging.json.is_none() {
        logging.json = Some(false);
    }
    config
}
