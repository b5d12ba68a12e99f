//! Config validation with field paths in every message.

use thiserror::Error;
use tracing::{error, warn, Level};

use crate::schema::MarionetteConfig;

/// Read timeouts above this are accepted but flagged.
const LONG_READ_TIMEOUT_SECS: u64 = 600;

const KNOWN_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error", "off"];

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

/// All errors and warnings found in one pass.
#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Warnings first, then errors, each tagged with its log level.
    pub fn entries(&self) -> impl Iterator<Item = (Level, &ConfigValidationError)> {
        self.warnings
            .iter()
            .map(|w| (Level::WARN, w))
            .chain(self.errors.iter().map(|e| (Level::ERROR, e)))
    }

    /// Emit every entry once. Call after the subscriber is installed.
    pub fn log(&self) {
        for (level, entry) in self.entries() {
            if level == Level::ERROR {
                error!(path = %entry.path, message = %entry.message, "Config error");
            } else {
                warn!(path = %entry.path, message = %entry.message, "Config warning");
            }
        }
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

pub fn validate(config: &MarionetteConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_connection(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_connection(config: &MarionetteConfig, report: &mut ValidationReport) {
    let Some(conn) = &config.connection else { return };

    if let Some(host) = &conn.host {
        if host.trim().is_empty() {
            report.error("connection.host", "Host cannot be empty");
        }
    }
    if conn.port == Some(0) {
        report.error("connection.port", "Port must be between 1 and 65535");
    }
    match conn.read_timeout_secs {
        Some(0) => report.error("connection.readTimeoutSecs", "readTimeoutSecs must be >= 1"),
        Some(secs) if secs > LONG_READ_TIMEOUT_SECS => report.warn(
            "connection.readTimeoutSecs",
            format!("A {secs}s read timeout will hide a hung browser for a long time"),
        ),
        _ => {}
    }
    if conn.connect_timeout_secs == Some(0) {
        report.error("connection.connectTimeoutSecs", "connectTimeoutSecs must be >= 1");
    }
    if conn.max_frame_bytes == Some(0) {
        report.error("connection.maxFrameBytes", "maxFrameBytes must be > 0");
    }
}

fn validate_logging(config: &MarionetteConfig, report: &mut ValidationReport) {
    let Some(logging) = &config.logging else { return };

    if let Some(level) = &logging.level {
        for directive in level.split(',').map(str::trim).filter(|d| !d.is_empty()) {
            let level_part = directive.rsplit('=').next().unwrap_or(directive);
            if !KNOWN_LEVELS.contains(&level_part.to_ascii_lowercase().as_str()) {
                report.warn(
                    "logging.level",
                    format!("Unknown level in directive '{directive}'. Use one of {KNOWN_LEVELS:?}"),
                );
            }
        }
    }
    if let Some(dir) = &logging.dir {
        if dir.trim().is_empty() {
            report.error("logging.dir", "Log directory cannot be empty; omit it to disable file logs");
        }
    }
}
