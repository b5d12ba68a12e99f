//! Structured Logger
//!
//! Wraps `tracing` to provide human or JSON console output, an optional daily
//! rolling NDJSON file, and environment-based level control.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Prefix of the rolling file: `marionette.log.YYYY-MM-DD`.
const LOG_FILE_PREFIX: &str = "marionette.log";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggerOptions {
    /// Filter directive used when `RUST_LOG` is unset.
    pub level: String,
    /// JSON lines on the console instead of text.
    pub json: bool,
    /// Directory for the rolling file; no file output when `None`.
    pub dir: Option<PathBuf>,
    pub ansi: bool,
}

impl Default for LoggerOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            dir: None,
            ansi: std::env::var_os("NO_COLOR").is_none(),
        }
    }
}

/// Initialize the global structured logger.
///
/// Console output goes to stderr so command results on stdout stay clean.
/// Fails if a global subscriber is already installed.
pub fn init_logger(options: &LoggerOptions) -> Result<()> {
    let env_filter = build_filter(&options.level);

    let console_text = (!options.json).then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .with_ansi(options.ansi)
    });
    let console_json = options
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));

    let file_layer = match &options.dir {
        Some(dir) => {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
            let appender = RollingFileAppender::new(Rotation::DAILY, dir, LOG_FILE_PREFIX);
            Some(fmt::layer().json().with_writer(appender).with_ansi(false))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_text)
        .with(console_json)
        .with(file_layer)
        .try_init()
        .context("Failed to install global logger")
}

/// `RUST_LOG` wins; otherwise the configured level, falling back to `info`
/// when it does not parse.
fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}
