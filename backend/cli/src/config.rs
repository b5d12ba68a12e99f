//! Command-line flags layered over the loaded config file.

use std::path::PathBuf;

use marionette_config::{ConnectionConfig, LoggingConfig, MarionetteConfig};
use marionette_logging::LoggerOptions;

use crate::GlobalArgs;

/// The subset of global flags that override config values. Flags win over
/// the file and over `MARIONETTE_*` variables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub read_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
}

impl From<&GlobalArgs> for CliOverrides {
    fn from(args: &GlobalArgs) -> Self {
        Self {
            host: args.host.clone(),
            port: args.port,
            read_timeout_secs: args.timeout,
            log_level: args.log_level.clone(),
        }
    }
}

impl CliOverrides {
    pub fn apply(self, mut config: MarionetteConfig) -> MarionetteConfig {
        let connection = config.connection.get_or_insert_with(ConnectionConfig::default);
        if let Some(host) = self.host {
            connection.host = Some(host);
        }
        if let Some(port) = self.port {
            connection.port = Some(port);
        }
        if let Some(secs) = self.read_timeout_secs {
            connection.read_timeout_secs = Some(secs);
        }
        if let Some(level) = self.log_level {
            config.logging.get_or_insert_with(LoggingConfig::default).level = Some(level);
        }
        config
    }
}

pub fn logger_options(config: &MarionetteConfig) -> LoggerOptions {
    let defaults = LoggerOptions::default();
    let Some(logging) = &config.logging else { return defaults };
    LoggerOptions {
        level: logging.level.clone().unwrap_or(defaults.level),
        json: logging.json.unwrap_or(defaults.json),
        dir: logging.dir.as_ref().map(PathBuf::from),
        ansi: defaults.ansi,
    }
}
