//! `marionette-config`: configuration for the Marionette client and CLI.
//!
//! Provides:
//! - Typed config schema (connection, logging)
//! - YAML read/write with atomic backup rotation
//! - `${ENV_VAR}` substitution and `MARIONETTE_*` overrides
//! - Default value application
//! - Validation with field paths

pub mod defaults;
pub mod env;
pub mod io;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{
    apply_env_overrides, collect_referenced_vars, resolve_env_vars_with, MissingEnvVarError,
};
pub use io::{config_dir, config_file_path, load_config, load_raw_config, write_config};
pub use schema::{ConnectionConfig, LoggingConfig, MarionetteConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::collections::HashMap;
use std::path::Path;

use anyhow::{Context, Result};

/// Load a config file against the process environment.
///
/// This is the main entry point for loading a config at runtime.
pub fn load_and_prepare(path: &Path) -> Result<(MarionetteConfig, ValidationReport)> {
    load_and_prepare_with(path, &env::process_env())
}

/// Load, substitute env vars, apply `MARIONETTE_*` overrides, apply
/// defaults, and validate. Nothing is logged here; the caller decides
/// when to emit the report (see [`ValidationReport::log`]) and whether
/// an invalid one is fatal.
pub fn load_and_prepare_with(
    path: &Path,
    env: &HashMap<String, String>,
) -> Result<(MarionetteConfig, ValidationReport)> {
    let raw = load_raw_config(path)?;
    let value = resolve_env_vars_with(&raw, env).context("Failed to resolve env vars in config")?;

    let config: MarionetteConfig = serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure at: {}", path.display()))?;
    let config = apply_env_overrides(config, env)?;
    let config = apply_all_defaults(config);

    let report = validate(&config);
    Ok((config, report))
}
