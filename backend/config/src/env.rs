//! Environment handling for config values.
//!
//! Two mechanisms:
//! - `${VAR_NAME}` references inside string values, resolved at load time.
//!   Only uppercase `[A-Z_][A-Z0-9_]*` names are matched and `$${VAR}`
//!   escapes to a literal `${VAR}`.
//! - `MARIONETTE_*` variables that override individual settings.

use std::collections::HashMap;

use anyhow::{bail, Context, Result};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde_json::Value;

use crate::schema::{ConnectionConfig, LoggingConfig, MarionetteConfig};

pub const HOST_VAR: &str = "MARIONETTE_HOST";
pub const PORT_VAR: &str = "MARIONETTE_PORT";
pub const READ_TIMEOUT_VAR: &str = "MARIONETTE_READ_TIMEOUT";
pub const LOG_LEVEL_VAR: &str = "MARIONETTE_LOG_LEVEL";

/// A reference, optionally preceded by the `$` escape.
static ENV_REF_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\$?)\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

/// Error returned for missing env vars.
#[derive(Debug, thiserror::Error)]
#[error("Missing env var \"{var_name}\" referenced at config path: {config_path}")]
pub struct MissingEnvVarError {
    pub var_name: String,
    pub config_path: String,
}

/// Snapshot of the process environment.
pub fn process_env() -> HashMap<String, String> {
    std::env::vars().collect()
}

/// Substitute `${VAR}` references in a config value tree.
///
/// Only string leaves are processed. A referenced variable that is unset or
/// empty is an error.
pub fn resolve_env_vars_with(value: &Value, env: &HashMap<String, String>) -> Result<Value> {
    substitute_value(value, env, "")
}

fn substitute_value(value: &Value, env: &HashMap<String, String>, path: &str) -> Result<Value> {
    match value {
        Value::String(s) => Ok(Value::String(substitute_string(s, env, path)?)),
        Value::Array(items) => items
            .iter()
            .enumerate()
            .map(|(i, v)| substitute_value(v, env, &format!("{path}[{i}]")))
            .collect::<Result<Vec<_>>>()
            .map(Value::Array),
        Value::Object(map) => {
            let mut result = serde_json::Map::new();
            for (key, v) in map {
                let child_path = if path.is_empty() {
                    key.clone()
                } else {
                    format!("{path}.{key}")
                };
                result.insert(key.clone(), substitute_value(v, env, &child_path)?);
            }
            Ok(Value::Object(result))
        }
        other => Ok(other.clone()),
    }
}

fn substitute_string(s: &str, env: &HashMap<String, String>, path: &str) -> Result<String> {
    if !s.contains('$') {
        return Ok(s.to_string());
    }

    let mut missing: Option<MissingEnvVarError> = None;
    let substituted = ENV_REF_PATTERN.replace_all(s, |caps: &Captures| {
        let name = &caps[2];
        if !caps[1].is_empty() {
            return format!("${{{name}}}");
        }
        match env.get(name) {
            Some(val) if !val.is_empty() => val.clone(),
            _ => {
                missing.get_or_insert_with(|| MissingEnvVarError {
                    var_name: name.to_string(),
                    config_path: path.to_string(),
                });
                String::new()
            }
        }
    });

    if let Some(err) = missing {
        bail!(err);
    }
    Ok(substituted.into_owned())
}

/// Collect all env var names referenced in a config value tree (for diagnostics).
pub fn collect_referenced_vars(value: &Value) -> Vec<String> {
    let mut vars = Vec::new();
    collect_vars_recursive(value, &mut vars);
    vars.sort();
    vars.dedup();
    vars
}

fn collect_vars_recursive(value: &Value, out: &mut Vec<String>) {
    match value {
        Value::String(s) => {
            for caps in ENV_REF_PATTERN.captures_iter(s) {
                if caps[1].is_empty() {
                    out.push(caps[2].to_string());
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|v| collect_vars_recursive(v, out)),
        Value::Object(map) => map.values().for_each(|v| collect_vars_recursive(v, out)),
        _ => {}
    }
}

/// Apply `MARIONETTE_*` overrides on top of the file config.
pub fn apply_env_overrides(
    mut config: MarionetteConfig,
    env: &HashMap<String, String>,
) -> Result<MarionetteConfig> {
    let var = |name: &str| env.get(name).filter(|v| !v.trim().is_empty());

    if let Some(host) = var(HOST_VAR) {
        connection(&mut config).host = Some(host.trim().to_string());
    }
    if let Some(port) = var(PORT_VAR) {
        let port = port
            .trim()
            .parse::<u16>()
            .with_context(|| format!("{PORT_VAR} is not a valid port: {port:?}"))?;
        connection(&mut config).port = Some(port);
    }
    if let Some(secs) = var(READ_TIMEOUT_VAR) {
        let secs = secs
            .trim()
            .parse::<u64>()
            .with_context(|| format!("{READ_TIMEOUT_VAR} is not a number of seconds: {secs:?}"))?;
        connection(&mut config).read_timeout_secs = Some(secs);
    }
    if let Some(level) = var(LOG_LEVEL_VAR) {
        config
            .logging
            .get_or_insert_with(LoggingConfig::default)
            .level = Some(level.trim().to_string());
    }
    Ok(config)
}

fn connection(config: &mut MarionetteConfig) -> &mut ConnectionConfig {
    config.connection.get_or_insert_with(ConnectionConfig::default)
}
