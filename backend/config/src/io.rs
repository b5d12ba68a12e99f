//! Config file read/write with atomic backup rotation.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::schema::MarionetteConfig;

/// Overrides the config directory.
pub const CONFIG_DIR_VAR: &str = "MARIONETTE_CONFIG_DIR";

const CONFIG_FILE_NAME: &str = "config.yaml";

/// Number of rolling backups to keep.
const MAX_BACKUPS: usize = 5;

/// Resolve the config directory.
/// Priority: `MARIONETTE_CONFIG_DIR` env > `~/.marionette/`
pub fn config_dir() -> PathBuf {
    if let Ok(dir) = std::env::var(CONFIG_DIR_VAR) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match dirs::home_dir() {
        Some(home) => home.join(".marionette"),
        None => PathBuf::from(".marionette"),
    }
}

pub fn config_file_path(config_dir: &Path) -> PathBuf {
    config_dir.join(CONFIG_FILE_NAME)
}

/// Read the config file as an untyped value tree, before env substitution.
///
/// A missing or empty file yields an empty object (first run).
pub fn load_raw_config(path: &Path) -> Result<Value> {
    if !path.exists() {
        debug!(path = %path.display(), "Config file does not exist; using defaults");
        return Ok(Value::Object(Default::default()));
    }

    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;

    let value: Option<Value> = serde_yaml::from_str(&raw)
        .with_context(|| format!("Failed to parse config YAML at: {}", path.display()))?;

    info!(path = %path.display(), "Loaded config");
    Ok(value.unwrap_or_else(|| Value::Object(Default::default())))
}

/// Load and parse the config from disk without any post-processing.
pub fn load_config(path: &Path) -> Result<MarionetteConfig> {
    let value = load_raw_config(path)?;
    serde_json::from_value(value)
        .with_context(|| format!("Invalid config structure at: {}", path.display()))
}

/// Write config to disk atomically (write to temp file, rename).
///
/// The previous file, if any, is kept as `config.yaml.bak.1`.
pub fn write_config(config: &MarionetteConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create config directory: {}", parent.display()))?;
    }

    if path.exists() {
        rotate_backups(path);
    }

    let yaml = serde_yaml::to_string(config).context("Failed to serialize config to YAML")?;

    let tmp_path = path.with_extension("yaml.tmp");
    fs::write(&tmp_path, yaml.as_bytes())
        .with_context(|| format!("Failed to write temp config: {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path)
        .with_context(|| format!("Failed to rename temp config to: {}", path.display()))?;

    info!(path = %path.display(), "Wrote config");
    Ok(())
}

/// config.yaml.bak.1 -> .bak.2 -> ... -> .bak.N, then copy the current file to .bak.1.
/// Failures only warn; a lost backup never blocks a write.
fn rotate_backups(path: &Path) {
    for i in (1..MAX_BACKUPS).rev() {
        let old = backup_path(path, i);
        if old.exists() {
            if let Err(e) = fs::rename(&old, backup_path(path, i + 1)) {
                warn!("Failed to rotate backup {}: {}", old.display(), e);
            }
        }
    }

    let bak = backup_path(path, 1);
    if let Err(e) = fs::copy(path, &bak) {
        warn!("Failed to create backup {}: {}", bak.display(), e);
    }
}

fn backup_path(path: &Path, index: usize) -> PathBuf {
    path.with_extension(format!("yaml.bak.{index}"))
}
