//! CLI Config Commands

use std::path::Path;

use anyhow::{bail, Context, Result};

use marionette_config::{apply_all_defaults, write_config, MarionetteConfig, ValidationReport};

use crate::terminal_output::{note_info, note_success, note_warn};

/// Print the effective config: file, env overrides, flags and defaults combined.
pub fn show(config: &MarionetteConfig) -> Result<()> {
    let yaml = serde_yaml::to_string(config).context("Failed to render config as YAML")?;
    print!("{yaml}");
    Ok(())
}

pub fn init(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }
    write_config(&apply_all_defaults(MarionetteConfig::default()), path)?;
    note_success(&format!("Wrote default config to {}", path.display()));
    Ok(())
}

/// `load_error` is the failure from reading the file, if any; it is reported
/// instead of the (default) report it left behind.
pub fn validate(
    path: &Path,
    load_error: Option<&anyhow::Error>,
    report: &ValidationReport,
    referenced_vars: &[String],
) -> Result<()> {
    if let Some(err) = load_error {
        bail!("{} cannot be loaded: {err:#}", path.display());
    }
    if !path.exists() {
        note_info(&format!("{} does not exist; checking defaults", path.display()));
    }
    if !referenced_vars.is_empty() {
        note_info(&format!("Reads environment: {}", referenced_vars.join(", ")));
    }
    for warning in &report.warnings {
        note_warn(&format!("{}: {}", warning.path, warning.message));
    }
    if !report.is_valid() {
        let problems: Vec<String> = report
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.path, e.message))
            .collect();
        bail!(
            "{} problem(s) found:\n  {}",
            problems.len(),
            problems.join("\n  ")
        );
    }
    note_success("Config is valid");
    Ok(())
}
