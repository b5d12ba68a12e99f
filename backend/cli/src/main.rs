mod browser_cmd;
mod config;
mod config_cmd;
mod terminal_output;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use marionette_browser::Strategy;
use marionette_config::{
    apply_all_defaults, collect_referenced_vars, config_dir, config_file_path, load_and_prepare,
    load_raw_config, validate, MarionetteConfig, ValidationReport,
};
use marionette_logging::{init_logger, LoggerOptions};

use config::CliOverrides;
use terminal_output::note_error;

#[derive(Parser, Debug)]
#[command(name = "marionette")]
#[command(about = "Drive a browser over the Marionette wire protocol")]
#[command(version)]
struct Cli {
    #[command(flatten)]
    global: GlobalArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Args, Debug, Default)]
struct GlobalArgs {
    /// Config file (default: $MARIONETTE_CONFIG_DIR/config.yaml or ~/.marionette/config.yaml)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Marionette host
    #[arg(long, global = true)]
    host: Option<String>,

    /// Marionette port
    #[arg(short, long, global = true)]
    port: Option<u16>,

    /// Per-frame read timeout in seconds
    #[arg(long, global = true)]
    timeout: Option<u64>,

    /// Log filter, e.g. `debug` or `marionette_browser=trace`
    #[arg(long, global = true)]
    log_level: Option<String>,

    /// JSON lines on stderr instead of text logs
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Connect, print the handshake, and disconnect
    Handshake,
    /// Open a session and load a URL
    Navigate {
        url: String,
    },
    /// Run a script in the page and print its result
    Exec {
        script: String,
        /// Script argument as JSON; repeatable
        #[arg(long = "arg", value_name = "JSON")]
        args: Vec<String>,
        /// Load this URL first
        #[arg(long)]
        url: Option<String>,
    },
    /// Find one element and print its reference
    Find {
        /// Location strategy, e.g. `css selector` or `xpath`
        #[arg(value_parser = parse_strategy)]
        using: Strategy,
        value: String,
        #[arg(long)]
        url: Option<String>,
    },
    /// Read or modify the page's local storage
    Storage {
        #[command(subcommand)]
        action: StorageAction,
        #[arg(long, global = true)]
        url: Option<String>,
    },
    /// Inspect or create the config file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum StorageAction {
    /// Print every key and value
    Get,
    /// Store KEY=VALUE pairs
    Set {
        #[arg(value_name = "KEY=VALUE", required = true)]
        entries: Vec<String>,
    },
    /// Remove every key
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    /// Print the effective config as YAML
    Show,
    /// Write a default config file
    Init {
        /// Overwrite an existing file (the old one is kept as a backup)
        #[arg(long)]
        force: bool,
    },
    /// Check the config and report problems
    Validate,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli, init_logger) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            note_error(&format!("{e:#}"));
            ExitCode::FAILURE
        }
    }
}

fn parse_strategy(name: &str) -> Result<Strategy, String> {
    Strategy::from_wire(name).ok_or_else(|| {
        let known: Vec<&str> = Strategy::ALL.iter().map(|s| s.as_str()).collect();
        format!("unknown strategy {name:?}; use one of: {}", known.join(", "))
    })
}

fn run(cli: Cli, install_logger: impl FnOnce(&LoggerOptions) -> Result<()>) -> Result<()> {
    let path = cli
        .global
        .config
        .clone()
        .unwrap_or_else(|| config_file_path(&config_dir()));

    // `config init` never reads the old file, so it can replace one that no longer loads.
    let loaded = match &cli.command {
        Commands::Config { action: ConfigAction::Init { .. } } => Ok(MarionetteConfig::default()),
        _ => load_and_prepare(&path).map(|(file_config, _)| file_config),
    };
    let (file_config, load_error) = match loaded {
        Ok(file_config) => (file_config, None),
        Err(e) => (MarionetteConfig::default(), Some(e)),
    };
    let config = CliOverrides::from(&cli.global).apply(apply_all_defaults(file_config));
    let report = validate(&config);

    let logger = config::logger_options(&config);
    install_logger(&LoggerOptions {
        json: logger.json || cli.global.json_logs,
        ..logger
    })?;
    debug!(path = %path.display(), "Using config");
    if load_error.is_none() {
        report.log();
    }

    match cli.command {
        Commands::Config { action: ConfigAction::Init { force } } => config_cmd::init(&path, force),
        Commands::Config { action: ConfigAction::Validate } => {
            let referenced = load_raw_config(&path)
                .map(|raw| collect_referenced_vars(&raw))
                .unwrap_or_default();
            config_cmd::validate(&path, load_error.as_ref(), &report, &referenced)
        }
        command => {
            load_error.map_or(Ok(()), Err)?;
            match command {
                Commands::Config { action: ConfigAction::Show } => config_cmd::show(&config),
                command => run_browser_command(command, &config, &report),
            }
        }
    }
}

fn run_browser_command(
    command: Commands,
    config: &MarionetteConfig,
    report: &ValidationReport,
) -> Result<()> {
    if !report.is_valid() {
        let problems: Vec<String> = report.errors.iter().map(ToString::to_string).collect();
        bail!("invalid configuration:\n  {}", problems.join("\n  "));
    }

    let options = config.connection.clone().unwrap_or_default().client_options();
    match command {
        Commands::Handshake => browser_cmd::handshake(options),
        Commands::Navigate { url } => browser_cmd::navigate(options, &url),
        Commands::Exec { script, args, url } => {
            browser_cmd::exec(options, &script, &args, url.as_deref())
        }
        Commands::Find { using, value, url } => {
            browser_cmd::find(options, using, &value, url.as_deref())
        }
        Commands::Storage { action, url } => match action {
            StorageAction::Get => browser_cmd::storage_get(options, url.as_deref()),
            StorageAction::Set { entries } => {
                browser_cmd::storage_set(options, &entries, url.as_deref())
            }
            StorageAction::Clear => browser_cmd::storage_clear(options, url.as_deref()),
        },
        Commands::Config { .. } => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "marionette",
            "exec",
            "return arguments[0];",
            "--arg",
            "42",
            "--port",
            "2900",
        ])
        .unwrap();
        assert_eq!(cli.global.port, Some(2900));
        let Commands::Exec { script, args, url } = cli.command else {
            panic!("expected exec");
        };
        assert_eq!(script, "return arguments[0];");
        assert_eq!(args, vec!["42".to_string()]);
        assert!(url.is_none());
    }

    #[test]
    fn storage_set_requires_entries() {
        assert!(Cli::try_parse_from(["marionette", "storage", "set"]).is_err());
        let cli =
            Cli::try_parse_from(["marionette", "storage", "set", "a=1", "--url", "https://x.test"])
                .unwrap();
        assert!(matches!(
            cli.command,
            Commands::Storage { action: StorageAction::Set { .. }, url: Some(_) }
        ));
    }

    #[test]
    fn find_rejects_unknown_strategies() {
        let err = Cli::try_parse_from(["marionette", "find", "shadow", "x"]).unwrap_err();
        assert!(err.to_string().contains("css selector"));

        let cli = Cli::try_parse_from(["marionette", "find", "css selector", "a.next"]).unwrap();
        let Commands::Find { using, value, .. } = cli.command else {
            panic!("expected find");
        };
        assert_eq!(using, Strategy::CssSelector);
        assert_eq!(value, "a.next");
    }

    fn run_with(args: &[&str]) -> Result<()> {
        let mut argv = vec!["marionette"];
        argv.extend_from_slice(args);
        run(Cli::try_parse_from(argv).unwrap(), |_| Ok(()))
    }

    fn broken_config() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, "connection: [unclosed\n").unwrap();
        (dir, path.to_string_lossy().into_owned())
    }

    #[test]
    fn init_force_repairs_an_unparseable_config() {
        let (dir, path) = broken_config();
        assert!(run_with(&["config", "show", "--config", &path]).is_err());

        run_with(&["config", "init", "--force", "--config", &path]).unwrap();
        assert_eq!(
            marionette_config::load_config(&dir.path().join("config.yaml")).unwrap(),
            apply_all_defaults(MarionetteConfig::default())
        );
        run_with(&["config", "show", "--config", &path]).unwrap();
    }

    #[test]
    fn validate_reports_load_failures() {
        let (_dir, path) = broken_config();
        let err = run_with(&["config", "validate", "--config", &path]).unwrap_err();
        assert!(format!("{err:#}").contains("cannot be loaded"));
    }
}
