//! pin-audit CLI
//!
//! Fails when a requirements file declares a dependency without a version

use anyhow::Result;
use clap::Parser;
use pin_audit::{ConfigLoadOptions, ConfigLoader, ConfigOverrides, OutputFormat, PinChecker};
use std::io::Write;
use std::path::PathBuf;
use std::process;

/// Check that every dependency in requirements files is version-pinned
#[derive(Parser)]
#[command(name = "pin-audit")]
#[command(version)]
#[command(about = "Check that every dependency in requirements files is version-pinned", long_about = None)]
struct Cli {
    /// Directory to scan (defaults to current directory)
    #[arg(value_name = "ROOT")]
    root: Option<PathBuf>,

    /// Exact manifest file name to look for [default: requirements.txt]
    #[arg(long)]
    manifest_name: Option<String>,

    /// Skip paths matching this glob (repeatable)
    #[arg(long, value_name = "GLOB")]
    exclude: Vec<String>,

    /// Report every finding instead of stopping at the first one
    #[arg(long)]
    all: bool,

    /// Output format (text|json)
    #[arg(long, default_value = "text")]
    format: OutputFormat,

    /// Configuration file (defaults to ROOT/.pin-audit.yaml)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Do not follow -r/-c includes inside manifests
    #[arg(long)]
    no_includes: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    follow_links: bool,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            manifest_name: self.manifest_name.clone(),
            exclude: (!self.exclude.is_empty()).then(|| self.exclude.clone()),
            fail_fast: self.all.then_some(false),
            follow_links: self.follow_links.then_some(true),
            follow_includes: self.no_includes.then_some(false),
            ..Default::default()
        }
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match run(cli) {
        Ok(exit_code) => process::exit(exit_code),
        Err(e) => {
            eprintln!("Error: {}", e);
            if let Some(audit_error) = e.downcast_ref::<pin_audit::AuditError>() {
                for action in audit_error.suggested_actions() {
                    eprintln!("  - {}", action);
                }
            }
            process::exit(1);
        }
    }
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .target(env_logger::Target::Stderr)
        .init();
}

fn run(cli: Cli) -> Result<i32> {
    let root = cli.root.clone().unwrap_or_else(|| PathBuf::from("."));

    let config = ConfigLoader::load(ConfigLoadOptions {
        project_path: root.clone(),
        config_file: cli.config.clone(),
        cli_args: cli.overrides(),
        env: std::env::vars().collect(),
    })?;

    let checker = PinChecker::from_config(&config)?;
    let report = checker.run(&root)?;

    let output = report.render(cli.format)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(output.as_bytes())?;
    stdout.flush()?;

    Ok(report.exit_code())
}
