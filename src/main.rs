//! model-acl - batch editor for group read permissions on AI models

use anyhow::Result;
use clap::{CommandFactory, Parser};
use model_acl::acl::MergeMode;
use model_acl::api::ApiClient;
use model_acl::config::{Config, ConfigOverrides};
use model_acl::paths;
use model_acl::session::{self, SessionOptions};
use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

/// Grant groups read access to AI models, in bulk
#[derive(Parser)]
#[command(name = "model-acl")]
#[command(version, about, long_about = None)]
struct Cli {
    /// Show disabled models in the list
    #[arg(long)]
    show_disabled: bool,

    /// API token
    #[arg(long)]
    token: Option<String>,

    /// Replace existing group access instead of appending
    #[arg(long)]
    replace: bool,

    /// Show debug information including API requests and responses
    #[arg(long)]
    debug: bool,

    /// Proxy URL (e.g., http://127.0.0.1:8080)
    #[arg(long)]
    proxy: Option<String>,

    /// Base URL of the service (e.g., https://chat.example.com)
    #[arg(long)]
    base_url: Option<String>,

    /// Config file to use instead of the default location
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            base_url: self.base_url.clone(),
            token: self.token.clone(),
            proxy: self.proxy.clone(),
            timeout_secs: self.timeout,
        }
    }

    const fn session_options(&self) -> SessionOptions {
        SessionOptions {
            show_disabled: self.show_disabled,
            mode: MergeMode::from_replace_flag(self.replace),
            debug: self.debug,
        }
    }
}

fn main() -> ExitCode {
    init_logging();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            // Let --help and --version exit normally
            if e.kind() == clap::error::ErrorKind::DisplayHelp
                || e.kind() == clap::error::ErrorKind::DisplayVersion
            {
                e.exit();
            }
            // For actual errors, show error + help
            eprintln!("error: {}\n", e.kind());
            if let Err(err) = Cli::command().print_help() {
                eprintln!("Warning: Failed to print help: {err}");
            }
            return ExitCode::FAILURE;
        }
    };

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            tracing::error!(error = %format!("{err:#}"), "Run aborted");
            eprintln!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    }
    .with_overrides(cli.overrides());
    tracing::debug!(?config, "Configuration loaded");

    let client = ApiClient::new(&config)?;

    let stdin = io::stdin();
    let stdout = io::stdout();
    let outcome = session::run(
        &client,
        cli.session_options(),
        &mut stdin.lock(),
        &mut stdout.lock(),
    )?;
    tracing::info!(?outcome, "Session finished");
    Ok(())
}

fn init_logging() {
    // Clear the log file on startup
    if let Err(e) = std::fs::write(paths::log_path(), "") {
        eprintln!("Warning: Failed to clear log file: {e}");
    }

    // Log to <tmp>/model-acl.log - tail with: tail -f /tmp/model-acl.log
    // Set DEBUG=0-3 to control verbosity (0=off, 1=warn, 2=info, 3=debug)
    let debug_level = std::env::var("DEBUG")
        .ok()
        .and_then(|v| v.parse::<u8>().ok())
        .unwrap_or(0);

    if debug_level > 0 {
        let level = match debug_level {
            1 => tracing::Level::WARN,
            2 => tracing::Level::INFO,
            _ => tracing::Level::DEBUG,
        };

        let file_appender =
            tracing_appender::rolling::never(std::env::temp_dir(), paths::log_file_name());
        tracing_subscriber::fmt()
            .with_writer(file_appender)
            .with_max_level(level)
            .with_ansi(false)
            .init();
    }
}
