//! Binary entry point that glues the JSON-backed store to the TUI. The
//! bootstrapping pipeline: resolve configuration, start file logging, load the
//! library, then either run a headless export or drive the Ratatui event loop
//! until the user exits.
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Mutex;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use digital_library::store::export_message;
use digital_library::ui::surface_error;
use digital_library::{run_app, App, Config, Library};

/// Track a small library's books and members from the terminal.
#[derive(Parser)]
#[command(name = "library", version, about)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(long, env = "LIBRARY_CONFIG")]
    config: Option<PathBuf>,

    /// Directory holding the data files, overriding the config file.
    #[arg(long, env = "LIBRARY_DATA_DIR")]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Write the CSV snapshot without starting the TUI.
    Export {
        /// Destination file; defaults to the configured export file.
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

/// Fatal initialization problems (an unreadable data file, say) end the
/// process with their root cause on stderr instead of starting with empty
/// state.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(code) => code,
        Err(err) => {
            error!(error = ?err, "library stopped");
            eprintln!("Error: {}", surface_error(&err));
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?.with_data_dir(cli.data_dir);
    config.ensure_data_dir()?;
    init_logging(&config)?;

    let library = Library::open(config.json_files())
        .context("failed to load library data")?
        .with_history_limit(config.history_limit);

    match cli.command {
        Some(Command::Export { output }) => {
            let path = output.unwrap_or_else(|| config.export_path());
            let result = library.export_csv(&path);
            let failed = result.is_err();
            let message = export_message(result);
            if failed {
                eprintln!("{message}");
                return Ok(ExitCode::FAILURE);
            }
            println!("{message}");
            Ok(ExitCode::SUCCESS)
        }
        None => {
            info!(data_dir = %config.data_dir.display(), "starting terminal UI");
            let mut app = App::new(library, Box::new(config.auth.clone()), config.export_path());
            run_app(&mut app)?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Logs go to a file in the data directory because the TUI owns the terminal.
fn init_logging(config: &Config) -> Result<()> {
    let log_path = config.log_path();
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "digital_library=info,library=info".into()),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .init();
    Ok(())
}
