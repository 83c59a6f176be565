//! Autosave CLI - autosave command

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

mod cmd;

/// Autosave - debounced, cancellable saves driven by an edit script
#[derive(Parser)]
#[command(name = "autosave")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Write logs to this file instead of stderr
    #[arg(long, global = true)]
    log_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Replay an edit script through a save controller
    Simulate {
        /// Script file (`<offset_ms> edit <text>`, `<offset_ms> flush`, `<offset_ms> wait`)
        script: PathBuf,
        /// File each successful save writes the latest text to
        #[arg(short, long)]
        out: PathBuf,
        /// Config file (default: user config directory)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Override the quiet window
        #[arg(long, conflicts_with = "immediate")]
        debounce_ms: Option<u64>,
        /// Save on every change, no quiet window
        #[arg(long)]
        immediate: bool,
        /// Override the delay before status resets to neutral
        #[arg(long)]
        status_ms: Option<u64>,
        /// Simulated latency of each save
        #[arg(long, default_value = "0")]
        latency_ms: u64,
        /// Reject saves whose text equals this
        #[arg(long)]
        fail_on: Option<String>,
        /// Ignore saves that finish after a newer change
        #[arg(long)]
        strict: bool,
    },
    /// View and edit configuration
    #[command(subcommand)]
    Config(ConfigCommands),
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// List all configuration values
    List {
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Print a single value
    Get {
        key: String,
        #[arg(long)]
        path: Option<PathBuf>,
    },
    /// Set a single value
    Set {
        key: String,
        value: String,
        #[arg(long)]
        path: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Held until exit so buffered file logs are flushed
    let _log_guard = init_logging(cli.log_file.as_deref())?;

    match cli.command {
        Commands::Simulate {
            script,
            out,
            config,
            debounce_ms,
            immediate,
            status_ms,
            latency_ms,
            fail_on,
            strict,
        } => {
            let options = cmd::simulate::Options {
                script,
                out,
                config,
                debounce_ms: if immediate { Some(0) } else { debounce_ms },
                status_ms,
                latency_ms,
                fail_on,
                strict,
            };
            cmd::simulate::run(options).await
        }
        Commands::Config(config_cmd) => match config_cmd {
            ConfigCommands::List { path } => cmd::config::run_list(path).await,
            ConfigCommands::Get { key, path } => cmd::config::run_get(&key, path).await,
            ConfigCommands::Set { key, value, path } => cmd::config::run_set(&key, &value, path).await,
        },
    }
}

fn init_logging(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    let Some(path) = log_file else {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .init();
        return Ok(None);
    };

    let file_name = path
        .file_name()
        .with_context(|| format!("Log file path has no file name: {}", path.display()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir).context("Failed to create log directory")?;

    let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::never(dir, file_name));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Ok(Some(guard))
}
