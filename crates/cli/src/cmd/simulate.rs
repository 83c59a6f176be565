//! Replay an edit script through a save controller
//!
//! Each `edit` becomes a `notify_change`, each `flush` a `force_save`. The
//! save operation writes the text to the output file after the configured
//! latency, and stops early when its token is cancelled.

use anyhow::{Context, Result};
use autosave_core::AutoSaveConfig;
use cli_lib::script::{self, Action};
use controller::{CancellationToken, SaveController, SaveStatus};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{debug, info};

/// Longest to wait for saves to settle once the script has finished
const SETTLE_TIMEOUT: Duration = Duration::from_secs(60);

const SETTLE_POLL: Duration = Duration::from_millis(50);

pub struct Options {
    pub script: PathBuf,
    pub out: PathBuf,
    pub config: Option<PathBuf>,
    pub debounce_ms: Option<u64>,
    pub status_ms: Option<u64>,
    pub latency_ms: u64,
    pub fail_on: Option<String>,
    pub strict: bool,
}

/// Why a simulated save did not persist
#[derive(Debug, Clone, Error)]
enum SaveError {
    #[error("save cancelled")]
    Cancelled,

    #[error("save rejected for '{0}'")]
    Rejected(String),

    #[error("failed to write output: {0}")]
    Write(String),
}

#[derive(Default)]
struct Stats {
    attempted: AtomicUsize,
    saved: AtomicUsize,
    failed: AtomicUsize,
    cancelled: AtomicUsize,
}

pub async fn run(options: Options) -> Result<()> {
    // 1. Resolve configuration
    let config = effective_config(&options)?;

    // 2. Parse the script
    let source = std::fs::read_to_string(&options.script)
        .with_context(|| format!("Failed to read script {}", options.script.display()))?;
    let directives = script::parse(&source)
        .with_context(|| format!("Invalid script {}", options.script.display()))?;

    info!(
        directives = directives.len(),
        debounce_ms = config.debounce_ms,
        status_ms = config.status_ms,
        "Starting simulation"
    );

    // 3. Build the controller around a file-writing save
    let stats = Arc::new(Stats::default());
    let out = Arc::new(options.out.clone());
    let latency = Duration::from_millis(options.latency_ms);
    let fail_on = Arc::new(options.fail_on.clone());

    let save_stats = Arc::clone(&stats);
    let controller = SaveController::with_cancel_tokens(
        move |token: CancellationToken, text: String| {
            let stats = Arc::clone(&save_stats);
            let out = Arc::clone(&out);
            let fail_on = Arc::clone(&fail_on);
            async move {
                stats.attempted.fetch_add(1, Ordering::SeqCst);
                let result = save_text(token, text, out.as_path(), latency, fail_on.as_deref()).await;
                let counter = match &result {
                    Ok(_) => &stats.saved,
                    Err(SaveError::Cancelled) => &stats.cancelled,
                    Err(_) => &stats.failed,
                };
                counter.fetch_add(1, Ordering::SeqCst);
                result
            }
        },
        &config,
    );

    // 4. Print every status transition
    let start = Instant::now();
    let mut status_rx = controller.subscribe();
    let printer = tokio::spawn(async move {
        while status_rx.changed().await.is_ok() {
            let status = *status_rx.borrow_and_update();
            println!("{:>7}ms  {}", start.elapsed().as_millis(), paint(status));
        }
    });

    // 5. Replay
    for directive in &directives {
        tokio::time::sleep_until(start + directive.at).await;
        match &directive.action {
            Action::Edit(text) => {
                debug!(line = directive.line, "Edit");
                // Outcomes are observed through the status signal
                drop(controller.notify_change(text.clone()));
            }
            Action::Flush => {
                if controller.force_save().is_none() {
                    println!("{:>7}ms  {}", start.elapsed().as_millis(), "flush: nothing pending".dimmed());
                }
            }
            Action::Wait => {}
        }
    }

    // 6. Let the last save settle
    let deadline = Instant::now() + SETTLE_TIMEOUT;
    let mut settle_rx = controller.subscribe();
    loop {
        let status = *settle_rx.borrow_and_update();
        // A stale settlement can publish success or failure while a newer save still runs
        let busy = controller.has_pending_save()
            || controller.has_in_flight_save()
            || matches!(status, SaveStatus::Changed | SaveStatus::Saving);
        if !busy {
            break;
        }
        if Instant::now() >= deadline {
            anyhow::bail!("Timed out waiting for the last save to settle");
        }
        // Discarded settlements publish nothing, so poll as well as listen
        match tokio::time::timeout(SETTLE_POLL, settle_rx.changed()).await {
            Ok(Err(_)) => break,
            Ok(Ok(())) | Err(_) => {}
        }
    }

    // Let the printer drain before shutting down
    tokio::task::yield_now().await;
    controller.shutdown();
    printer.abort();

    // 7. Summary
    println!();
    println!("{}", "Simulation Summary".bold());
    println!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    println!("Final status:  {}", paint(controller.status()));
    println!("Attempted:     {}", stats.attempted.load(Ordering::SeqCst));
    println!("Saved:         {}", stats.saved.load(Ordering::SeqCst).green());
    println!("Failed:        {}", stats.failed.load(Ordering::SeqCst).red());
    println!("Cancelled:     {}", stats.cancelled.load(Ordering::SeqCst).yellow());
    println!("Output:        {}", options.out.display().cyan());

    info!(elapsed_ms = start.elapsed().as_millis() as u64, "Simulation finished");
    Ok(())
}

fn effective_config(options: &Options) -> Result<AutoSaveConfig> {
    let path = super::config::resolve_path(options.config.clone())?;
    let mut config = AutoSaveConfig::load(&path)?;

    if let Some(debounce_ms) = options.debounce_ms {
        config.debounce_ms = debounce_ms;
    }
    if let Some(status_ms) = options.status_ms {
        config.status_ms = status_ms;
    }
    if options.strict {
        config.discard_stale_completions = true;
    }

    config.validate().context("Invalid command-line override")?;
    Ok(config)
}

async fn save_text(
    token: CancellationToken,
    text: String,
    out: &Path,
    latency: Duration,
    fail_on: Option<&str>,
) -> Result<usize, SaveError> {
    tokio::select! {
        _ = token.cancelled() => return Err(SaveError::Cancelled),
        _ = tokio::time::sleep(latency) => {}
    }

    if fail_on == Some(text.as_str()) {
        return Err(SaveError::Rejected(text));
    }

    tokio::fs::write(out, text.as_bytes())
        .await
        .map_err(|e| SaveError::Write(e.to_string()))?;
    Ok(text.len())
}

fn paint(status: SaveStatus) -> String {
    match status {
        SaveStatus::Neutral => status.dimmed().to_string(),
        SaveStatus::Changed => status.yellow().to_string(),
        SaveStatus::Saving => status.cyan().to_string(),
        SaveStatus::Success => status.green().to_string(),
        SaveStatus::Failure => status.red().to_string(),
    }
}
