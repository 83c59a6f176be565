//! Configuration management command
//!
//! Provides CLI interface to view and edit autosave configuration.

use anyhow::{Context, Result};
use autosave_core::config::{MAX_DEBOUNCE_MS, MAX_STATUS_MS};
use autosave_core::AutoSaveConfig;
use owo_colors::OwoColorize;
use std::path::PathBuf;

/// Explicit path, or the default location in the user config directory
pub fn resolve_path(path: Option<PathBuf>) -> Result<PathBuf> {
    match path {
        Some(path) => Ok(path),
        None => AutoSaveConfig::default_path().context("Could not determine config file path"),
    }
}

/// List all configuration values
pub async fn run_list(path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_path(path)?;
    let config = AutoSaveConfig::load(&config_path)?;

    println!("{}", "Autosave Configuration".bold());
    println!("{}: {}\n", "Location".dimmed(), config_path.display().dimmed());

    println!("{}", "[autosave]".yellow());
    println!(
        "  {} = {} {}",
        "debounce_ms".cyan(),
        config.debounce_ms,
        if config.debounce_ms == 0 {
            "(save on every change)".dimmed().to_string()
        } else {
            format!("({}ms quiet window)", config.debounce_ms).dimmed().to_string()
        }
    );
    println!(
        "  {} = {} {}",
        "status_ms".cyan(),
        config.status_ms,
        format!("(status resets {}ms after a save settles)", config.status_ms).dimmed()
    );
    println!(
        "  {} = {}",
        "discard_stale_completions".cyan(),
        config.discard_stale_completions
    );

    println!("\n{}", "Valid Ranges:".bold());
    println!("  debounce_ms: 0-{} (0 or 'none' = no quiet window)", MAX_DEBOUNCE_MS);
    println!("  status_ms: 0-{}", MAX_STATUS_MS);

    Ok(())
}

/// Get a single configuration value
pub async fn run_get(key: &str, path: Option<PathBuf>) -> Result<()> {
    let config = AutoSaveConfig::load(&resolve_path(path)?)?;

    let value = config
        .get(key)
        .context("Use 'autosave config list' to see available keys")?;

    println!("{}", value);
    Ok(())
}

/// Set a configuration value
pub async fn run_set(key: &str, value: &str, path: Option<PathBuf>) -> Result<()> {
    let config_path = resolve_path(path)?;
    let mut config = AutoSaveConfig::load(&config_path)?;

    config
        .set(key, value)
        .context("Invalid configuration value")?;
    config.save(&config_path)?;

    println!("{} {} = {}", "✓".green(), key.cyan(), value);
    Ok(())
}
