//! Shared vocabulary for the autosave workspace
//!
//! This crate provides:
//! - `SaveStatus`, the status signal a save controller publishes
//! - Cancellation handles and the factory seam that produces them
//! - `AutoSaveConfig` (TOML-backed configuration)

pub mod cancel;
pub mod config;
pub mod status;

// Re-exports
pub use cancel::{CancelTokenFactory, CancellationHandle, HandleFactory};
pub use config::{AutoSaveConfig, ConfigError};
pub use status::SaveStatus;

/// Cooperative cancellation token handed out by [`CancelTokenFactory`]
pub use tokio_util::sync::CancellationToken;
