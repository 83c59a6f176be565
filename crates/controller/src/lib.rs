//! Debounced, cancellable autosave
//!
//! This crate provides:
//! - `SaveController`: turns a stream of edits into debounced saves,
//!   cancelling superseded ones and publishing a `SaveStatus` signal
//! - The `SaveOperation` seam for the actual persistence call

pub mod controller;
pub mod operation;

// Re-exports
pub use autosave_core::{
    AutoSaveConfig, CancelTokenFactory, CancellationHandle, CancellationToken, HandleFactory,
    SaveStatus,
};
pub use controller::{Outcome, SaveController};
pub use debounce::{DebouncedCall, Superseded};
pub use operation::{SaveOperation, SaveOutcome};
