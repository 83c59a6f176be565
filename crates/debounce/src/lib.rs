//! Async debouncing for autosave
//!
//! This crate provides:
//! - Last-call-wins debouncing of an async operation
//! - A `flush` escape hatch that fires the pending call immediately
//! - Immediate mode (no quiet window) for saving on every change

pub mod debounce;

// Re-exports
pub use debounce::{DebouncedCall, Debouncer, Superseded};
