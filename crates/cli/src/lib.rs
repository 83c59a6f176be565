//! Library half of the `autosave` CLI
//!
//! Exposes the pieces the binary and its tests share.

pub mod script;
