//! # Vitrine application library
//!
//! The CLI, HTTP API, configuration and location provider around
//! `vitrine-core`. Split from `main.rs` so integration tests can drive the
//! router directly.

pub mod api;
pub mod cli;
pub mod config;
pub mod location;
