//! Shared utilities for Carton.
//!
//! This crate provides cross-cutting concerns used by all other Carton crates:
//! the unified error type, filesystem helpers, process spawning, and terminal
//! status output.

pub mod errors;
pub mod fs;
pub mod process;
pub mod progress;
