//! Core data types for Carton.
//!
//! This crate models dependency manifests: project identifiers, version
//! constraints and pins, the `Cartfile` / `Cartfile.resolved` grammar, and
//! duplicate detection, plus the global configuration file.
//!
//! This crate is intentionally free of async code and network I/O.

pub mod cartfile;
pub mod config;
pub mod dependency;
pub mod duplicates;
pub mod project;
pub mod version;
