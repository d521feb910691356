//! Dependency resolution engine: breadth-first constraint propagation over a
//! graph whose edges are discovered by fetching each pinned project's own
//! manifest, with concurrent single-flight fetching per round.

pub mod cache;
pub mod conflict;
pub mod graph;
pub mod resolver;
pub mod source;
