//! CLI argument definitions for Carton.
//!
//! Uses `clap` derive macros to define the command surface. Each command
//! corresponds to a handler in the [`super::commands`] module.

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(
    name = "carton",
    version,
    about = "Resolve Cartfile dependencies",
    long_about = "Carton reads a Cartfile (and Cartfile.private), resolves every dependency \
                  to a single version satisfying all constraints, and records the result in \
                  Cartfile.resolved."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Maximum number of concurrent fetches (overrides ~/.carton/config.toml)
    #[arg(short, long, global = true, env = "CARTON_JOBS")]
    pub jobs: Option<usize>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check Cartfile and Cartfile.private for syntax errors and duplicates
    Validate,

    /// Resolve dependencies and write Cartfile.resolved
    Update {
        /// Print the resolved manifest instead of writing it
        #[arg(long)]
        dry_run: bool,
    },

    /// Display the resolved dependency tree
    Tree {
        /// Maximum depth to display
        #[arg(short, long)]
        depth: Option<usize>,
        /// Show why a dependency is included (path from the root)
        #[arg(long)]
        why: Option<String>,
    },
}

/// Parse command-line arguments.
pub fn parse() -> Cli {
    Cli::parse()
}
