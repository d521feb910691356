//! Command dispatch and handler modules.

mod tree;
mod update;
mod validate;

use std::path::PathBuf;

use miette::Result;

use carton_core::cartfile::CARTFILE;
use carton_util::errors::CartonError;
use carton_util::fs::find_ancestor_with;

use crate::cli::{Cli, Command};

/// Route a parsed CLI invocation to the appropriate command handler.
pub async fn dispatch(cli: Cli) -> Result<()> {
    tracing::debug!("Running {:?}", cli.command);
    match cli.command {
        Command::Validate => validate::exec(),
        Command::Update { dry_run } => update::exec(dry_run, cli.jobs).await,
        Command::Tree { depth, why } => tree::exec(depth, why, cli.jobs).await,
    }
}

/// The nearest directory at or above the current one that holds a `Cartfile`.
fn project_root() -> Result<PathBuf> {
    let cwd = std::env::current_dir().map_err(CartonError::Io)?;

    let project_root = find_ancestor_with(&cwd, CARTFILE).ok_or_else(|| CartonError::Manifest {
        message: format!("No {CARTFILE} found in current directory or any parent"),
    })?;
    tracing::debug!("Project root: {}", project_root.display());

    Ok(project_root)
}
