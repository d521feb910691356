pub mod git_source;
pub mod ops_tree;
pub mod ops_update;
pub mod ops_validate;

use std::path::Path;
use std::sync::Arc;

use carton_core::cartfile::{Cartfile, CARTFILE, PRIVATE_CARTFILE};
use carton_core::config::GlobalConfig;
use carton_resolver::resolver::Resolver;

use crate::git_source::GitSource;

/// Load `Cartfile` and, when present, `Cartfile.private` from `project_root`,
/// returning them as a single manifest to resolve.
///
/// Fails if a project is declared in both files.
pub fn load_root_manifest(project_root: &Path) -> miette::Result<Cartfile> {
    let cartfile = Cartfile::from_path(&project_root.join(CARTFILE))?;

    let private_path = project_root.join(PRIVATE_CARTFILE);
    if !private_path.is_file() {
        return Ok(cartfile);
    }
    let private = Cartfile::from_path(&private_path)?;
    tracing::debug!("Including {} dependencies from {PRIVATE_CARTFILE}", private.len());
    Ok(cartfile.merged_with(&private)?)
}

/// Build a resolver backed by the git source, honouring the global config
/// and an optional `--jobs` override.
pub fn git_resolver(project_root: &Path, jobs: Option<usize>) -> miette::Result<Resolver> {
    let config = GlobalConfig::load()?;
    let jobs = jobs.unwrap_or(config.resolve.jobs);
    let source = GitSource::new(config.git.cache_path()).with_github_url(config.git.github_url);
    let root_name = project_root
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| CARTFILE.to_string());

    Ok(Resolver::new(Arc::new(source))
        .with_jobs(jobs)
        .with_root_name(root_name))
}
