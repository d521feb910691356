//! Operation: resolve the manifests and record the pins in `Cartfile.resolved`.

use std::path::Path;

use carton_core::cartfile::{ResolvedCartfile, RESOLVED_CARTFILE};
use carton_resolver::resolver::Resolver;
use carton_util::progress;

/// Options for `carton update`.
#[derive(Debug, Default)]
pub struct UpdateOptions {
    /// Print the resolved manifest instead of writing it.
    pub dry_run: bool,
    /// Override the configured number of concurrent fetches.
    pub jobs: Option<usize>,
}

/// Resolve the project's dependencies with the git source and write
/// `Cartfile.resolved`.
pub async fn update(project_root: &Path, opts: &UpdateOptions) -> miette::Result<()> {
    let resolver = crate::git_resolver(project_root, opts.jobs)?;
    update_with(project_root, &resolver, opts).await
}

/// [`update`] with a caller-supplied resolver.
pub async fn update_with(
    project_root: &Path,
    resolver: &Resolver,
    opts: &UpdateOptions,
) -> miette::Result<()> {
    let root = crate::load_root_manifest(project_root)?;

    let sp = progress::spinner("Resolving dependencies...");
    let result = resolver.resolve(&root).await;
    sp.finish_and_clear();
    let resolution = result?;

    let resolved_path = project_root.join(RESOLVED_CARTFILE);
    let previous = if resolved_path.is_file() {
        match ResolvedCartfile::from_path(&resolved_path) {
            Ok(previous) => Some(previous),
            Err(e) => {
                tracing::warn!("Ignoring malformed {RESOLVED_CARTFILE}: {e}");
                None
            }
        }
    } else {
        None
    };
    report_changes(previous.as_ref(), &resolution.resolved);

    if opts.dry_run {
        print!("{}", resolution.resolved);
        return Ok(());
    }

    resolution.resolved.write_to(&resolved_path)?;
    progress::status(
        "Resolved",
        &format!(
            "{} dependencies into {RESOLVED_CARTFILE}",
            resolution.resolved.len()
        ),
    );
    Ok(())
}

fn report_changes(previous: Option<&ResolvedCartfile>, current: &ResolvedCartfile) {
    for dep in current.dependencies() {
        match previous.and_then(|p| p.version_of(&dep.project)) {
            None => progress::status("Adding", &format!("{} {}", dep.project, dep.version)),
            Some(old) if old != &dep.version => progress::status(
                "Updating",
                &format!("{} {old} -> {}", dep.project, dep.version),
            ),
            Some(_) => {}
        }
    }
    if let Some(previous) = previous {
        for dep in previous.dependencies() {
            if current.version_of(&dep.project).is_none() {
                progress::status_warn("Removing", &format!("{} {}", dep.project, dep.version));
            }
        }
    }
}
