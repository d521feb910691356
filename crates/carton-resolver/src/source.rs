//! The narrow interface through which resolution reaches the outside world.

use async_trait::async_trait;

use carton_core::cartfile::Cartfile;
use carton_core::project::ProjectIdentifier;
use carton_core::version::PinnedVersion;
use carton_util::errors::CartonResult;

/// Fetches manifests and version lists for projects.
///
/// This is the only place resolution performs I/O. Implementations own any
/// timeout and retry policy; resolution treats every error as fatal.
#[async_trait]
pub trait ProjectSource: Send + Sync {
    /// The dependencies `project` declares at version `at`. A project without
    /// a manifest has no dependencies.
    async fn fetch_manifest(
        &self,
        project: &ProjectIdentifier,
        at: &PinnedVersion,
    ) -> CartonResult<Cartfile>;

    /// Every version tag `project` exposes.
    async fn list_versions(&self, project: &ProjectIdentifier) -> CartonResult<Vec<PinnedVersion>>;

    /// Resolve a branch, tag, or commit name to a concrete commit-ish.
    async fn resolve_reference(
        &self,
        project: &ProjectIdentifier,
        name: &str,
    ) -> CartonResult<PinnedVersion>;
}
