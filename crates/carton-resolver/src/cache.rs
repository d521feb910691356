//! Resolution session cache.
//!
//! Every collaborator call made during one resolution goes through a
//! [`FetchCache`]. Concurrent requests for the same key share a single
//! in-flight fetch, and a completed answer is served from memory for the rest
//! of the session. Failed fetches are not cached.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::OnceCell;

use carton_core::cartfile::Cartfile;
use carton_core::project::ProjectIdentifier;
use carton_core::version::PinnedVersion;
use carton_util::errors::CartonResult;

use crate::source::ProjectSource;

/// A map of lazily-initialized cells: the first caller for a key runs the
/// fetch, every concurrent caller for that key awaits the same result.
pub struct SingleFlight<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }

    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.entry(key.clone()).or_default().clone()
    }

    pub async fn get_or_fetch<F, Fut>(&self, key: &K, fetch: F) -> CartonResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = CartonResult<V>>,
    {
        let cell = self.cell(key);
        cell.get_or_try_init(fetch).await.cloned()
    }

    /// Number of keys holding a completed answer.
    pub fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(PoisonError::into_inner);
        cells.values().filter(|cell| cell.initialized()).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> Default for SingleFlight<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Memoizes the three collaborator queries for the lifetime of one resolution.
pub struct FetchCache {
    source: Arc<dyn ProjectSource>,
    versions: SingleFlight<ProjectIdentifier, Vec<PinnedVersion>>,
    manifests: SingleFlight<(ProjectIdentifier, PinnedVersion), Cartfile>,
    references: SingleFlight<(ProjectIdentifier, String), PinnedVersion>,
}

impl FetchCache {
    pub fn new(source: Arc<dyn ProjectSource>) -> Self {
        Self {
            source,
            versions: SingleFlight::new(),
            manifests: SingleFlight::new(),
            references: SingleFlight::new(),
        }
    }

    pub async fn versions(&self, project: &ProjectIdentifier) -> CartonResult<Vec<PinnedVersion>> {
        self.versions
            .get_or_fetch(project, || async {
                tracing::debug!("Listing versions of {project}");
                self.source.list_versions(project).await
            })
            .await
    }

    pub async fn manifest(
        &self,
        project: &ProjectIdentifier,
        at: &PinnedVersion,
    ) -> CartonResult<Cartfile> {
        let key = (project.clone(), at.clone());
        self.manifests
            .get_or_fetch(&key, || async {
                tracing::debug!("Fetching Cartfile of {project} at {at}");
                self.source.fetch_manifest(project, at).await
            })
            .await
    }

    pub async fn reference(
        &self,
        project: &ProjectIdentifier,
        name: &str,
    ) -> CartonResult<PinnedVersion> {
        let key = (project.clone(), name.to_string());
        self.references
            .get_or_fetch(&key, || async {
                tracing::debug!("Resolving reference \"{name}\" of {project}");
                self.source.resolve_reference(project, name).await
            })
            .await
    }

    /// Number of successfully fetched answers held by the cache.
    pub fn len(&self) -> usize {
        self.versions.len() + self.manifests.len() + self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
