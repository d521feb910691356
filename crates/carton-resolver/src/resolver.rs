//! Round-based dependency resolution.
//!
//! Each round takes every project whose merged constraint changed, selects a
//! version for each and fetches the manifest at that version, concurrently.
//! The round's results are then merged in the order the projects were first
//! discovered, never in completion order, so the outcome does not depend on
//! timing.
//!
//! When a project is re-pinned, the requirements its previous pin placed on
//! other projects are withdrawn, which can widen their constraints again. A
//! pin that was replaced is never selected again for that project, and each
//! project has finitely many candidates, so resolution terminates.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use carton_core::cartfile::{Cartfile, ResolvedCartfile};
use carton_core::dependency::Dependency;
use carton_core::project::ProjectIdentifier;
use carton_core::version::{PinnedVersion, SemanticVersion, VersionSpecifier};
use carton_util::errors::{CartonError, CartonResult};

use crate::cache::FetchCache;
use crate::conflict::{ConstraintChain, Merge, Origin, Requirement, Retraction};
use crate::graph::{DepEdge, DependencyGraph};
use crate::source::ProjectSource;

/// Default upper bound on concurrent collaborator calls.
pub const MAX_CONCURRENT_FETCHES: usize = 8;

/// The output of dependency resolution.
#[derive(Debug)]
pub struct Resolution {
    /// Every project reachable from the root, in first-discovery order.
    pub resolved: ResolvedCartfile,
    pub graph: DependencyGraph,
}

/// Resolves a manifest against a [`ProjectSource`].
pub struct Resolver {
    source: Arc<dyn ProjectSource>,
    jobs: usize,
    root_name: String,
}

impl Resolver {
    pub fn new(source: Arc<dyn ProjectSource>) -> Self {
        Self {
            source,
            jobs: MAX_CONCURRENT_FETCHES,
            root_name: "Cartfile".to_string(),
        }
    }

    /// Bound the number of concurrent collaborator calls. Zero is treated as one.
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Label for the root node of the resolution graph.
    pub fn with_root_name(mut self, name: impl Into<String>) -> Self {
        self.root_name = name.into();
        self
    }

    /// Pin every project reachable from `root` to a single version that
    /// satisfies all constraints placed on it.
    pub async fn resolve(&self, root: &Cartfile) -> CartonResult<Resolution> {
        let cache = Arc::new(FetchCache::new(self.source.clone()));
        let semaphore = Arc::new(Semaphore::new(self.jobs));

        let mut state = ResolveState::default();
        for dep in root.dependencies() {
            let requirement = Requirement::new(Origin::Root, dep.version.clone());
            state.require(&dep.project, requirement)?;
        }

        let mut round = 0usize;
        loop {
            let level = state.take_dirty();
            if level.is_empty() {
                break;
            }
            round += 1;
            tracing::debug!("Resolution round {round}: {} project(s)", level.len());

            let requests: Vec<FetchRequest> = level
                .into_iter()
                .map(|project| state.request(project))
                .collect();
            let fetched = fetch_level(&cache, &semaphore, &requests, &state.constraints).await?;

            for (request, pin, manifest) in fetched {
                // The constraint moved while this round was merged, so the
                // project is already queued again with the new one.
                if !state.is_current(&request) {
                    continue;
                }
                if state.pins.get(&request.project) == Some(&pin) {
                    continue;
                }
                state.adopt(request.project, pin, manifest)?;
            }
        }

        let ResolveState {
            order,
            pins,
            manifests,
            ..
        } = state;
        let reachable = reachable_projects(root, &manifests);
        let resolved: Vec<_> = order
            .iter()
            .filter(|project| reachable.contains(*project))
            .filter_map(|project| {
                pins.get(project)
                    .map(|pin| Dependency::new(project.clone(), pin.clone()))
            })
            .collect();
        let resolved = ResolvedCartfile::new(resolved)?;

        let graph = build_graph(&self.root_name, root, &resolved, &manifests);
        for cycle in graph.cycles() {
            let names: Vec<String> = cycle.iter().map(ToString::to_string).collect();
            tracing::warn!("Dependency cycle: {}", names.join(" -> "));
        }

        tracing::info!(
            "Resolved {} dependencies in {round} round(s), {} collaborator answer(s) cached",
            resolved.len(),
            cache.len()
        );

        Ok(Resolution { resolved, graph })
    }
}

/// Everything known about the graph between rounds.
#[derive(Default)]
struct ResolveState {
    constraints: HashMap<ProjectIdentifier, ConstraintChain>,
    /// Projects in first-discovery order.
    order: Vec<ProjectIdentifier>,
    pins: HashMap<ProjectIdentifier, PinnedVersion>,
    manifests: HashMap<ProjectIdentifier, Cartfile>,
    /// Pins that were replaced and may not be selected again.
    abandoned: HashMap<ProjectIdentifier, HashSet<PinnedVersion>>,
    /// Projects that need a version selected in the next round.
    dirty: HashSet<ProjectIdentifier>,
}

impl ResolveState {
    /// Add a requirement on `project`, queueing it when its merged constraint
    /// changed or it has no pin yet.
    fn require(&mut self, project: &ProjectIdentifier, requirement: Requirement) -> CartonResult<()> {
        match self.constraints.get_mut(project) {
            None => {
                self.constraints
                    .insert(project.clone(), ConstraintChain::new(requirement));
                self.order.push(project.clone());
                self.dirty.insert(project.clone());
            }
            Some(chain) => match chain.add(requirement) {
                Merge::Conflict => return Err(chain.unsatisfiable(project)),
                Merge::Tightened => {
                    self.dirty.insert(project.clone());
                }
                Merge::Unchanged => {
                    if !self.pins.contains_key(project) {
                        self.dirty.insert(project.clone());
                    }
                }
            },
        }
        Ok(())
    }

    /// Pin `project` and apply the requirements of its manifest, withdrawing
    /// whatever its previous pin required.
    fn adopt(
        &mut self,
        project: ProjectIdentifier,
        pin: PinnedVersion,
        manifest: Cartfile,
    ) -> CartonResult<()> {
        match self.pins.insert(project.clone(), pin.clone()) {
            Some(old) => {
                tracing::debug!("Re-pinned {project} from {old} to {pin}");
                self.abandoned
                    .entry(project.clone())
                    .or_default()
                    .insert(old.clone());
                self.retract(Origin::Dependency {
                    project: project.clone(),
                    version: old,
                });
            }
            None => tracing::debug!("Pinned {project} at {pin}"),
        }

        let origin = Origin::Dependency {
            project: project.clone(),
            version: pin,
        };
        for dep in manifest.dependencies() {
            self.require(&dep.project, Requirement::new(origin.clone(), dep.version.clone()))?;
        }
        self.manifests.insert(project, manifest);
        Ok(())
    }

    /// Withdraw every requirement placed by `origin`. A project left with no
    /// requirement loses its pin, and what that pin required is withdrawn too.
    fn retract(&mut self, origin: Origin) {
        let mut pending = vec![origin];
        while let Some(origin) = pending.pop() {
            for project in &self.order {
                let Some(chain) = self.constraints.get_mut(project) else {
                    continue;
                };
                match chain.retract(&origin) {
                    Retraction::Unaffected => {}
                    Retraction::Loosened => {
                        self.dirty.insert(project.clone());
                    }
                    Retraction::Emptied => {
                        self.dirty.remove(project);
                        self.manifests.remove(project);
                        if let Some(pin) = self.pins.remove(project) {
                            tracing::debug!("Unpinned {project}, nothing requires it");
                            pending.push(Origin::Dependency {
                                project: project.clone(),
                                version: pin,
                            });
                        }
                    }
                }
            }
        }
    }

    /// Drain the queued projects in discovery order.
    fn take_dirty(&mut self) -> Vec<ProjectIdentifier> {
        let dirty = std::mem::take(&mut self.dirty);
        self.order
            .iter()
            .filter(|project| dirty.contains(*project))
            .cloned()
            .collect()
    }

    fn request(&self, project: ProjectIdentifier) -> FetchRequest {
        let constraint = self
            .constraints
            .get(&project)
            .map(|chain| chain.merged().clone())
            .unwrap_or(VersionSpecifier::Any);
        let excluded = self.abandoned.get(&project).cloned().unwrap_or_default();
        FetchRequest {
            project,
            constraint,
            excluded,
        }
    }

    /// Whether the result of `request` still answers the project's constraint.
    fn is_current(&self, request: &FetchRequest) -> bool {
        self.constraints.get(&request.project).is_some_and(|chain| {
            !chain.requirements().is_empty() && chain.merged() == &request.constraint
        })
    }
}

/// One project to select and fetch in a round.
#[derive(Clone)]
struct FetchRequest {
    project: ProjectIdentifier,
    constraint: VersionSpecifier,
    /// Pins replaced earlier in this resolution.
    excluded: HashSet<PinnedVersion>,
}

/// Why a project in a round could not be pinned.
enum FetchFailure {
    /// No available version satisfies the merged constraint.
    NoMatch,
    Source(CartonError),
}

impl From<CartonError> for FetchFailure {
    fn from(err: CartonError) -> Self {
        FetchFailure::Source(err)
    }
}

/// Select and fetch every request of one round concurrently, returning the
/// results in request order.
///
/// When any request fails the round is abandoned. The reported failure is
/// the one with the lowest slot, once every lower slot has finished, so it
/// does not depend on completion order.
async fn fetch_level(
    cache: &Arc<FetchCache>,
    semaphore: &Arc<Semaphore>,
    requests: &[FetchRequest],
    constraints: &HashMap<ProjectIdentifier, ConstraintChain>,
) -> CartonResult<Vec<(FetchRequest, PinnedVersion, Cartfile)>> {
    let mut join_set = JoinSet::new();
    for (slot, request) in requests.iter().enumerate() {
        let cache = cache.clone();
        let sem = semaphore.clone();
        let request = request.clone();
        join_set.spawn(async move {
            let _permit = sem.acquire().await;
            let result = select_and_fetch(&cache, &request).await;
            (slot, result)
        });
    }

    let mut slots: Vec<Option<(PinnedVersion, Cartfile)>> = vec![None; requests.len()];
    let mut finished = vec![false; requests.len()];
    let mut failed: Option<(usize, FetchFailure)> = None;
    while let Some(joined) = join_set.join_next().await {
        let (slot, result) = match joined {
            Ok(done) => done,
            Err(e) => {
                join_set.detach_all();
                return Err(CartonError::Generic {
                    message: format!("Fetch task failed: {e}"),
                });
            }
        };
        finished[slot] = true;
        match result {
            Ok(fetched) => slots[slot] = Some(fetched),
            Err(failure) => {
                if failed.as_ref().map_or(true, |(lowest, _)| slot < *lowest) {
                    failed = Some((slot, failure));
                }
            }
        }
        if let Some((lowest, _)) = &failed {
            if finished[..*lowest].iter().all(|done| *done) {
                break;
            }
        }
    }

    if let Some((slot, failure)) = failed {
        join_set.detach_all();
        let project = &requests[slot].project;
        return Err(match failure {
            FetchFailure::Source(err) => err,
            FetchFailure::NoMatch => match constraints.get(project) {
                Some(chain) => chain.unsatisfiable(project),
                None => CartonError::Unsatisfiable {
                    project: project.to_string(),
                    chain: Vec::new(),
                },
            },
        });
    }

    Ok(requests
        .iter()
        .zip(slots)
        .filter_map(|(request, slot)| slot.map(|(pin, manifest)| (request.clone(), pin, manifest)))
        .collect())
}

async fn select_and_fetch(
    cache: &FetchCache,
    request: &FetchRequest,
) -> Result<(PinnedVersion, Cartfile), FetchFailure> {
    let project = &request.project;
    let pin = match &request.constraint {
        VersionSpecifier::GitReference(name) => {
            let pin = cache.reference(project, name).await?;
            if request.excluded.contains(&pin) {
                return Err(FetchFailure::NoMatch);
            }
            pin
        }
        constraint => {
            let available: Vec<PinnedVersion> = cache
                .versions(project)
                .await?
                .into_iter()
                .filter(|candidate| !request.excluded.contains(candidate))
                .collect();
            select_version(&available, constraint).ok_or(FetchFailure::NoMatch)?
        }
    };
    let manifest = cache.manifest(project, &pin).await?;
    Ok((pin, manifest))
}

/// The highest semantic version in `available` that satisfies `constraint`.
///
/// Among equal semantic versions the first listed wins. When no candidate
/// has a semantic version, `any` falls back to the first listed candidate.
pub fn select_version(
    available: &[PinnedVersion],
    constraint: &VersionSpecifier,
) -> Option<PinnedVersion> {
    let mut best: Option<(&PinnedVersion, SemanticVersion)> = None;
    for candidate in available.iter().filter(|c| constraint.matches(c)) {
        let Some(version) = candidate.semantic_version() else {
            continue;
        };
        match best {
            Some((kept, current)) if version == current => {
                tracing::warn!("Tags {kept} and {candidate} name the same version, using {kept}");
            }
            Some((_, current)) if version < current => {}
            _ => best = Some((candidate, version)),
        }
    }
    best.map(|(candidate, _)| candidate.clone())
        .or_else(|| available.iter().find(|c| constraint.matches(c)).cloned())
}

/// Projects reachable from the root manifest through the final pins.
fn reachable_projects(
    root: &Cartfile,
    manifests: &HashMap<ProjectIdentifier, Cartfile>,
) -> HashSet<ProjectIdentifier> {
    let mut reachable = HashSet::new();
    let mut queue: VecDeque<&ProjectIdentifier> =
        root.dependencies().iter().map(|d| &d.project).collect();

    while let Some(project) = queue.pop_front() {
        if !reachable.insert(project.clone()) {
            continue;
        }
        if let Some(manifest) = manifests.get(project) {
            queue.extend(manifest.dependencies().iter().map(|d| &d.project));
        }
    }

    reachable
}

fn build_graph(
    root_name: &str,
    root: &Cartfile,
    resolved: &ResolvedCartfile,
    manifests: &HashMap<ProjectIdentifier, Cartfile>,
) -> DependencyGraph {
    let mut graph = DependencyGraph::new(root_name);
    for dep in resolved.dependencies() {
        graph.add_project(dep.clone());
    }

    let root_idx = graph.root();
    let mut edges = Vec::new();
    for dep in root.dependencies() {
        edges.push((root_idx, dep));
    }
    for resolved_dep in resolved.dependencies() {
        let (Some(from), Some(manifest)) = (
            graph.find(&resolved_dep.project),
            manifests.get(&resolved_dep.project),
        ) else {
            continue;
        };
        for dep in manifest.dependencies() {
            edges.push((from, dep));
        }
    }

    for (from, dep) in edges {
        if let Some(to) = graph.find(&dep.project) {
            graph.add_edge(
                from,
                to,
                DepEdge {
                    constraint: dep.version.clone(),
                },
            );
        }
    }

    graph
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pins(tags: &[&str]) -> Vec<PinnedVersion> {
        tags.iter().map(|t| PinnedVersion::new(*t)).collect()
    }

    fn spec(s: &str) -> VersionSpecifier {
        VersionSpecifier::parse(s).unwrap()
    }

    #[test]
    fn selects_highest_matching() {
        let available = pins(&["1.0.0", "2.1.0", "1.5.0", "3.0.0"]);
        assert_eq!(
            select_version(&available, &spec("~> 1.0")),
            Some(PinnedVersion::new("1.5.0"))
        );
        assert_eq!(
            select_version(&available, &VersionSpecifier::Any),
            Some(PinnedVersion::new("3.0.0"))
        );
        assert_eq!(select_version(&available, &spec(">= 4.0")), None);
    }

    #[test]
    fn equal_versions_prefer_first_listed() {
        let available = pins(&["v1.0.0", "1.0", "1.0.0"]);
        assert_eq!(
            select_version(&available, &VersionSpecifier::Any),
            Some(PinnedVersion::new("v1.0.0"))
        );
    }

    #[test]
    fn unversioned_tags_only_match_any() {
        let available = pins(&["nightly", "beta-tag"]);
        assert_eq!(
            select_version(&available, &VersionSpecifier::Any),
            Some(PinnedVersion::new("nightly"))
        );
        assert_eq!(select_version(&available, &spec(">= 0.1")), None);
    }

    #[test]
    fn prerelease_tags_are_skipped() {
        let available = pins(&["2.0.0-beta", "1.9.0"]);
        assert_eq!(
            select_version(&available, &VersionSpecifier::Any),
            Some(PinnedVersion::new("1.9.0"))
        );
    }
}
