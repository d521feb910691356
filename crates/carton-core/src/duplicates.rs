//! Duplicate project detection within one manifest and across two.
//!
//! Both scans run to completion before reporting so that an error names every
//! offending project, not just the first one found.

use std::collections::{HashMap, HashSet};

use carton_util::errors::CartonError;

use crate::dependency::Dependency;
use crate::project::ProjectIdentifier;

/// Every project declared two or more times, in order of first appearance.
pub fn find_duplicates<V>(deps: &[Dependency<V>]) -> Vec<ProjectIdentifier> {
    let mut counts: HashMap<&ProjectIdentifier, usize> = HashMap::new();
    for dep in deps {
        *counts.entry(&dep.project).or_default() += 1;
    }

    let mut reported = HashSet::new();
    deps.iter()
        .map(|dep| &dep.project)
        .filter(|project| counts[project] > 1 && reported.insert(*project))
        .cloned()
        .collect()
}

/// Projects declared in both `a` and `b`, in order of appearance in `a`.
///
/// Symmetric as a set: swapping the arguments only changes the order.
pub fn find_cross_duplicates<V, W>(a: &[Dependency<V>], b: &[Dependency<W>]) -> Vec<ProjectIdentifier> {
    let in_b: HashSet<&ProjectIdentifier> = b.iter().map(|dep| &dep.project).collect();
    let mut reported = HashSet::new();
    a.iter()
        .map(|dep| &dep.project)
        .filter(|project| in_b.contains(project) && reported.insert(*project))
        .cloned()
        .collect()
}

/// Build the error reporting `projects`, listed by display name in sorted order.
pub fn duplicates_error(projects: &[ProjectIdentifier]) -> CartonError {
    let mut names: Vec<String> = projects.iter().map(ToString::to_string).collect();
    names.sort();
    CartonError::DuplicateDependencies { projects: names }
}
