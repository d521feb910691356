//! Constraint accumulation and unsatisfiable-constraint reporting.

use std::fmt;

use carton_core::project::ProjectIdentifier;
use carton_core::version::{PinnedVersion, VersionSpecifier};
use carton_util::errors::CartonError;

/// Where a requirement on a project came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Origin {
    /// The root manifest being resolved.
    Root,
    /// The manifest of `project` at version `version`.
    Dependency {
        project: ProjectIdentifier,
        version: PinnedVersion,
    },
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Root => f.write_str("Cartfile"),
            Origin::Dependency { project, version } => write!(f, "{project} {version}"),
        }
    }
}

/// A single constraint placed on a project by some manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
    pub origin: Origin,
    pub specifier: VersionSpecifier,
}

impl Requirement {
    pub fn new(origin: Origin, specifier: VersionSpecifier) -> Self {
        Self { origin, specifier }
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} requires {}", self.origin, self.specifier)
    }
}

/// Outcome of adding a requirement to a [`ConstraintChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Merge {
    /// The merged constraint is the same as before.
    Unchanged,
    /// The merged constraint narrowed; the project must be re-selected.
    Tightened,
    /// No version can satisfy every requirement.
    Conflict,
}

/// Outcome of withdrawing the requirements of one origin from a
/// [`ConstraintChain`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Retraction {
    /// Nothing changed, or the merged constraint stayed the same.
    Unaffected,
    /// The merged constraint widened; the project must be re-selected.
    Loosened,
    /// No requirement is left; nothing depends on the project any more.
    Emptied,
}

/// Every requirement placed on one project, in arrival order, with their
/// running intersection.
#[derive(Debug, Clone)]
pub struct ConstraintChain {
    requirements: Vec<Requirement>,
    merged: VersionSpecifier,
}

impl ConstraintChain {
    pub fn new(first: Requirement) -> Self {
        Self {
            merged: first.specifier.clone(),
            requirements: vec![first],
        }
    }

    /// The intersection of every requirement so far.
    pub fn merged(&self) -> &VersionSpecifier {
        &self.merged
    }

    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }

    /// Record `requirement` and narrow the merged constraint.
    ///
    /// A requirement already in the chain is ignored. A conflicting one is
    /// still recorded so that it shows up in the error.
    pub fn add(&mut self, requirement: Requirement) -> Merge {
        if self.requirements.contains(&requirement) {
            return Merge::Unchanged;
        }
        let narrowed = self.merged.intersect(&requirement.specifier);
        self.requirements.push(requirement);
        match narrowed {
            None => Merge::Conflict,
            Some(spec) if spec == self.merged => Merge::Unchanged,
            Some(spec) => {
                self.merged = spec;
                Merge::Tightened
            }
        }
    }

    /// Withdraw every requirement placed by `origin` and recompute the merged
    /// constraint from what remains.
    pub fn retract(&mut self, origin: &Origin) -> Retraction {
        let before = self.requirements.len();
        self.requirements.retain(|req| &req.origin != origin);
        if self.requirements.len() == before {
            return Retraction::Unaffected;
        }
        if self.requirements.is_empty() {
            self.merged = VersionSpecifier::Any;
            return Retraction::Emptied;
        }

        let merged = self
            .requirements
            .iter()
            .try_fold(VersionSpecifier::Any, |acc, req| acc.intersect(&req.specifier));
        match merged {
            Some(spec) if spec != self.merged => {
                self.merged = spec;
                Retraction::Loosened
            }
            _ => Retraction::Unaffected,
        }
    }

    /// The error reported when no available version of `project` satisfies
    /// this chain.
    pub fn unsatisfiable(&self, project: &ProjectIdentifier) -> CartonError {
        CartonError::Unsatisfiable {
            project: project.to_string(),
            chain: self.requirements.iter().map(ToString::to_string).collect(),
        }
    }
}

impl fmt::Display for ConstraintChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, req) in self.requirements.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{req}")?;
        }
        Ok(())
    }
}
