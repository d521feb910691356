use std::fmt;

use crate::project::ProjectIdentifier;
use crate::version::{PinnedVersion, VersionSpecifier};

/// A project paired with a version: a constraint in a declared manifest,
/// a pin in a resolved one.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Dependency<V> {
    pub project: ProjectIdentifier,
    pub version: V,
}

/// An entry of a `Cartfile`.
pub type DeclaredDependency = Dependency<VersionSpecifier>;

/// An entry of a `Cartfile.resolved`.
pub type ResolvedDependency = Dependency<PinnedVersion>;

impl<V> Dependency<V> {
    pub fn new(project: ProjectIdentifier, version: V) -> Self {
        Self { project, version }
    }
}

impl fmt::Display for DeclaredDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} \"{}\"", self.project.kind(), self.project)?;
        if let Some(token) = self.version.manifest_token() {
            write!(f, " {token}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ResolvedDependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} \"{}\" \"{}\"",
            self.project.kind(),
            self.project,
            self.version
        )
    }
}
