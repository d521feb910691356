//! Version constraints and pinned versions.
//!
//! A [`VersionSpecifier`] is what a manifest asks for; a [`PinnedVersion`] is
//! what resolution settles on (a tag or a commit-ish). Pinned versions that
//! look like `v1.2.3` decompose into a [`SemanticVersion`] for matching.
//!
//! Compatibility follows caret rules: `~> 1.2` accepts `1.2.0 ..< 2.0.0`,
//! but a zero major pins the minor, so `~> 0.4.1` accepts `0.4.1 ..< 0.5.0`.

use std::fmt;

use carton_util::errors::{CartonError, CartonResult};

/// A `major.minor.patch` version, ordered lexicographically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SemanticVersion {
    pub major: u64,
    pub minor: u64,
    pub patch: u64,
}

impl SemanticVersion {
    pub const fn new(major: u64, minor: u64, patch: u64) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// Parse `1`, `1.2`, or `1.2.3`, with an optional leading `v`.
    ///
    /// Missing components default to zero. Pre-release and build suffixes
    /// (`1.0.0-beta`) are not semantic versions here and yield `None`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        if s.contains(['-', '+']) {
            return None;
        }

        let mut parts: Vec<&str> = s.split('.').collect();
        if parts.is_empty() || parts.len() > 3 {
            return None;
        }
        parts.resize(3, "0");

        let parsed = semver::Version::parse(&parts.join(".")).ok()?;
        Some(Self::new(parsed.major, parsed.minor, parsed.patch))
    }

    /// Whether `self` lies in the same compatibility series as `base`:
    /// same major, and also same minor when the major is zero.
    pub fn is_compatible_with(&self, base: &SemanticVersion) -> bool {
        self.major == base.major && (base.major != 0 || self.minor == base.minor)
    }
}

impl fmt::Display for SemanticVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// A concrete version selected for a dependency: a tag name or a commit-ish.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PinnedVersion {
    commitish: String,
    semantic: Option<SemanticVersion>,
}

impl PinnedVersion {
    pub fn new(commitish: impl Into<String>) -> Self {
        let commitish = commitish.into();
        let semantic = SemanticVersion::parse(&commitish);
        Self {
            commitish,
            semantic,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.commitish
    }

    /// The semantic version this tag decomposes into, if any.
    pub fn semantic_version(&self) -> Option<SemanticVersion> {
        self.semantic
    }
}

impl fmt::Display for PinnedVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.commitish)
    }
}

/// A constraint over acceptable versions of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum VersionSpecifier {
    Any,
    Exactly(SemanticVersion),
    AtLeast(SemanticVersion),
    CompatibleWith(SemanticVersion),
    /// A branch, tag, or commit resolved by the source at resolution time.
    GitReference(String),
}

impl VersionSpecifier {
    /// Parse a standalone version token.
    ///
    /// `""` is `any`; `== v`, `>= v`, `~> v` are semantic constraints (the
    /// space after the operator is optional); anything else is taken as a git
    /// reference name.
    ///
    /// A standalone token has no position of its own, so errors report line
    /// 1. Use [`VersionSpecifier::parse_on_line`] when the token came from a
    /// larger document.
    pub fn parse(token: &str) -> CartonResult<Self> {
        Self::parse_on_line(token, 1)
    }

    /// [`VersionSpecifier::parse`], reporting errors against `line`.
    pub fn parse_on_line(token: &str, line: usize) -> CartonResult<Self> {
        let token = token.trim();
        let parsed = if token.is_empty() {
            Ok(VersionSpecifier::Any)
        } else if has_operator(token) {
            parse_operator(token)
        } else if token.chars().any(char::is_whitespace) {
            Err(format!("invalid version specifier `{token}`"))
        } else {
            Ok(VersionSpecifier::GitReference(token.to_string()))
        };

        parsed.map_err(|message| CartonError::Parse {
            line,
            text: token.to_string(),
            message,
        })
    }

    /// Whether `candidate` satisfies this constraint.
    ///
    /// Tags without a semantic version only ever match `any` or a git
    /// reference with the identical name.
    pub fn matches(&self, candidate: &PinnedVersion) -> bool {
        match self {
            VersionSpecifier::Any => true,
            VersionSpecifier::GitReference(name) => candidate.as_str() == name,
            _ => candidate
                .semantic_version()
                .is_some_and(|v| self.admits(&v)),
        }
    }

    /// Whether a semantic version lies within this constraint. Git
    /// references admit no semantic version.
    pub fn admits(&self, v: &SemanticVersion) -> bool {
        match self {
            VersionSpecifier::Any => true,
            VersionSpecifier::Exactly(e) => v == e,
            VersionSpecifier::AtLeast(min) => v >= min,
            VersionSpecifier::CompatibleWith(base) => v >= base && v.is_compatible_with(base),
            VersionSpecifier::GitReference(_) => false,
        }
    }

    /// The constraint satisfied by exactly the versions both `self` and
    /// `other` accept, or `None` when no version could satisfy both.
    pub fn intersect(&self, other: &VersionSpecifier) -> Option<VersionSpecifier> {
        use VersionSpecifier::*;

        match (self, other) {
            (Any, x) | (x, Any) => Some(x.clone()),
            (GitReference(a), GitReference(b)) => (a == b).then(|| GitReference(a.clone())),
            (GitReference(_), _) | (_, GitReference(_)) => None,
            (Exactly(a), Exactly(b)) => (a == b).then_some(Exactly(*a)),
            (Exactly(v), range) | (range, Exactly(v)) => range.admits(v).then_some(Exactly(*v)),
            (AtLeast(a), AtLeast(b)) => Some(AtLeast(*a.max(b))),
            (AtLeast(min), CompatibleWith(base)) | (CompatibleWith(base), AtLeast(min)) => {
                let lower = *min.max(base);
                lower.is_compatible_with(base).then_some(CompatibleWith(lower))
            }
            (CompatibleWith(a), CompatibleWith(b)) => {
                a.is_compatible_with(b).then(|| CompatibleWith(*a.max(b)))
            }
        }
    }

    /// The token written after the identifier in a manifest, or `None` for
    /// `any`, which is written as nothing at all.
    pub fn manifest_token(&self) -> Option<String> {
        match self {
            VersionSpecifier::Any => None,
            other => Some(other.to_string()),
        }
    }
}

impl fmt::Display for VersionSpecifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VersionSpecifier::Any => f.write_str("any"),
            VersionSpecifier::Exactly(v) => write!(f, "== {v}"),
            VersionSpecifier::AtLeast(v) => write!(f, ">= {v}"),
            VersionSpecifier::CompatibleWith(v) => write!(f, "~> {v}"),
            VersionSpecifier::GitReference(name) => write!(f, "\"{name}\""),
        }
    }
}

pub(crate) fn has_operator(token: &str) -> bool {
    ["==", ">=", "~>"].iter().any(|op| token.starts_with(op))
}

/// Parse `== v`, `>= v` or `~> v`. The caller has checked [`has_operator`].
pub(crate) fn parse_operator(token: &str) -> Result<VersionSpecifier, String> {
    let (op, rest) = token.split_at(2);
    let rest = rest.trim();
    let version = SemanticVersion::parse(rest)
        .ok_or_else(|| format!("invalid semantic version `{rest}`"))?;
    Ok(match op {
        "==" => VersionSpecifier::Exactly(version),
        ">=" => VersionSpecifier::AtLeast(version),
        _ => VersionSpecifier::CompatibleWith(version),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn v(major: u64, minor: u64, patch: u64) -> SemanticVersion {
        SemanticVersion::new(major, minor, patch)
    }

    fn pin(s: &str) -> PinnedVersion {
        PinnedVersion::new(s)
    }

    #[test]
    fn parses_semantic_versions() {
        assert_eq!(SemanticVersion::parse("2.3.1"), Some(v(2, 3, 1)));
        assert_eq!(SemanticVersion::parse("v2.3.1"), Some(v(2, 3, 1)));
        assert_eq!(SemanticVersion::parse("1.0"), Some(v(1, 0, 0)));
        assert_eq!(SemanticVersion::parse("3"), Some(v(3, 0, 0)));
    }

    #[test]
    fn rejects_non_semantic_tags() {
        assert_eq!(SemanticVersion::parse("1.0.0-beta"), None);
        assert_eq!(SemanticVersion::parse("release-2014"), None);
        assert_eq!(SemanticVersion::parse("1.2.3.4"), None);
        assert_eq!(SemanticVersion::parse("40abed6e58b4864afac235c3bb2552e23bc9da47"), None);
        assert_eq!(SemanticVersion::parse(""), None);
    }

    #[test]
    fn ordering_is_lexicographic() {
        assert!(v(1, 9, 9) < v(2, 0, 0));
        assert!(v(1, 2, 3) < v(1, 10, 0));
        assert!(v(0, 0, 9) < v(0, 1, 0));
    }

    #[test]
    fn parses_specifiers() {
        assert_eq!(VersionSpecifier::parse("").unwrap(), VersionSpecifier::Any);
        assert_eq!(
            VersionSpecifier::parse(">= 2.3.1").unwrap(),
            VersionSpecifier::AtLeast(v(2, 3, 1))
        );
        assert_eq!(
            VersionSpecifier::parse("~>1.0").unwrap(),
            VersionSpecifier::CompatibleWith(v(1, 0, 0))
        );
        assert_eq!(
            VersionSpecifier::parse("==0.4.1").unwrap(),
            VersionSpecifier::Exactly(v(0, 4, 1))
        );
        assert_eq!(
            VersionSpecifier::parse("development").unwrap(),
            VersionSpecifier::GitReference("development".into())
        );
    }

    #[test]
    fn bad_specifier_is_parse_error() {
        let err = VersionSpecifier::parse(">= one").unwrap_err();
        assert!(matches!(err, CartonError::Parse { .. }));
        assert!(VersionSpecifier::parse("two words").is_err());
    }

    #[test]
    fn parse_errors_carry_the_given_line() {
        match VersionSpecifier::parse_on_line("~> x.y", 7).unwrap_err() {
            CartonError::Parse { line, text, .. } => {
                assert_eq!(line, 7);
                assert_eq!(text, "~> x.y");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            VersionSpecifier::parse("~> x.y").unwrap_err(),
            CartonError::Parse { line: 1, .. }
        ));
    }

    #[test]
    fn exactly_matches_only_equal_semantic_version() {
        let spec = VersionSpecifier::Exactly(v(1, 2, 0));
        assert!(spec.matches(&pin("v1.2")));
        assert!(spec.matches(&pin("1.2.0")));
        assert!(!spec.matches(&pin("1.2.1")));
        assert!(!spec.matches(&pin("main")));
    }

    #[test]
    fn at_least_matches_greater_or_equal() {
        let spec = VersionSpecifier::AtLeast(v(2, 3, 1));
        assert!(spec.matches(&pin("2.3.1")));
        assert!(spec.matches(&pin("3.0.0")));
        assert!(!spec.matches(&pin("2.3.0")));
    }

    #[test]
    fn compatible_with_stays_within_major() {
        let spec = VersionSpecifier::CompatibleWith(v(1, 2, 0));
        assert!(spec.matches(&pin("1.2.0")));
        assert!(spec.matches(&pin("1.9.4")));
        assert!(!spec.matches(&pin("1.1.9")));
        assert!(!spec.matches(&pin("2.0.0")));
    }

    #[test]
    fn compatible_with_zero_major_pins_minor() {
        let spec = VersionSpecifier::CompatibleWith(v(0, 4, 1));
        assert!(spec.matches(&pin("0.4.1")));
        assert!(spec.matches(&pin("0.4.7")));
        assert!(!spec.matches(&pin("0.5.0")));
        assert!(!spec.matches(&pin("1.4.1")));
    }

    #[test]
    fn compatible_with_never_crosses_major_or_zero_minor() {
        let bases = [v(0, 0, 1), v(0, 3, 0), v(1, 0, 0), v(2, 5, 3)];
        let candidates = ["0.0.1", "0.0.5", "0.3.2", "0.4.0", "1.0.0", "1.7.0", "2.5.3", "2.9.0", "3.0.0"];
        for base in bases {
            let spec = VersionSpecifier::CompatibleWith(base);
            for c in candidates {
                let candidate = pin(c);
                let sv = candidate.semantic_version().unwrap();
                if sv.major != base.major || (base.major == 0 && sv.minor != base.minor) {
                    assert!(!spec.matches(&candidate), "{spec} should not match {c}");
                }
            }
        }
    }

    #[test]
    fn unparseable_tags_match_any_and_identical_reference() {
        let hash = pin("40abed6e58b4864afac235c3bb2552e23bc9da47");
        assert!(VersionSpecifier::Any.matches(&hash));
        assert!(VersionSpecifier::GitReference(hash.as_str().into()).matches(&hash));
        assert!(!VersionSpecifier::GitReference("main".into()).matches(&hash));
        assert!(!VersionSpecifier::AtLeast(v(0, 0, 0)).matches(&hash));
    }

    #[test]
    fn intersect_rules() {
        use VersionSpecifier::*;
        assert_eq!(Any.intersect(&AtLeast(v(1, 0, 0))), Some(AtLeast(v(1, 0, 0))));
        assert_eq!(Exactly(v(1, 0, 0)).intersect(&Exactly(v(1, 0, 1))), None);
        assert_eq!(
            Exactly(v(1, 5, 0)).intersect(&AtLeast(v(1, 0, 0))),
            Some(Exactly(v(1, 5, 0)))
        );
        assert_eq!(Exactly(v(0, 9, 0)).intersect(&AtLeast(v(1, 0, 0))), None);
        assert_eq!(Exactly(v(2, 0, 0)).intersect(&CompatibleWith(v(1, 0, 0))), None);
        assert_eq!(
            AtLeast(v(1, 0, 0)).intersect(&AtLeast(v(1, 4, 0))),
            Some(AtLeast(v(1, 4, 0)))
        );
        assert_eq!(
            CompatibleWith(v(1, 1, 0)).intersect(&CompatibleWith(v(1, 3, 0))),
            Some(CompatibleWith(v(1, 3, 0)))
        );
        assert_eq!(CompatibleWith(v(1, 0, 0)).intersect(&CompatibleWith(v(2, 0, 0))), None);
        assert_eq!(CompatibleWith(v(0, 1, 0)).intersect(&CompatibleWith(v(0, 2, 0))), None);
        assert_eq!(
            AtLeast(v(1, 2, 0)).intersect(&CompatibleWith(v(1, 0, 0))),
            Some(CompatibleWith(v(1, 2, 0)))
        );
        assert_eq!(
            AtLeast(v(0, 5, 0)).intersect(&CompatibleWith(v(1, 0, 0))),
            Some(CompatibleWith(v(1, 0, 0)))
        );
        assert_eq!(AtLeast(v(2, 0, 0)).intersect(&CompatibleWith(v(1, 0, 0))), None);
        assert_eq!(
            GitReference("dev".into()).intersect(&GitReference("dev".into())),
            Some(GitReference("dev".into()))
        );
        assert_eq!(GitReference("dev".into()).intersect(&GitReference("main".into())), None);
        assert_eq!(GitReference("dev".into()).intersect(&AtLeast(v(1, 0, 0))), None);
        assert_eq!(
            GitReference("dev".into()).intersect(&Any),
            Some(GitReference("dev".into()))
        );
    }

    fn samples() -> Vec<VersionSpecifier> {
        use VersionSpecifier::*;
        vec![
            Any,
            Exactly(v(1, 2, 0)),
            Exactly(v(0, 4, 1)),
            AtLeast(v(1, 0, 0)),
            AtLeast(v(1, 5, 0)),
            AtLeast(v(0, 4, 0)),
            CompatibleWith(v(1, 1, 0)),
            CompatibleWith(v(0, 4, 0)),
            CompatibleWith(v(2, 0, 0)),
            GitReference("development".into()),
        ]
    }

    #[test]
    fn intersect_is_commutative() {
        for a in samples() {
            for b in samples() {
                assert_eq!(a.intersect(&b), b.intersect(&a), "{a} / {b}");
            }
        }
    }

    #[test]
    fn intersect_is_associative() {
        for a in samples() {
            for b in samples() {
                for c in samples() {
                    let left = a.intersect(&b).and_then(|ab| ab.intersect(&c));
                    let right = b.intersect(&c).and_then(|bc| a.intersect(&bc));
                    assert_eq!(left, right, "({a} & {b}) & {c}");
                }
            }
        }
    }

    #[test]
    fn any_is_identity() {
        for a in samples() {
            assert_eq!(VersionSpecifier::Any.intersect(&a), Some(a.clone()));
        }
    }

    #[test]
    fn display_round_trips_through_parse() {
        for spec in samples() {
            let token = spec.manifest_token().unwrap_or_default();
            let token = token.trim_matches('"');
            assert_eq!(VersionSpecifier::parse(token).unwrap(), spec);
        }
    }
}
