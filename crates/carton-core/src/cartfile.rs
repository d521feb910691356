//! `Cartfile` and `Cartfile.resolved` parsing and serialization.
//!
//! Both files share a line grammar:
//!
//! ```text
//! # comment
//! github "ReactiveCocoa/ReactiveCocoa" >= 2.3.1
//! git "https://enterprise.local/desktop/git-error-translations2.git" "development"
//! ```
//!
//! A declared manifest carries a constraint after the identifier (or nothing,
//! meaning any version); a resolved manifest always carries a quoted pin.
//! Parsing is all-or-nothing: the first malformed line fails the whole file.

use std::fmt;
use std::path::Path;

use carton_util::errors::{CartonError, CartonResult};

use crate::dependency::{DeclaredDependency, Dependency, ResolvedDependency};
use crate::duplicates::{duplicates_error, find_cross_duplicates, find_duplicates};
use crate::project::ProjectIdentifier;
use crate::version::{self, PinnedVersion, VersionSpecifier};

/// File name of the project manifest.
pub const CARTFILE: &str = "Cartfile";

/// File name of the private overlay manifest (dependencies not exported to dependents).
pub const PRIVATE_CARTFILE: &str = "Cartfile.private";

/// File name of the resolved manifest.
pub const RESOLVED_CARTFILE: &str = "Cartfile.resolved";

/// A declared manifest: ordered dependencies with version constraints.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cartfile {
    dependencies: Vec<DeclaredDependency>,
}

impl Cartfile {
    /// Build a manifest, rejecting any project declared more than once.
    pub fn new(dependencies: Vec<DeclaredDependency>) -> CartonResult<Self> {
        let dupes = find_duplicates(&dependencies);
        if !dupes.is_empty() {
            return Err(duplicates_error(&dupes));
        }
        Ok(Self { dependencies })
    }

    /// Parse manifest text.
    pub fn parse(text: &str) -> CartonResult<Self> {
        let dependencies = parse_lines(text, |line_no, line, project, rest| {
            let version = parse_declared_version(rest).map_err(|message| CartonError::Parse {
                line: line_no,
                text: line.to_string(),
                message,
            })?;
            Ok(Dependency::new(project, version))
        })?;
        Self::new(dependencies)
    }

    /// Load and parse a `Cartfile` from disk.
    pub fn from_path(path: &Path) -> CartonResult<Self> {
        Self::parse(&read_manifest(path)?)
    }

    pub fn dependencies(&self) -> &[DeclaredDependency] {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// Append the dependencies of an overlay manifest (e.g. `Cartfile.private`).
    ///
    /// Fails with every project the two manifests both declare.
    pub fn merged_with(&self, overlay: &Cartfile) -> CartonResult<Cartfile> {
        check_cross_duplicates(self, overlay)?;
        let mut dependencies = self.dependencies.clone();
        dependencies.extend(overlay.dependencies.iter().cloned());
        Ok(Self { dependencies })
    }
}

impl fmt::Display for Cartfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dep in &self.dependencies {
            writeln!(f, "{dep}")?;
        }
        Ok(())
    }
}

/// Fail with every project declared in both manifests.
pub fn check_cross_duplicates(a: &Cartfile, b: &Cartfile) -> CartonResult<()> {
    let dupes = find_cross_duplicates(a.dependencies(), b.dependencies());
    if dupes.is_empty() {
        Ok(())
    } else {
        Err(duplicates_error(&dupes))
    }
}

/// A resolved manifest: ordered dependencies pinned to exact versions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResolvedCartfile {
    dependencies: Vec<ResolvedDependency>,
}

impl ResolvedCartfile {
    pub fn new(dependencies: Vec<ResolvedDependency>) -> CartonResult<Self> {
        let dupes = find_duplicates(&dependencies);
        if !dupes.is_empty() {
            return Err(duplicates_error(&dupes));
        }
        Ok(Self { dependencies })
    }

    pub fn parse(text: &str) -> CartonResult<Self> {
        let dependencies = parse_lines(text, |line_no, line, project, rest| {
            match rest {
                [Token::Quoted(pin)] if !pin.is_empty() => {
                    Ok(Dependency::new(project, PinnedVersion::new(pin.as_str())))
                }
                _ => Err(CartonError::Parse {
                    line: line_no,
                    text: line.to_string(),
                    message: "expected a quoted pinned version".to_string(),
                }),
            }
        })?;
        Self::new(dependencies)
    }

    /// Load and parse a `Cartfile.resolved` from disk.
    pub fn from_path(path: &Path) -> CartonResult<Self> {
        Self::parse(&read_manifest(path)?)
    }

    /// Serialize and write to `path`, replacing any existing file atomically.
    pub fn write_to(&self, path: &Path) -> CartonResult<()> {
        carton_util::fs::write_atomic(path, &self.to_string())?;
        Ok(())
    }

    pub fn dependencies(&self) -> &[ResolvedDependency] {
        &self.dependencies
    }

    pub fn len(&self) -> usize {
        self.dependencies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dependencies.is_empty()
    }

    /// The pin recorded for `project`, if any.
    pub fn version_of(&self, project: &ProjectIdentifier) -> Option<&PinnedVersion> {
        self.dependencies
            .iter()
            .find(|dep| &dep.project == project)
            .map(|dep| &dep.version)
    }
}

impl fmt::Display for ResolvedCartfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for dep in &self.dependencies {
            writeln!(f, "{dep}")?;
        }
        Ok(())
    }
}

/// A lexical token of a manifest line.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Bare(String),
    Quoted(String),
}

fn read_manifest(path: &Path) -> CartonResult<String> {
    std::fs::read_to_string(path).map_err(|e| CartonError::Manifest {
        message: format!("Failed to read {}: {e}", path.display()),
    })
}

/// Drive the shared line grammar, handing each significant line's project
/// and trailing tokens to `entry`.
fn parse_lines<V, F>(text: &str, mut entry: F) -> CartonResult<Vec<Dependency<V>>>
where
    F: FnMut(usize, &str, ProjectIdentifier, &[Token]) -> CartonResult<Dependency<V>>,
{
    let mut dependencies = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        let parse_err = |message: String| CartonError::Parse {
            line: line_no,
            text: line.to_string(),
            message,
        };

        let tokens = tokenize(line).map_err(parse_err)?;
        let (kind, ident, rest) = match tokens.as_slice() {
            [] => continue,
            [Token::Bare(kind), Token::Quoted(ident), rest @ ..] => (kind, ident, rest),
            [Token::Bare(kind), ..] if !matches!(kind.as_str(), "github" | "git" | "binary") => {
                return Err(parse_err(format!("unknown dependency kind `{kind}`")));
            }
            _ => return Err(parse_err("expected `<kind> \"<identifier>\"`".to_string())),
        };

        let project = ProjectIdentifier::parse(kind, ident).map_err(parse_err)?;
        dependencies.push(entry(line_no, line, project, rest)?);
    }

    Ok(dependencies)
}

/// Split a line into bare words and double-quoted strings, dropping any
/// `#` comment outside quotes.
fn tokenize(line: &str) -> Result<Vec<Token>, String> {
    let mut tokens = Vec::new();
    let mut chars = line.chars().peekable();

    while let Some(&c) = chars.peek() {
        if c.is_whitespace() {
            chars.next();
        } else if c == '#' {
            break;
        } else if c == '"' {
            chars.next();
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('"') => break,
                    Some(ch) => value.push(ch),
                    None => return Err("unterminated quoted string".to_string()),
                }
            }
            tokens.push(Token::Quoted(value));
        } else {
            let mut word = String::new();
            while let Some(&ch) = chars.peek() {
                if ch.is_whitespace() || ch == '"' || ch == '#' {
                    break;
                }
                word.push(ch);
                chars.next();
            }
            tokens.push(Token::Bare(word));
        }
    }

    Ok(tokens)
}

/// Interpret the tokens after the identifier of a declared dependency.
fn parse_declared_version(rest: &[Token]) -> Result<VersionSpecifier, String> {
    match rest {
        [] => Ok(VersionSpecifier::Any),
        [Token::Quoted(s)] if version::has_operator(s.trim()) => version::parse_operator(s.trim()),
        [Token::Quoted(s)] if s.is_empty() => Err("empty git reference".to_string()),
        [Token::Quoted(s)] => Ok(VersionSpecifier::GitReference(s.clone())),
        words if words.iter().all(|t| matches!(t, Token::Bare(_))) => {
            let joined = words
                .iter()
                .filter_map(|t| match t {
                    Token::Bare(w) => Some(w.as_str()),
                    Token::Quoted(_) => None,
                })
                .collect::<Vec<_>>()
                .join(" ");
            if version::has_operator(&joined) {
                version::parse_operator(&joined)
            } else {
                Err(format!("invalid version specifier `{joined}`"))
            }
        }
        _ => Err("unexpected tokens after identifier".to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokenize_mixes_bare_and_quoted() {
        let tokens = tokenize(r#"github "A/A" >= 1.0 # trailing"#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::Bare("github".into()),
                Token::Quoted("A/A".into()),
                Token::Bare(">=".into()),
                Token::Bare("1.0".into()),
            ]
        );
    }

    #[test]
    fn hash_inside_quotes_is_not_a_comment() {
        let tokens = tokenize(r##"git "file:///tmp/a#b" "main""##).unwrap();
        assert_eq!(tokens[1], Token::Quoted("file:///tmp/a#b".into()));
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn unterminated_quote_fails() {
        assert!(tokenize(r#"github "A/A"#).is_err());
    }

    #[test]
    fn operator_without_space() {
        let rest = tokenize(">=2.3.1").unwrap();
        assert!(matches!(
            parse_declared_version(&rest),
            Ok(VersionSpecifier::AtLeast(_))
        ));
    }
}
