//! Project identifiers: where a dependency's source lives.
//!
//! A project is either a repository on GitHub (public or enterprise), a raw
//! git URL, or a binary-only framework specification URL. Identifiers are the
//! unique key of a dependency within a manifest, so equality and hashing are
//! structural over normalized fields rather than over the text as written.

use std::fmt;
use std::hash::{Hash, Hasher};

use url::Url;

/// Base URL of the public GitHub server.
pub const GITHUB_URL: &str = "https://github.com";

/// A GitHub-compatible server hosting repositories.
#[derive(Debug, Clone)]
pub enum Server {
    /// The public `github.com` server.
    GitHub,
    /// A GitHub Enterprise installation rooted at `url`.
    Enterprise { url: String },
}

impl Server {
    /// Base URL repositories on this server live under.
    pub fn url(&self) -> &str {
        match self {
            Server::GitHub => GITHUB_URL,
            Server::Enterprise { url } => url,
        }
    }

    fn normalized(&self) -> Option<String> {
        match self {
            Server::GitHub => None,
            Server::Enterprise { url } => Some(normalize_url(url)),
        }
    }
}

impl PartialEq for Server {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Server {}

impl Hash for Server {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

/// An `owner/name` repository on a GitHub-compatible server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Repository {
    pub server: Server,
    pub owner: String,
    pub name: String,
}

impl Repository {
    /// A repository on the public GitHub server.
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self::with_server(Server::GitHub, owner, name)
    }

    pub fn with_server(server: Server, owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            server,
            owner: owner.into(),
            name: name.into(),
        }
    }

    /// Parse the identifier token of a `github` line.
    ///
    /// Accepts `owner/name` or a full URL ending in `/owner/name`. URLs on
    /// `github.com` map to the public server; any other host becomes an
    /// enterprise server rooted at everything before `/owner/name`.
    pub fn from_identifier(token: &str) -> Result<Self, String> {
        if token.contains("://") {
            return Self::from_url(token);
        }

        let mut parts = token.split('/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(owner), Some(name), None) if is_path_component(owner) && is_path_component(name) => {
                Ok(Self::new(owner, name))
            }
            _ => Err(format!(
                "invalid GitHub repository identifier `{token}`, expected `owner/name`"
            )),
        }
    }

    fn from_url(token: &str) -> Result<Self, String> {
        let url = Url::parse(token).map_err(|e| format!("invalid URL `{token}`: {e}"))?;
        let host = url
            .host_str()
            .ok_or_else(|| format!("URL `{token}` has no host"))?;
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        if segments.len() < 2 {
            return Err(format!(
                "URL `{token}` does not point at a repository (expected `.../owner/name`)"
            ));
        }

        let split = segments.len() - 2;
        let owner = segments[split];
        let name = segments[split + 1]
            .strip_suffix(".git")
            .unwrap_or(segments[split + 1]);

        let is_public = split == 0
            && (host.eq_ignore_ascii_case("github.com") || host.eq_ignore_ascii_case("www.github.com"));
        if is_public {
            return Ok(Self::new(owner, name));
        }

        let mut base = format!("{}://{}", url.scheme(), host);
        if let Some(port) = url.port() {
            base.push_str(&format!(":{port}"));
        }
        for seg in &segments[..split] {
            base.push('/');
            base.push_str(seg);
        }
        Ok(Self::with_server(Server::Enterprise { url: base }, owner, name))
    }

    /// URL to clone this repository from.
    pub fn clone_url(&self) -> String {
        format!("{}/{}/{}.git", self.server.url(), self.owner, self.name)
    }
}

impl fmt::Display for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.server {
            Server::GitHub => write!(f, "{}/{}", self.owner, self.name),
            Server::Enterprise { url } => write!(f, "{}/{}/{}", url, self.owner, self.name),
        }
    }
}

/// A git URL as written in a manifest.
///
/// Two URLs are equal when they differ only in scheme case, a trailing `/`,
/// or a trailing `.git`.
#[derive(Debug, Clone)]
pub struct GitUrl(String);

impl GitUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self(url.into())
    }

    /// Validate and wrap the identifier token of a `git` line.
    ///
    /// Scheme URLs must parse; scp-style (`git@host:path`) and local paths
    /// are accepted as long as they contain no whitespace. A leading `-`
    /// would be read by git as an option and is rejected.
    pub fn parse(token: &str) -> Result<Self, String> {
        if token.is_empty() || token.chars().any(char::is_whitespace) {
            return Err(format!("invalid git URL `{token}`"));
        }
        if token.starts_with('-') {
            return Err(format!("git URL `{token}` must not start with `-`"));
        }
        if token.contains("://") {
            Url::parse(token).map_err(|e| format!("invalid git URL `{token}`: {e}"))?;
        }
        Ok(Self::new(token))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn normalized(&self) -> String {
        normalize_url(&self.0)
    }

    /// Last path component without `.git`, e.g. `Mantle` for `.../Mantle.git`.
    pub fn name(&self) -> &str {
        let trimmed = self.0.trim_end_matches('/');
        let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
        trimmed
            .rsplit(['/', ':'])
            .next()
            .unwrap_or(trimmed)
    }
}

impl PartialEq for GitUrl {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for GitUrl {}

impl Hash for GitUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.normalized().hash(state);
    }
}

impl fmt::Display for GitUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The source location of a dependency.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ProjectIdentifier {
    GitHub(Repository),
    Git(GitUrl),
    /// A binary-only framework, described by a specification file at `url`.
    Binary(GitUrl),
}

impl ProjectIdentifier {
    /// Parse an identifier token for the given manifest line kind.
    pub fn parse(kind: &str, token: &str) -> Result<Self, String> {
        match kind {
            "github" => Repository::from_identifier(token).map(Self::GitHub),
            "git" => GitUrl::parse(token).map(Self::Git),
            "binary" => {
                let url = Url::parse(token).map_err(|e| format!("invalid binary URL `{token}`: {e}"))?;
                match url.scheme() {
                    "https" | "file" => Ok(Self::Binary(GitUrl::new(token))),
                    other => Err(format!(
                        "binary URL `{token}` must use https or file, not {other}"
                    )),
                }
            }
            other => Err(format!("unknown dependency kind `{other}`")),
        }
    }

    /// The manifest keyword introducing this kind of project.
    pub fn kind(&self) -> &'static str {
        match self {
            ProjectIdentifier::GitHub(_) => "github",
            ProjectIdentifier::Git(_) => "git",
            ProjectIdentifier::Binary(_) => "binary",
        }
    }

    /// Short project name, used for cache directories and tree output.
    pub fn name(&self) -> &str {
        match self {
            ProjectIdentifier::GitHub(repo) => &repo.name,
            ProjectIdentifier::Git(url) | ProjectIdentifier::Binary(url) => url.name(),
        }
    }
}

impl fmt::Display for ProjectIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProjectIdentifier::GitHub(repo) => repo.fmt(f),
            ProjectIdentifier::Git(url) | ProjectIdentifier::Binary(url) => url.fmt(f),
        }
    }
}

fn is_path_component(s: &str) -> bool {
    !s.is_empty() && !s.chars().any(|c| c.is_whitespace() || c == ':')
}

/// Lowercase the scheme and strip a trailing `/` and `.git`.
fn normalize_url(url: &str) -> String {
    let trimmed = url.trim_end_matches('/');
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);
    match trimmed.split_once("://") {
        Some((scheme, rest)) => format!("{}://{}", scheme.to_ascii_lowercase(), rest),
        None => trimmed.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn short_form_is_public_github() {
        let repo = Repository::from_identifier("ReactiveCocoa/ReactiveCocoa").unwrap();
        assert_eq!(repo, Repository::new("ReactiveCocoa", "ReactiveCocoa"));
        assert_eq!(repo.to_string(), "ReactiveCocoa/ReactiveCocoa");
    }

    #[test]
    fn github_url_maps_to_public_server() {
        let repo = Repository::from_identifier("https://github.com/Mantle/Mantle.git").unwrap();
        assert_eq!(repo, Repository::new("Mantle", "Mantle"));
    }

    #[test]
    fn enterprise_url_keeps_base_path() {
        let repo =
            Repository::from_identifier("https://enterprise.local/ghe/desktop/git-error-translations")
                .unwrap();
        assert_eq!(repo.owner, "desktop");
        assert_eq!(repo.name, "git-error-translations");
        assert_eq!(repo.server.url(), "https://enterprise.local/ghe");
        assert_eq!(
            repo.to_string(),
            "https://enterprise.local/ghe/desktop/git-error-translations"
        );
    }

    #[test]
    fn rejects_malformed_short_forms() {
        assert!(Repository::from_identifier("ReactiveCocoa").is_err());
        assert!(Repository::from_identifier("a/b/c").is_err());
        assert!(Repository::from_identifier("/b").is_err());
        assert!(Repository::from_identifier("https://github.com/onlyowner").is_err());
    }

    #[test]
    fn owner_and_name_are_case_sensitive() {
        assert_ne!(Repository::new("mantle", "Mantle"), Repository::new("Mantle", "Mantle"));
    }

    #[test]
    fn git_urls_normalize_suffix_and_scheme_case() {
        let a = GitUrl::new("https://example.com/Mantle/Mantle.git");
        let b = GitUrl::new("HTTPS://example.com/Mantle/Mantle/");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(ProjectIdentifier::Git(a));
        assert!(set.contains(&ProjectIdentifier::Git(b)));
    }

    #[test]
    fn git_and_github_never_equal() {
        let gh = ProjectIdentifier::GitHub(Repository::new("Mantle", "Mantle"));
        let git = ProjectIdentifier::Git(GitUrl::new("https://github.com/Mantle/Mantle.git"));
        assert_ne!(gh, git);
    }

    #[test]
    fn git_url_name() {
        assert_eq!(GitUrl::new("https://example.com/a/Mantle.git").name(), "Mantle");
        assert_eq!(GitUrl::new("git@example.com:a/Mantle.git").name(), "Mantle");
        assert_eq!(GitUrl::new("/local/path/Thing").name(), "Thing");
    }

    #[test]
    fn git_urls_cannot_look_like_options() {
        let err = GitUrl::parse("--upload-pack=evil").unwrap_err();
        assert!(err.contains("must not start with `-`"));
        assert!(ProjectIdentifier::parse("git", "-oProxyCommand=x").is_err());
        assert!(GitUrl::parse("./-local").is_ok());
    }

    #[test]
    fn binary_requires_https_or_file() {
        assert!(ProjectIdentifier::parse("binary", "https://example.com/Fw.json").is_ok());
        assert!(ProjectIdentifier::parse("binary", "http://example.com/Fw.json").is_err());
    }

    #[test]
    fn unknown_kind_is_rejected() {
        let err = ProjectIdentifier::parse("svn", "a/b").unwrap_err();
        assert!(err.contains("unknown dependency kind"));
    }

    #[test]
    fn enterprise_servers_compare_normalized() {
        let a = Server::Enterprise {
            url: "https://enterprise.local/ghe".into(),
        };
        let b = Server::Enterprise {
            url: "HTTPS://enterprise.local/ghe/".into(),
        };
        assert_eq!(a, b);
        assert_ne!(a, Server::GitHub);
    }
}
