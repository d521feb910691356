//! A [`ProjectSource`] backed by local bare clones and the `git` CLI.
//!
//! Each project is mirrored once per run into `<cache-dir>/<project>`:
//! cloned with `git clone --bare` the first time, refreshed with
//! `git fetch` afterwards. All git invocations block, so they run on
//! tokio's blocking pool.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use carton_core::cartfile::{Cartfile, CARTFILE};
use carton_core::project::{ProjectIdentifier, Server, GITHUB_URL};
use carton_core::version::PinnedVersion;
use carton_resolver::cache::SingleFlight;
use carton_resolver::source::ProjectSource;
use carton_util::errors::{CartonError, CartonResult};
use carton_util::process::CommandBuilder;

pub struct GitSource {
    cache_dir: PathBuf,
    github_url: String,
    mirrors: SingleFlight<ProjectIdentifier, PathBuf>,
}

impl GitSource {
    pub fn new(cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            cache_dir: cache_dir.into(),
            github_url: GITHUB_URL.to_string(),
            mirrors: SingleFlight::new(),
        }
    }

    /// Clone public GitHub repositories from `url` instead of `github.com`.
    pub fn with_github_url(mut self, url: impl Into<String>) -> Self {
        self.github_url = url.into().trim_end_matches('/').to_string();
        self
    }

    /// The URL `project` is cloned from.
    pub fn remote_url(&self, project: &ProjectIdentifier) -> CartonResult<String> {
        match project {
            ProjectIdentifier::GitHub(repo) => match repo.server {
                Server::GitHub => Ok(format!("{}/{}/{}.git", self.github_url, repo.owner, repo.name)),
                Server::Enterprise { .. } => Ok(repo.clone_url()),
            },
            ProjectIdentifier::Git(url) if url.as_str().starts_with('-') => {
                Err(CartonError::Collaborator {
                    project: project.to_string(),
                    message: "git URLs must not start with `-`".to_string(),
                })
            }
            ProjectIdentifier::Git(url) => Ok(url.as_str().to_string()),
            ProjectIdentifier::Binary(_) => Err(CartonError::Collaborator {
                project: project.to_string(),
                message: "binary projects cannot be fetched with git".to_string(),
            }),
        }
    }

    /// Directory of the bare clone for `project` inside the cache.
    ///
    /// The name is the project kind followed by its identifier, with every
    /// byte outside `[A-Za-z0-9.-]` written as `_xx`, so distinct projects
    /// never share a directory.
    pub fn mirror_path(&self, project: &ProjectIdentifier) -> PathBuf {
        let mut dir = format!("{}-", project.kind());
        for byte in project.to_string().bytes() {
            if byte.is_ascii_alphanumeric() || byte == b'.' || byte == b'-' {
                dir.push(char::from(byte));
            } else {
                dir.push_str(&format!("_{byte:02x}"));
            }
        }
        self.cache_dir.join(dir)
    }

    /// Clone or refresh the mirror of `project`, at most once per source.
    async fn mirror(&self, project: &ProjectIdentifier) -> CartonResult<PathBuf> {
        self.mirrors
            .get_or_fetch(project, || async {
                let url = self.remote_url(project)?;
                let path = self.mirror_path(project);
                let cache_dir = self.cache_dir.clone();
                run_git(project, move || sync_mirror(&cache_dir, &url, &path).map(|()| path)).await
            })
            .await
    }
}

#[async_trait]
impl ProjectSource for GitSource {
    async fn fetch_manifest(
        &self,
        project: &ProjectIdentifier,
        at: &PinnedVersion,
    ) -> CartonResult<Cartfile> {
        let repo = self.mirror(project).await?;
        let rev = at.as_str().to_string();
        let text = run_git(project, move || {
            let output = CommandBuilder::new("git")
                .arg("-C")
                .arg(repo.to_string_lossy())
                .arg("show")
                .arg(format!("{rev}:{CARTFILE}"))
                .exec()?;
            if output.status.success() {
                return Ok(String::from_utf8_lossy(&output.stdout).into_owned());
            }
            let stderr = String::from_utf8_lossy(&output.stderr);
            if is_missing_path(&stderr) {
                tracing::debug!("No {CARTFILE} at {rev}");
                Ok(String::new())
            } else {
                Err(CartonError::Generic {
                    message: stderr.trim().to_string(),
                })
            }
        })
        .await?;

        Cartfile::parse(&text).map_err(|e| CartonError::Collaborator {
            project: project.to_string(),
            message: format!("invalid {CARTFILE} at {at}: {e}"),
        })
    }

    async fn list_versions(&self, project: &ProjectIdentifier) -> CartonResult<Vec<PinnedVersion>> {
        let repo = self.mirror(project).await?;
        let stdout = run_git(project, move || {
            CommandBuilder::new("git")
                .arg("-C")
                .arg(repo.to_string_lossy())
                .args(["tag", "--list"])
                .exec_stdout()
        })
        .await?;

        Ok(parse_tag_list(&stdout))
    }

    async fn resolve_reference(
        &self,
        project: &ProjectIdentifier,
        name: &str,
    ) -> CartonResult<PinnedVersion> {
        if name.starts_with('-') {
            return Err(CartonError::Collaborator {
                project: project.to_string(),
                message: format!("invalid reference name \"{name}\""),
            });
        }
        let repo = self.mirror(project).await?;
        let rev = format!("{name}^{{commit}}");
        let stdout = run_git(project, move || {
            CommandBuilder::new("git")
                .arg("-C")
                .arg(repo.to_string_lossy())
                .args(["rev-parse", "--verify", "--quiet"])
                .arg(rev)
                .exec_stdout()
        })
        .await
        .map_err(|_| CartonError::Collaborator {
            project: project.to_string(),
            message: format!("no branch, tag or commit named \"{name}\""),
        })?;

        Ok(PinnedVersion::new(stdout.trim()))
    }
}

/// Run a blocking git step off the async runtime, reporting failures as
/// collaborator errors for `project`.
async fn run_git<T, F>(project: &ProjectIdentifier, step: F) -> CartonResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> CartonResult<T> + Send + 'static,
{
    let collaborator = |message: String| CartonError::Collaborator {
        project: project.to_string(),
        message,
    };
    match tokio::task::spawn_blocking(step).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(CartonError::Generic { message })) => Err(collaborator(message)),
        Ok(Err(e)) => Err(collaborator(e.to_string())),
        Err(e) => Err(collaborator(format!("git task failed: {e}"))),
    }
}

fn sync_mirror(cache_dir: &Path, url: &str, path: &Path) -> CartonResult<()> {
    if path.is_dir() {
        tracing::debug!("Fetching {url}");
        CommandBuilder::new("git")
            .arg("-C")
            .arg(path.to_string_lossy())
            .args(["fetch", "--quiet", "--force", "--tags", "--prune", "origin"])
            .arg("+refs/heads/*:refs/heads/*")
            .exec_stdout()?;
    } else {
        carton_util::fs::ensure_dir(cache_dir)?;
        tracing::info!("Cloning {url}");
        CommandBuilder::new("git")
            .args(["clone", "--bare", "--quiet", "--"])
            .arg(url)
            .arg(path.to_string_lossy())
            .exec_stdout()?;
    }
    Ok(())
}

/// Whether `git show` failed only because the manifest is absent at that revision.
fn is_missing_path(stderr: &str) -> bool {
    stderr.contains("does not exist in") || stderr.contains("exists on disk, but not in")
}

fn parse_tag_list(stdout: &str) -> Vec<PinnedVersion> {
    stdout
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(PinnedVersion::new)
        .collect()
}
