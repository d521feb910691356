use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use carton_util::errors::{CartonError, CartonResult};

use crate::project::GITHUB_URL;

/// Global user configuration loaded from `~/.carton/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GlobalConfig {
    #[serde(default)]
    pub resolve: ResolveConfig,

    #[serde(default)]
    pub git: GitConfig,
}

/// Resolution settings from `[resolve]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolveConfig {
    /// Maximum number of concurrent fetches per resolution round.
    #[serde(default = "default_jobs")]
    pub jobs: usize,
}

impl Default for ResolveConfig {
    fn default() -> Self {
        Self {
            jobs: default_jobs(),
        }
    }
}

fn default_jobs() -> usize {
    8
}

/// Git source settings from `[git]`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitConfig {
    /// Where bare clones of dependency repositories are kept.
    #[serde(default = "default_cache_dir", rename = "cache-dir")]
    pub cache_dir: String,

    /// Base URL used in place of `https://github.com` for public GitHub
    /// repositories, e.g. a mirror.
    #[serde(default = "default_github_url", rename = "github-url")]
    pub github_url: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            github_url: default_github_url(),
        }
    }
}

impl GitConfig {
    /// `cache_dir` with a leading `~` expanded to the home directory.
    pub fn cache_path(&self) -> PathBuf {
        match self.cache_dir.strip_prefix("~/") {
            Some(rest) => home_dir().join(rest),
            None => PathBuf::from(&self.cache_dir),
        }
    }
}

fn default_cache_dir() -> String {
    "~/.carton/repositories".to_string()
}

fn default_github_url() -> String {
    GITHUB_URL.to_string()
}

impl GlobalConfig {
    /// Load the global configuration from `~/.carton/config.toml`, or return defaults if the file doesn't exist.
    pub fn load() -> CartonResult<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load configuration from `path`, or return defaults if the file doesn't exist.
    pub fn load_from(path: &Path) -> CartonResult<Self> {
        if !path.is_file() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path).map_err(|e| CartonError::Config {
            message: format!("Failed to read {}: {e}", path.display()),
        })?;
        let config: Self = toml::from_str(&content).map_err(|e| CartonError::Config {
            message: format!("Failed to parse {}: {e}", path.display()),
        })?;
        if config.resolve.jobs == 0 {
            return Err(CartonError::Config {
                message: "resolve.jobs must be at least 1".to_string(),
            });
        }
        Ok(config)
    }

    /// Returns the default path to the global config file.
    pub fn default_path() -> PathBuf {
        dirs_path().join("config.toml")
    }
}

/// Returns the path to the Carton data directory (`~/.carton/`).
pub fn dirs_path() -> PathBuf {
    home_dir().join(".carton")
}

fn home_dir() -> PathBuf {
    let home = std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .unwrap_or_else(|_| ".".to_string());
    PathBuf::from(home)
}
