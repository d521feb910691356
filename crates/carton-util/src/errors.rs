use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Carton operations.
#[derive(Debug, Error, Diagnostic)]
pub enum CartonError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A manifest file is missing or unreadable.
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Run carton from a directory containing a Cartfile"))]
    Manifest { message: String },

    /// Malformed manifest syntax. `line` is 1-based.
    #[error("Parse error on line {line}: {message}: `{text}`")]
    #[diagnostic(help("Check your Cartfile for syntax errors"))]
    Parse {
        line: usize,
        text: String,
        message: String,
    },

    /// One or more projects declared more than once.
    #[error("Duplicate dependencies: {}", projects.join(", "))]
    #[diagnostic(help("Each project may be declared only once across Cartfile and Cartfile.private"))]
    DuplicateDependencies { projects: Vec<String> },

    /// No available version satisfies the merged constraints of a project.
    #[error("Could not satisfy constraints for {project}: {}", chain.join("; "))]
    Unsatisfiable { project: String, chain: Vec<String> },

    /// The manifest/version source failed (network, VCS, missing project).
    #[error("Failed to fetch {project}: {message}")]
    Collaborator { project: String, message: String },

    /// Invalid global configuration.
    #[error("Config error: {message}")]
    #[diagnostic(help("Check ~/.carton/config.toml"))]
    Config { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

/// Convenience alias for results carrying a [`CartonError`].
pub type CartonResult<T> = Result<T, CartonError>;
