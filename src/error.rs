//! Error types.
//!
//! [`ConfigError`] covers everything that can go wrong while resolving
//! credentials; it is always fatal. [`Error`] is the crate-wide error used by
//! the document, corpus, and chat layers. Remote failures are carried through
//! unchanged in [`Error::Api`].

use std::path::PathBuf;

use thiserror::Error;

/// Failure while resolving or persisting a [`ClientConfig`](crate::config::ClientConfig).
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("ambiguous authentication: both `api_key` and OAuth2 client fields are present")]
    AmbiguousAuth,

    #[error("missing authentication: expected `api_key` or both `app_client_id` and `app_client_secret`")]
    MissingAuth,

    #[error("malformed configuration: {0}")]
    Malformed(String),

    #[error("profile [{profile}] not found in [{}]", path.display())]
    ProfileNotFound { profile: String, path: PathBuf },

    #[error("configuration file not found: {}", path.display())]
    FileNotFound { path: PathBuf },

    #[error("unable to determine the home directory")]
    HomeDirUnavailable,

    #[error("environment does not define {0}")]
    EnvMissing(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid YAML in {}: {source}", path.display())]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("{strategy} configuration is invalid: {source}")]
    InvalidSource {
        strategy: &'static str,
        #[source]
        source: Box<ConfigError>,
    },

    #[error("unable to resolve configuration; attempted: {}", .attempts.join("; "))]
    Unresolved { attempts: Vec<String> },
}

impl ConfigError {
    /// True when the source simply is not there (no file, no profile, no
    /// variables), as opposed to being present but invalid.
    pub fn is_absent(&self) -> bool {
        matches!(
            self,
            ConfigError::ProfileNotFound { .. }
                | ConfigError::FileNotFound { .. }
                | ConfigError::HomeDirUnavailable
                | ConfigError::EnvMissing(_)
        )
    }

    /// The innermost error, looking through [`ConfigError::InvalidSource`].
    pub fn root(&self) -> &ConfigError {
        match self {
            ConfigError::InvalidSource { source, .. } => source.root(),
            other => other,
        }
    }
}

/// Crate-wide error.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("already exists: {0}")]
    AlreadyExists(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
