/// Build pipeline error types
use modbuild_config::ConfigError;
use std::path::PathBuf;
use thiserror::Error;

pub type BuildResult<T> = Result<T, BuildError>;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid public filter '{filter}': {error}")]
    Glob {
        filter: String,
        error: glob::PatternError,
    },

    #[error("Failed to patch manifest {path}: {reason}")]
    ManifestPatch { path: PathBuf, reason: String },
}

impl BuildError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create a manifest patch error
    pub fn manifest_patch(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::ManifestPatch {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

impl From<walkdir::Error> for BuildError {
    fn from(error: walkdir::Error) -> Self {
        let path = error.path().map(|p| p.to_path_buf()).unwrap_or_default();
        let io = error
            .into_io_error()
            .unwrap_or_else(|| std::io::Error::other("filesystem loop detected"));
        Self::Io { path, error: io }
    }
}
