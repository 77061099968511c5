//! modbuild configuration system
//!
//! Resolves everything a module build needs before any file is touched:
//! - Module name and manifest location (`<ModuleName>.toml`)
//! - Sidecar build configuration (`build.toml` beside the manifest)
//! - Layered merging of build settings
//! - Manifest loading with cross-reference diagnostics
//!
//! # Configuration Hierarchy
//!
//! Build settings are merged in the following order (later overrides earlier):
//! 1. Built-in defaults
//! 2. Sidecar config (`build.toml`)
//! 3. Caller overrides (CLI flags)
//!
//! # Example
//!
//! ```no_run
//! use modbuild_config::{ConfigLoader, PartialBuildRequest};
//! use std::path::Path;
//!
//! let loader = ConfigLoader::new();
//! let info = loader
//!     .resolve(Path::new("./MyModule/source"), &PartialBuildRequest::default())
//!     .unwrap();
//! println!("building {} into {}", info.name, info.request.output_directory.display());
//! ```

pub mod layout;
pub mod loader;
pub mod manifest;
pub mod module;
pub mod request;
pub mod resolve;

use std::path::PathBuf;
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Source path is not an existing directory: {0}")]
    InvalidSourcePath(PathBuf),

    #[error("Module manifest not found: {0}")]
    ManifestNotFound(PathBuf),

    #[error("Failed to load module manifest {file}: {reason}")]
    ManifestLoad { file: PathBuf, reason: String },

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },

    #[error("Invalid value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },

    #[error("I/O error at {path}: {error}")]
    Io {
        path: PathBuf,
        error: std::io::Error,
    },
}

impl ConfigError {
    /// Create an I/O error with path context
    pub fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            error,
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidValue {
            field: field.into(),
            reason: reason.to_string(),
        }
    }
}

/// Result type for configuration operations
pub type ConfigResult<T> = Result<T, ConfigError>;

// Re-export main types
pub use loader::ConfigLoader;
pub use manifest::{ManifestDiagnostic, ModuleManifest};
pub use module::ModuleInfo;
pub use request::{BlockSource, BuildRequest, BuildTarget, Encoding, PartialBuildRequest};
pub use resolve::{resolve_manifest, ManifestLocation};
