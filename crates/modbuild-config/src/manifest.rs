//! Module manifest (`<ModuleName>.toml`)
//!
//! Only the fields the build pipeline reads are modelled here; any other
//! keys are accepted and ignored. Loading distinguishes hard failures (I/O,
//! TOML syntax, wrong field types) from diagnostics about cross-references
//! that the caller may choose to suppress.

use crate::{ConfigError, ConfigResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// Manifest fields consumed by the build pipeline
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Declared module name (informational)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Script loaded when the module is imported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_module: Option<String>,

    /// Module version (`X.Y`, `X.Y.Z` or `X.Y.Z.W`)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Pre-release label accompanying `version`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prerelease: Option<String>,

    /// Functions exported by the module
    #[serde(default)]
    pub exported_functions: Vec<String>,

    /// Additional scripts or modules loaded alongside the root module
    #[serde(default)]
    pub nested_modules: Vec<String>,
}

/// Non-fatal finding produced while loading a manifest
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestDiagnostic {
    /// Stable identifier, matched against the suppression allow-list
    pub code: &'static str,
    pub message: String,
}

impl fmt::Display for ManifestDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl ModuleManifest {
    /// Parse a manifest file. Syntax and type errors are fatal.
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ConfigError::ManifestNotFound(path.to_path_buf())
            } else {
                ConfigError::io(path, e)
            }
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ManifestLoad {
            file: path.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Check cross-references against the module base directory
    pub fn diagnostics(&self, module_base: &Path) -> Vec<ManifestDiagnostic> {
        let mut diagnostics = Vec::new();

        if let Some(root) = self.root_module.as_deref().filter(|r| !r.is_empty()) {
            if !module_base.join(root).exists() {
                diagnostics.push(ManifestDiagnostic {
                    code: "invalid-root-module",
                    message: format!("root module '{}' does not exist", root),
                });
            }
        }

        for nested in &self.nested_modules {
            if !module_base.join(nested).exists() {
                diagnostics.push(ManifestDiagnostic {
                    code: "invalid-nested-module",
                    message: format!("nested module '{}' does not exist", nested),
                });
            }
        }

        if let Some(version) = &self.version {
            if !is_valid_version(version) {
                diagnostics.push(ManifestDiagnostic {
                    code: "invalid-version",
                    message: format!("'{}' is not a valid module version", version),
                });
            }
        }

        diagnostics
    }
}

/// Module versions are two to four dot-separated numbers, optionally
/// followed by a `-prerelease` or `+build` suffix.
fn is_valid_version(version: &str) -> bool {
    let main_version = version.split(['-', '+']).next().unwrap_or("");

    let parts: Vec<&str> = main_version.split('.').collect();
    if parts.len() < 2 || parts.len() > 4 {
        return false;
    }

    parts
        .iter()
        .all(|part| !part.is_empty() && part.chars().all(|c| c.is_ascii_digit()))
}
