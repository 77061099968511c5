//! Module name derivation and manifest lookup
//!
//! A module base is the directory holding `<ModuleName>.toml` and the source
//! fragment folders. The name comes from the directory itself, unless the
//! directory is a generic container (`src`, `source`), in which case the
//! parent directory names the module.

use crate::layout::{has_extension, CONTAINER_NAMES, MANIFEST_EXTENSION};
use crate::{ConfigError, ConfigResult};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Where a module lives and what it is called
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ManifestLocation {
    /// Module name, as used for the manifest and output file names
    pub name: String,
    /// Absolute module base directory
    pub module_base: PathBuf,
    /// Absolute path of `<module_base>/<name>.toml`
    pub manifest_path: PathBuf,
}

/// Locate the module rooted at `source_path`.
///
/// `source_path` may also point at the manifest file itself, in which case
/// its directory is the module base. Relative paths are resolved against the
/// process working directory once, here; nothing downstream depends on it.
pub fn resolve_manifest(source_path: &Path) -> ConfigResult<ManifestLocation> {
    let module_base = module_base_for(source_path)?;
    let name = derive_module_name(&module_base)
        .ok_or_else(|| ConfigError::InvalidSourcePath(module_base.clone()))?;

    let manifest_path = module_base.join(format!("{}.{}", name, MANIFEST_EXTENSION));
    if !manifest_path.is_file() {
        return Err(ConfigError::ManifestNotFound(manifest_path));
    }

    debug!(module = %name, manifest = %manifest_path.display(), "resolved module manifest");

    Ok(ManifestLocation {
        name,
        module_base,
        manifest_path,
    })
}

/// Canonicalize the input and step from a manifest file to its directory
fn module_base_for(source_path: &Path) -> ConfigResult<PathBuf> {
    let canonical = dunce::canonicalize(source_path)
        .map_err(|_| ConfigError::InvalidSourcePath(source_path.to_path_buf()))?;

    if canonical.is_dir() {
        return Ok(canonical);
    }

    if canonical.is_file() && has_extension(&canonical, MANIFEST_EXTENSION) {
        if let Some(parent) = canonical.parent() {
            return Ok(parent.to_path_buf());
        }
    }

    Err(ConfigError::InvalidSourcePath(source_path.to_path_buf()))
}

/// Derive the module name from an absolute module base.
///
/// Returns `None` only for paths without a usable final segment (filesystem
/// roots).
pub fn derive_module_name(module_base: &Path) -> Option<String> {
    let leaf = segment_name(module_base)?;

    if is_container_name(&leaf) {
        let parent = module_base.parent()?;
        return segment_name(parent);
    }

    Some(leaf)
}

/// Final path segment with a trailing manifest extension removed
fn segment_name(path: &Path) -> Option<String> {
    let leaf = path.file_name()?.to_str()?;
    let suffix = format!(".{}", MANIFEST_EXTENSION);

    let name = if leaf.len() > suffix.len() && leaf.to_ascii_lowercase().ends_with(&suffix) {
        &leaf[..leaf.len() - suffix.len()]
    } else {
        leaf
    };

    Some(name.to_string())
}

fn is_container_name(name: &str) -> bool {
    CONTAINER_NAMES
        .iter()
        .any(|container| container.eq_ignore_ascii_case(name))
}
