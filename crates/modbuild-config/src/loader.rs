//! Configuration Loader
//!
//! Turns a source path plus caller overrides into a [`ModuleInfo`]:
//! 1. Built-in defaults - lowest priority
//! 2. `build.toml` beside the manifest - overrides defaults
//! 3. Caller overrides - highest priority
//!
//! All relative paths are anchored explicitly; the process working directory
//! is only consulted when canonicalizing the caller's source path.

use crate::layout::{BUILD_CONFIG_FILE, DEFAULT_OUTPUT_ROOT};
use crate::manifest::ModuleManifest;
use crate::module::ModuleInfo;
use crate::request::{BlockSource, BuildRequest, PartialBuildRequest};
use crate::resolve::{resolve_manifest, ManifestLocation};
use crate::{ConfigError, ConfigResult};
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};

/// Configuration loader
pub struct ConfigLoader {
    /// Lowest configuration layer
    defaults: PartialBuildRequest,
}

impl ConfigLoader {
    /// Create a loader using the built-in defaults
    pub fn new() -> Self {
        Self {
            defaults: PartialBuildRequest::defaults(),
        }
    }

    /// Create a loader with custom defaults
    pub fn with_defaults(defaults: PartialBuildRequest) -> Self {
        Self { defaults }
    }

    /// Resolve the module at `path` into an authoritative [`ModuleInfo`]
    pub fn resolve(
        &self,
        path: &Path,
        overrides: &PartialBuildRequest,
    ) -> ConfigResult<ModuleInfo> {
        let mut location = resolve_manifest(path)?;

        let file_layer = Self::load_build_config(&location.module_base)?;
        let merged = PartialBuildRequest::layered([&self.defaults, &file_layer, overrides]);

        // build.toml or the caller may point somewhere else entirely
        if let Some(source_path) = &merged.source_path {
            let anchored = location.module_base.join(source_path);
            let relocated = resolve_manifest(&anchored)?;
            if relocated.module_base != location.module_base {
                debug!(
                    from = %location.module_base.display(),
                    to = %relocated.module_base.display(),
                    "source path relocated module"
                );
                location = relocated;
            }
        }

        let request = self.finish_request(&location, merged)?;
        let manifest = Self::load_manifest(&location, &request)?;

        let ManifestLocation {
            name,
            module_base,
            manifest_path,
        } = location;

        Ok(ModuleInfo {
            name,
            module_base,
            manifest_path,
            manifest,
            request,
        })
    }

    /// Load the sidecar build configuration, if there is one
    fn load_build_config(module_base: &Path) -> ConfigResult<PartialBuildRequest> {
        let path = module_base.join(BUILD_CONFIG_FILE);

        if !path.is_file() {
            debug!(path = %path.display(), "no build configuration file");
            return Ok(PartialBuildRequest::default());
        }

        debug!(path = %path.display(), "loading build configuration");
        PartialBuildRequest::load_from_file(&path)
    }

    /// Load the manifest and enforce the diagnostic allow-list
    fn load_manifest(
        location: &ManifestLocation,
        request: &BuildRequest,
    ) -> ConfigResult<ModuleManifest> {
        let manifest = ModuleManifest::load_from_file(&location.manifest_path)?;

        for diagnostic in manifest.diagnostics(&location.module_base) {
            if request.is_suppressed(diagnostic.code) {
                warn!(
                    module = %location.name,
                    manifest = %location.manifest_path.display(),
                    "{}",
                    diagnostic
                );
                continue;
            }

            return Err(ConfigError::ManifestLoad {
                file: location.manifest_path.clone(),
                reason: diagnostic.to_string(),
            });
        }

        Ok(manifest)
    }

    /// Fill every field from the merged layers and anchor all paths
    fn finish_request(
        &self,
        location: &ManifestLocation,
        merged: PartialBuildRequest,
    ) -> ConfigResult<BuildRequest> {
        let base = &location.module_base;

        let output_directory =
            resolve_output_directory(base, &location.name, merged.output_directory.as_deref());
        // Symlinked ancestors only show up once the path exists
        let existing =
            dunce::canonicalize(&output_directory).unwrap_or_else(|_| output_directory.clone());
        if base.starts_with(&output_directory) || base.starts_with(&existing) {
            return Err(ConfigError::invalid_value(
                "output_directory",
                format!(
                    "'{}' would contain the module sources and be wiped when cleaning",
                    output_directory.display()
                ),
            ));
        }

        let copy_directories = merged
            .copy_directories
            .unwrap_or_default()
            .iter()
            .map(|dir| base.join(dir))
            .collect();

        let source_directories = merged.source_directories.unwrap_or_default();
        if let Some(bad) = source_directories.iter().find(|d| Path::new(d).is_absolute()) {
            return Err(ConfigError::invalid_value(
                "source_directories",
                format!("'{}' must be relative to the module base", bad),
            ));
        }

        Ok(BuildRequest {
            source_path: base.clone(),
            output_directory,
            version: merged.version,
            copy_directories,
            source_directories,
            public_filter: relative_filter(base, merged.public_filter.unwrap_or_default())?,
            encoding: merged.encoding.unwrap_or_default(),
            prefix: merged
                .prefix
                .as_deref()
                .and_then(|value| BlockSource::resolve(value, base)),
            postfix: merged
                .postfix
                .as_deref()
                .and_then(|value| BlockSource::resolve(value, base)),
            target: merged.target.unwrap_or_default(),
            passthru: merged.passthru.unwrap_or(false),
            suppressed_diagnostics: merged.suppressed_diagnostics.unwrap_or_default(),
        })
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Output directory rules:
/// - unset: `<parent>/Output/<name>`
/// - relative: anchored at `<parent>`
/// - absolute: unchanged
///
/// where `<parent>` is the module base's parent directory. The result is
/// lexically normalized, so `.` and `..` never reach the clean step.
pub fn resolve_output_directory(
    module_base: &Path,
    module_name: &str,
    configured: Option<&Path>,
) -> PathBuf {
    let parent = module_base.parent().unwrap_or(module_base);

    let joined = match configured {
        None => parent.join(DEFAULT_OUTPUT_ROOT).join(module_name),
        Some(dir) if dir.as_os_str().is_empty() => {
            parent.join(DEFAULT_OUTPUT_ROOT).join(module_name)
        }
        Some(dir) => parent.join(dir),
    };

    normalize_path(&joined)
}

/// Drop `.` components and fold `..` into its parent without touching the
/// filesystem. `..` above the root stays at the root.
fn normalize_path(path: &Path) -> PathBuf {
    let mut normalized = PathBuf::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }

    normalized
}

/// Public filters are matched against module-relative paths; an absolute
/// filter must point inside the module base and is rewritten relative to it.
fn relative_filter(module_base: &Path, filter: String) -> ConfigResult<String> {
    if !Path::new(&filter).is_absolute() {
        return Ok(filter);
    }

    let normalized = filter.replace('\\', "/");
    let base = module_base.to_string_lossy().replace('\\', "/");

    match normalized
        .strip_prefix(base.trim_end_matches('/'))
        .and_then(|rest| rest.strip_prefix('/'))
    {
        Some(rest) if !rest.is_empty() => Ok(rest.to_string()),
        _ => Err(ConfigError::invalid_value(
            "public_filter",
            format!("'{}' must be relative to the module base", filter),
        )),
    }
}
