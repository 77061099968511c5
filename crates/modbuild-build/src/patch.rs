//! Targeted manifest updates
//!
//! The copied manifest is edited in place with `toml_edit`, so keys the
//! pipeline does not own keep their values, comments and layout.

use crate::error::{BuildError, BuildResult};
use glob::{MatchOptions, Pattern};
use semver::Version;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Component, Path};
use toml_edit::{Array, DocumentMut, Item, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

/// What the patcher wrote
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PatchSummary {
    /// Exported functions written, if the public filter was set
    pub exports: Option<Vec<String>>,
    /// Version written, if one was requested
    pub version: Option<String>,
    /// Pre-release label written alongside the version
    pub prerelease: Option<String>,
}

impl PatchSummary {
    /// Whether the manifest file was rewritten
    pub fn is_empty(&self) -> bool {
        self.exports.is_none() && self.version.is_none()
    }
}

/// Update `exported_functions` and/or `version` in the manifest at
/// `manifest_path`.
///
/// Public fragments are matched against `public_filter` relative to
/// `module_base`. An empty filter leaves exports alone; a filter with no
/// matches writes an empty list. With neither a filter nor a version the
/// file is not touched.
pub fn patch_manifest(
    manifest_path: &Path,
    module_base: &Path,
    public_filter: &str,
    version: Option<&Version>,
) -> BuildResult<PatchSummary> {
    let mut summary = PatchSummary::default();

    if !public_filter.is_empty() {
        summary.exports = Some(public_functions(module_base, public_filter)?);
    }
    if let Some(version) = version {
        summary.version = Some(format!("{}.{}.{}", version.major, version.minor, version.patch));
        if !version.pre.is_empty() {
            summary.prerelease = Some(version.pre.as_str().to_string());
        }
    }

    if summary.is_empty() {
        debug!(path = %manifest_path.display(), "nothing to patch");
        return Ok(summary);
    }

    let content =
        fs::read_to_string(manifest_path).map_err(|e| BuildError::io(manifest_path, e))?;
    let mut doc: DocumentMut = content
        .parse()
        .map_err(|e| BuildError::manifest_patch(manifest_path, e))?;

    if let Some(exports) = &summary.exports {
        let array: Array = exports.iter().map(String::as_str).collect();
        set_value(&mut doc, "exported_functions", Value::Array(array));
    }

    if let Some(version) = &summary.version {
        set_value(&mut doc, "version", Value::from(version.as_str()));
        match &summary.prerelease {
            Some(label) => set_value(&mut doc, "prerelease", Value::from(label.as_str())),
            None => {
                doc.remove("prerelease");
            }
        }
    }

    fs::write(manifest_path, doc.to_string()).map_err(|e| BuildError::io(manifest_path, e))?;

    info!(
        path = %manifest_path.display(),
        exports = summary.exports.as_ref().map(Vec::len),
        version = summary.version.as_deref(),
        "patched manifest"
    );

    Ok(summary)
}

/// Replace a top-level value, keeping the old value's surrounding
/// whitespace and trailing comment
fn set_value(doc: &mut DocumentMut, key: &str, mut value: Value) {
    if let Some(existing) = doc.get(key).and_then(Item::as_value) {
        *value.decor_mut() = existing.decor().clone();
    }
    doc[key] = Item::Value(value);
}

/// Function names derived from files matching `filter` under `module_base`.
///
/// `*` also crosses directory separators, so `Public/*.ps1` picks up nested
/// folders. Names are file stems in walk order, first occurrence wins.
pub fn public_functions(module_base: &Path, filter: &str) -> BuildResult<Vec<String>> {
    let normalized = filter.replace('\\', "/");
    let normalized = normalized.strip_prefix("./").unwrap_or(&normalized);
    let pattern = Pattern::new(normalized).map_err(|error| BuildError::Glob {
        filter: filter.to_string(),
        error,
    })?;

    let options = MatchOptions {
        case_sensitive: false,
        require_literal_separator: false,
        require_literal_leading_dot: false,
    };

    let mut seen = HashSet::new();
    let mut names = Vec::new();

    for entry in WalkDir::new(module_base).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let relative = entry
            .path()
            .strip_prefix(module_base)
            .unwrap_or(entry.path())
            .components()
            .filter_map(|c| match c {
                Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        if !pattern.matches_with(&relative, options) {
            continue;
        }

        if let Some(stem) = entry.path().file_stem().and_then(|s| s.to_str()) {
            if seen.insert(stem.to_string()) {
                names.push(stem.to_string());
            }
        }
    }

    Ok(names)
}
