//! Source fragment discovery
//!
//! Fragments are gathered directory by directory, in the configured order,
//! and within each directory recursively with entries sorted by file name.
//! That order is the concatenation order of the built script, so it must
//! not depend on how the filesystem happens to list entries.

use crate::error::BuildResult;
use modbuild_config::layout::{has_extension, FRAGMENT_EXTENSION};
use std::path::{Component, Path, PathBuf};
use tracing::debug;
use walkdir::WalkDir;

/// One source file destined for the assembled script
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SourceFragment {
    /// Path relative to the module base, `/`-separated on every platform
    pub display_path: String,
    /// Absolute path on disk
    pub path: PathBuf,
}

impl SourceFragment {
    /// Create a fragment for `path`. Files outside `module_base` keep their
    /// absolute path as the display path.
    pub fn new(module_base: &Path, path: PathBuf) -> Self {
        let display_path = match path.strip_prefix(module_base) {
            Ok(relative) => relative
                .components()
                .filter_map(|c| match c {
                    Component::Normal(part) => Some(part.to_string_lossy()),
                    _ => None,
                })
                .collect::<Vec<_>>()
                .join("/"),
            Err(_) => path.display().to_string(),
        };

        Self { display_path, path }
    }

    /// Label used in the region markers around this fragment
    pub fn label(&self) -> String {
        if Path::new(&self.display_path).is_absolute() {
            self.display_path.clone()
        } else {
            format!("./{}", self.display_path)
        }
    }
}

/// Lazily enumerate fragments under `module_base`.
///
/// Directories that do not exist are skipped; a module may have no
/// fragments at all.
pub fn discover_fragments<'a>(
    module_base: &'a Path,
    source_directories: &'a [String],
) -> impl Iterator<Item = BuildResult<SourceFragment>> + 'a {
    source_directories
        .iter()
        .map(move |dir| module_base.join(dir))
        .filter(|root| {
            let present = root.is_dir();
            if !present {
                debug!(path = %root.display(), "source directory not found, skipping");
            }
            present
        })
        .flat_map(|root| {
            WalkDir::new(root)
                .follow_links(true)
                .sort_by_file_name()
                .into_iter()
        })
        .filter_map(move |entry| match entry {
            Ok(entry)
                if entry.file_type().is_file()
                    && has_extension(entry.path(), FRAGMENT_EXTENSION) =>
            {
                Some(Ok(SourceFragment::new(module_base, entry.into_path())))
            }
            Ok(_) => None,
            Err(e) => Some(Err(e.into())),
        })
}
