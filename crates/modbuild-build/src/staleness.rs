//! Output cleaning and timestamp-based staleness detection

use crate::error::{BuildError, BuildResult};
use modbuild_config::BuildTarget;
use std::fs;
use std::path::Path;
use std::time::SystemTime;
use tracing::{debug, info};
use walkdir::WalkDir;

/// Decide whether the module must be (re)built, cleaning first when the
/// target asks for it.
///
/// - `Clean` removes the output directory and never builds.
/// - `CleanBuild` removes the output directory and always builds.
/// - `Build` builds only when some source file is strictly newer than the
///   newest file in the output directory (or the output is empty).
pub fn should_build(
    target: BuildTarget,
    source_root: &Path,
    output_root: &Path,
) -> BuildResult<bool> {
    match target {
        BuildTarget::Clean => {
            clean_output(output_root)?;
            Ok(false)
        }
        BuildTarget::CleanBuild => {
            clean_output(output_root)?;
            Ok(true)
        }
        BuildTarget::Build => is_stale(source_root, output_root),
    }
}

/// Recursively delete the output directory. Returns whether anything was
/// removed.
pub fn clean_output(output_root: &Path) -> BuildResult<bool> {
    if !output_root.exists() {
        return Ok(false);
    }

    info!(path = %output_root.display(), "cleaning output directory");
    fs::remove_dir_all(output_root).map_err(|e| BuildError::io(output_root, e))?;
    Ok(true)
}

/// Latest modification time of any file under `root`, skipping the
/// `exclude` subtree. `None` when there are no files (or no `root`).
pub fn newest_modification(
    root: &Path,
    exclude: Option<&Path>,
) -> BuildResult<Option<SystemTime>> {
    if !root.exists() {
        return Ok(None);
    }

    let mut newest: Option<SystemTime> = None;

    let walker = WalkDir::new(root)
        .follow_links(false)
        .into_iter()
        .filter_entry(|entry| exclude.map_or(true, |skip| entry.path() != skip));

    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }

        let modified = entry
            .metadata()?
            .modified()
            .map_err(|e| BuildError::io(entry.path(), e))?;

        if newest.map_or(true, |current| modified > current) {
            newest = Some(modified);
        }
    }

    Ok(newest)
}

fn is_stale(source_root: &Path, output_root: &Path) -> BuildResult<bool> {
    let Some(newest_output) = newest_modification(output_root, None)? else {
        debug!(path = %output_root.display(), "output is empty, building");
        return Ok(true);
    };

    let newest_source = newest_modification(source_root, Some(output_root))?;
    let stale = newest_source.is_some_and(|source| source > newest_output);

    if !stale {
        info!(path = %output_root.display(), "output is up to date");
    }

    Ok(stale)
}
