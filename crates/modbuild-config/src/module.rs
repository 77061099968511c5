//! Resolved module information for one build invocation

use crate::layout::SCRIPT_EXTENSION;
use crate::manifest::ModuleManifest;
use crate::request::BuildRequest;
use serde::Serialize;
use std::path::PathBuf;

/// Everything known about a module once configuration is resolved.
///
/// Built fresh by [`crate::ConfigLoader::resolve`] for every build; nothing
/// here outlives the invocation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModuleInfo {
    /// Module name
    pub name: String,
    /// Absolute module base directory
    pub module_base: PathBuf,
    /// Source manifest path
    pub manifest_path: PathBuf,
    /// Manifest as loaded from the module base
    pub manifest: ModuleManifest,
    /// Resolved build settings
    pub request: BuildRequest,
}

impl ModuleInfo {
    /// Path of the assembled script in the output directory
    pub fn artifact_path(&self) -> PathBuf {
        self.request
            .output_directory
            .join(format!("{}.{}", self.name, SCRIPT_EXTENSION))
    }

    /// Path of the copied manifest in the output directory
    pub fn output_manifest_path(&self) -> PathBuf {
        match self.manifest_path.file_name() {
            Some(file_name) => self.request.output_directory.join(file_name),
            None => self.request.output_directory.clone(),
        }
    }
}
