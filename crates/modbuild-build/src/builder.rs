//! Build orchestration for a single module
use crate::assemble::{assemble, AssembledArtifact};
use crate::error::BuildResult;
use crate::patch::{patch_manifest, PatchSummary};
use crate::staleness::should_build;

use modbuild_config::{BuildTarget, ConfigLoader, ModuleInfo, PartialBuildRequest};
use semver::Version;
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info};

/// How a build invocation ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildOutcome {
    /// Output directory removed, nothing built (`Clean`)
    Cleaned,
    /// Sources not newer than the output, nothing written (`Build`)
    UpToDate,
    /// Script assembled and manifest patched
    Built,
}

impl std::fmt::Display for BuildOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cleaned => write!(f, "cleaned"),
            Self::UpToDate => write!(f, "up to date"),
            Self::Built => write!(f, "built"),
        }
    }
}

/// Result of a build invocation
#[derive(Debug, Clone, Serialize)]
pub struct BuildReport {
    /// Resolved module information
    pub module: ModuleInfo,
    pub outcome: BuildOutcome,
    /// Written script, when the module was built
    pub artifact: Option<AssembledArtifact>,
    /// Manifest changes, when the module was built
    pub patch: Option<PatchSummary>,
    /// Wall-clock time of the invocation
    #[serde(skip)]
    pub elapsed: Duration,
}

/// Main builder for a module
pub struct Builder {
    /// Module source directory (or manifest)
    source_path: PathBuf,
    /// Highest-priority configuration layer
    overrides: PartialBuildRequest,
    /// Resolves defaults and `build.toml`
    loader: ConfigLoader,
}

impl Builder {
    /// Create a new builder for the module at the given path
    pub fn new(source_path: impl AsRef<Path>) -> Self {
        Self {
            source_path: source_path.as_ref().to_path_buf(),
            overrides: PartialBuildRequest::default(),
            loader: ConfigLoader::new(),
        }
    }

    /// Replace the caller override layer
    pub fn with_overrides(mut self, overrides: PartialBuildRequest) -> Self {
        self.overrides = overrides;
        self
    }

    /// Use a loader with custom defaults
    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    /// Set the build target
    pub fn with_target(mut self, target: BuildTarget) -> Self {
        self.overrides.target = Some(target);
        self
    }

    /// Set the output directory
    pub fn with_output_directory(mut self, output: impl Into<PathBuf>) -> Self {
        self.overrides.output_directory = Some(output.into());
        self
    }

    /// Set the version written into the output manifest
    pub fn with_version(mut self, version: Version) -> Self {
        self.overrides.version = Some(version);
        self
    }

    /// Resolve configuration without touching the filesystem
    pub fn resolve(&self) -> BuildResult<ModuleInfo> {
        Ok(self.loader.resolve(&self.source_path, &self.overrides)?)
    }

    /// Execute the build
    pub fn build(&self) -> BuildResult<BuildReport> {
        let start = Instant::now();
        let module = self.resolve()?;
        let request = &module.request;

        debug!(
            module = %module.name,
            target = %request.target,
            output = %request.output_directory.display(),
            "starting build"
        );

        if !should_build(request.target, &module.module_base, &request.output_directory)? {
            let outcome = match request.target {
                BuildTarget::Clean => BuildOutcome::Cleaned,
                _ => BuildOutcome::UpToDate,
            };
            info!(module = %module.name, %outcome, "skipping assembly");

            return Ok(BuildReport {
                module,
                outcome,
                artifact: None,
                patch: None,
                elapsed: start.elapsed(),
            });
        }

        let artifact = assemble(&module)?;
        let patch = patch_manifest(
            &module.output_manifest_path(),
            &module.module_base,
            &request.public_filter,
            request.version.as_ref(),
        )?;

        let elapsed = start.elapsed();
        info!(
            module = %module.name,
            elapsed_ms = elapsed.as_millis() as u64,
            "build completed"
        );

        Ok(BuildReport {
            module,
            outcome: BuildOutcome::Built,
            artifact: Some(artifact),
            patch: Some(patch),
            elapsed,
        })
    }
}

/// Build the module at `source_path` with the given overrides
pub fn build_module(
    source_path: impl AsRef<Path>,
    overrides: PartialBuildRequest,
) -> BuildResult<BuildReport> {
    Builder::new(source_path).with_overrides(overrides).build()
}
