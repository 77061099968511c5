//! modbuild build pipeline
//!
//! Turns a resolved [`ModuleInfo`] into a built module:
//! - Staleness detection and output cleaning (Clean / Build / CleanBuild)
//! - Pass-through file and directory copies
//! - Ordered source fragment discovery
//! - Concatenation with traceable region markers, written in the requested encoding
//! - Targeted manifest patching (exported functions, version)

pub mod assemble;
pub mod builder;
pub mod encoding;
pub mod error;
pub mod fragments;
pub mod patch;
pub mod staleness;

// Re-export main types
pub use assemble::{assemble, AssembledArtifact};
pub use builder::{build_module, BuildOutcome, BuildReport, Builder};
pub use encoding::encode;
pub use error::{BuildError, BuildResult};
pub use fragments::{discover_fragments, SourceFragment};
pub use patch::{patch_manifest, PatchSummary};
pub use staleness::{newest_modification, should_build};

// Re-export modbuild-config types for convenience
pub use modbuild_config::{BuildTarget, Encoding, ModuleInfo, PartialBuildRequest};
