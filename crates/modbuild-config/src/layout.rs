//! File naming conventions shared by every stage of the pipeline

/// Extension of the module manifest (`<ModuleName>.toml`)
pub const MANIFEST_EXTENSION: &str = "toml";

/// Sidecar build configuration, co-located with the manifest
pub const BUILD_CONFIG_FILE: &str = "build.toml";

/// Extension of source fragments gathered from the source directories
pub const FRAGMENT_EXTENSION: &str = "ps1";

/// Extension of the assembled module script (`<ModuleName>.psm1`)
pub const SCRIPT_EXTENSION: &str = "psm1";

/// Files with these extensions directly inside the module base are copied
/// to the output unchanged (manifest, root script, type/format metadata).
pub const PASSTHROUGH_EXTENSIONS: &[&str] = &["toml", "psm1", "ps1xml"];

/// Generic container folder names that never become a module name
pub const CONTAINER_NAMES: &[&str] = &["source", "src"];

/// Folder created beside the module base when no output directory is given
pub const DEFAULT_OUTPUT_ROOT: &str = "Output";

/// Check whether a file name carries the given extension (case-insensitive)
pub fn has_extension(path: &std::path::Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
