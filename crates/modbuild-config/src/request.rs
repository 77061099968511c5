//! Build request: the settings that drive a single module build
//!
//! Each configuration layer (defaults, `build.toml`, caller overrides) is a
//! sparse [`PartialBuildRequest`]. Layers merge field by field, later layers
//! winning, and the result is resolved against the module base into a
//! [`BuildRequest`] whose paths are all absolute.

use crate::{ConfigError, ConfigResult};
use semver::Version;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Text encoding of the assembled module script
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Encoding {
    /// UTF-8 without byte order mark
    #[default]
    Utf8,
    /// UTF-7 (RFC 2152)
    Utf7,
    /// 7-bit ASCII, other characters replaced by `?`
    Ascii,
    /// UTF-16 little endian with byte order mark
    Unicode,
    /// UTF-32 little endian with byte order mark
    Utf32,
}

impl Encoding {
    /// All accepted encodings, in display order
    pub const ALL: [Encoding; 5] = [
        Encoding::Utf8,
        Encoding::Utf7,
        Encoding::Ascii,
        Encoding::Unicode,
        Encoding::Utf32,
    ];

    /// Canonical lowercase name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Utf8 => "utf8",
            Self::Utf7 => "utf7",
            Self::Ascii => "ascii",
            Self::Unicode => "unicode",
            Self::Utf32 => "utf32",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace('-', "").as_str() {
            "utf8" => Ok(Self::Utf8),
            "utf7" => Ok(Self::Utf7),
            "ascii" => Ok(Self::Ascii),
            "unicode" | "utf16" => Ok(Self::Unicode),
            "utf32" => Ok(Self::Utf32),
            _ => Err(format!(
                "unknown encoding '{}' (expected one of: utf8, utf7, ascii, unicode, utf16, utf32)",
                s
            )),
        }
    }
}

impl TryFrom<String> for Encoding {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Encoding> for String {
    fn from(value: Encoding) -> Self {
        value.as_str().to_string()
    }
}

/// What a build invocation should do with the output directory
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum BuildTarget {
    /// Delete the output directory and stop
    Clean,
    /// Rebuild only when the sources are newer than the output
    Build,
    /// Delete the output directory, then always rebuild
    #[default]
    CleanBuild,
}

impl BuildTarget {
    /// Canonical kebab-case name
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Clean => "clean",
            Self::Build => "build",
            Self::CleanBuild => "clean-build",
        }
    }

    /// Whether this target wipes the output directory first
    pub fn cleans(&self) -> bool {
        matches!(self, Self::Clean | Self::CleanBuild)
    }
}

impl fmt::Display for BuildTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildTarget {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "clean" => Ok(Self::Clean),
            "build" => Ok(Self::Build),
            "cleanbuild" => Ok(Self::CleanBuild),
            _ => Err(format!(
                "unknown target '{}' (expected one of: clean, build, clean-build)",
                s
            )),
        }
    }
}

impl TryFrom<String> for BuildTarget {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<BuildTarget> for String {
    fn from(value: BuildTarget) -> Self {
        value.as_str().to_string()
    }
}

/// Source of a prefix or postfix block
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum BlockSource {
    /// Content is read from this file at assembly time
    File(PathBuf),
    /// Content is the configured text itself
    Literal(String),
}

impl BlockSource {
    /// Decide once whether `value` names a file (relative to `base`) or is
    /// inline text. Empty values yield no block at all.
    pub fn resolve(value: &str, base: &Path) -> Option<Self> {
        if value.is_empty() {
            return None;
        }

        let candidate = base.join(value);
        if candidate.is_file() {
            Some(Self::File(candidate))
        } else {
            Some(Self::Literal(value.to_string()))
        }
    }
}

/// One sparse layer of build settings (defaults, `build.toml`, or overrides)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PartialBuildRequest {
    /// Module source directory (or manifest file)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,

    /// Output directory (relative values anchor at the module base's parent)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<PathBuf>,

    /// Version written into the output manifest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<Version>,

    /// Directories copied verbatim into the output
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copy_directories: Option<Vec<PathBuf>>,

    /// Fragment directories, in concatenation order
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_directories: Option<Vec<String>>,

    /// Glob selecting public fragments; empty leaves exports untouched
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_filter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<Encoding>,

    /// Text or file path placed before the first fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,

    /// Text or file path placed after the last fragment
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postfix: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<BuildTarget>,

    /// Report the resolved module info after building
    #[serde(skip_serializing_if = "Option::is_none")]
    pub passthru: Option<bool>,

    /// Manifest diagnostic codes that are logged instead of failing the build
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suppressed_diagnostics: Option<Vec<String>>,
}

impl PartialBuildRequest {
    /// Built-in defaults, the lowest configuration layer
    pub fn defaults() -> Self {
        Self {
            source_path: None,
            output_directory: None,
            version: None,
            copy_directories: Some(Vec::new()),
            source_directories: Some(
                ["Enum", "Classes", "Private", "Public"]
                    .iter()
                    .map(|s| s.to_string())
                    .collect(),
            ),
            public_filter: Some("Public/*.ps1".to_string()),
            encoding: Some(Encoding::Utf8),
            prefix: None,
            postfix: None,
            target: Some(BuildTarget::CleanBuild),
            passthru: Some(false),
            suppressed_diagnostics: Some(vec![
                "invalid-root-module".to_string(),
                "invalid-nested-module".to_string(),
            ]),
        }
    }

    /// Load a layer from a `build.toml` file
    pub fn load_from_file(path: &Path) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        toml::from_str(&content).map_err(|e| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error: e,
        })
    }

    /// Merge another layer into this one.
    /// Other layer takes precedence for non-None values.
    pub fn merge(&mut self, other: &PartialBuildRequest) {
        fn take<T: Clone>(slot: &mut Option<T>, other: &Option<T>) {
            if other.is_some() {
                slot.clone_from(other);
            }
        }

        take(&mut self.source_path, &other.source_path);
        take(&mut self.output_directory, &other.output_directory);
        take(&mut self.version, &other.version);
        take(&mut self.copy_directories, &other.copy_directories);
        take(&mut self.source_directories, &other.source_directories);
        take(&mut self.public_filter, &other.public_filter);
        take(&mut self.encoding, &other.encoding);
        take(&mut self.prefix, &other.prefix);
        take(&mut self.postfix, &other.postfix);
        take(&mut self.target, &other.target);
        take(&mut self.passthru, &other.passthru);
        take(&mut self.suppressed_diagnostics, &other.suppressed_diagnostics);
    }

    /// Merge a sequence of layers, later layers winning
    pub fn layered<'a>(layers: impl IntoIterator<Item = &'a PartialBuildRequest>) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge(layer);
        }
        merged
    }
}

/// Fully resolved build settings for one module
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuildRequest {
    /// Absolute module base directory
    pub source_path: PathBuf,
    /// Absolute output directory
    pub output_directory: PathBuf,
    pub version: Option<Version>,
    /// Absolute directories copied into the output
    pub copy_directories: Vec<PathBuf>,
    /// Fragment directory names, relative to the module base
    pub source_directories: Vec<String>,
    pub public_filter: String,
    pub encoding: Encoding,
    pub prefix: Option<BlockSource>,
    pub postfix: Option<BlockSource>,
    pub target: BuildTarget,
    pub passthru: bool,
    pub suppressed_diagnostics: Vec<String>,
}

impl BuildRequest {
    /// Check whether a manifest diagnostic code is on the allow-list
    pub fn is_suppressed(&self, code: &str) -> bool {
        self.suppressed_diagnostics
            .iter()
            .any(|allowed| !allowed.is_empty() && code.contains(allowed.as_str()))
    }
}
