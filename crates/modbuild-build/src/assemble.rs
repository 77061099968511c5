//! Artifact assembly: output directory, pass-through copies and the
//! concatenated module script

use crate::encoding::encode;
use crate::error::{BuildError, BuildResult};
use crate::fragments::{discover_fragments, SourceFragment};
use modbuild_config::layout::{has_extension, BUILD_CONFIG_FILE, PASSTHROUGH_EXTENSIONS};
use modbuild_config::{BlockSource, ModuleInfo};
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// The written module script
#[derive(Debug, Clone, Serialize)]
pub struct AssembledArtifact {
    /// Output script path
    pub path: PathBuf,
    /// Fragments in concatenation order
    pub fragments: Vec<SourceFragment>,
    /// Size of the encoded script in bytes
    pub byte_len: usize,
    /// SHA-256 of the encoded script, lowercase hex
    pub sha256: String,
}

/// Run every filesystem step of a build except manifest patching.
///
/// Any I/O failure aborts immediately; files already written stay behind.
pub fn assemble(info: &ModuleInfo) -> BuildResult<AssembledArtifact> {
    let request = &info.request;
    let output = &request.output_directory;

    fs::create_dir_all(output).map_err(|e| BuildError::io(output, e))?;

    copy_module_files(&info.module_base, output)?;

    for dir in &request.copy_directories {
        copy_directory(dir, output)?;
    }

    let fragments = discover_fragments(&info.module_base, &request.source_directories)
        .collect::<BuildResult<Vec<_>>>()?;

    let text = concatenate(
        &info.module_base,
        request.prefix.as_ref(),
        &fragments,
        request.postfix.as_ref(),
    )?;

    let bytes = encode(&text, request.encoding);
    let path = info.artifact_path();
    fs::write(&path, &bytes).map_err(|e| BuildError::io(&path, e))?;

    info!(
        module = %info.name,
        fragments = fragments.len(),
        encoding = %request.encoding,
        path = %path.display(),
        "wrote module script"
    );

    Ok(AssembledArtifact {
        path,
        fragments,
        byte_len: bytes.len(),
        sha256: format!("{:x}", Sha256::digest(&bytes)),
    })
}

/// Copy manifest, script and type metadata files sitting directly in the
/// module base. The sidecar build configuration stays behind.
fn copy_module_files(module_base: &Path, output: &Path) -> BuildResult<()> {
    let entries = fs::read_dir(module_base).map_err(|e| BuildError::io(module_base, e))?;

    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| BuildError::io(module_base, e))?;
        let path = entry.path();
        let is_file = entry
            .file_type()
            .map_err(|e| BuildError::io(&path, e))?
            .is_file();

        if !is_file || entry.file_name() == BUILD_CONFIG_FILE {
            continue;
        }
        if PASSTHROUGH_EXTENSIONS
            .iter()
            .any(|ext| has_extension(&path, ext))
        {
            files.push(path);
        }
    }
    files.sort();

    for source in files {
        if let Some(file_name) = source.file_name() {
            let destination = output.join(file_name);
            debug!(from = %source.display(), to = %destination.display(), "copying module file");
            fs::copy(&source, &destination).map_err(|e| BuildError::io(&source, e))?;
        }
    }

    Ok(())
}

/// Recursively copy `dir` to `<output>/<dir name>`, overwriting files
fn copy_directory(dir: &Path, output: &Path) -> BuildResult<()> {
    let Some(dir_name) = dir.file_name() else {
        return Err(BuildError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::InvalidInput, "not a directory name"),
        ));
    };
    if !dir.is_dir() {
        return Err(BuildError::io(
            dir,
            std::io::Error::new(std::io::ErrorKind::NotFound, "copy directory not found"),
        ));
    }

    let destination_root = output.join(dir_name);
    debug!(from = %dir.display(), to = %destination_root.display(), "copying directory");

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry?;
        let relative = entry.path().strip_prefix(dir).unwrap_or(entry.path());
        let destination = destination_root.join(relative);

        if entry.file_type().is_dir() {
            fs::create_dir_all(&destination).map_err(|e| BuildError::io(&destination, e))?;
        } else {
            fs::copy(entry.path(), &destination).map_err(|e| BuildError::io(entry.path(), e))?;
        }
    }

    Ok(())
}

/// Join prefix, fragments and postfix, each wrapped in region markers
pub fn concatenate(
    module_base: &Path,
    prefix: Option<&BlockSource>,
    fragments: &[SourceFragment],
    postfix: Option<&BlockSource>,
) -> BuildResult<String> {
    let mut out = String::new();

    if let Some(prefix) = prefix {
        let (label, content) = read_block(module_base, prefix, "PREFIX")?;
        push_block(&mut out, &label, &content);
    }

    for fragment in fragments {
        let content =
            fs::read_to_string(&fragment.path).map_err(|e| BuildError::io(&fragment.path, e))?;
        push_block(&mut out, &fragment.label(), &content);
    }

    if let Some(postfix) = postfix {
        let (label, content) = read_block(module_base, postfix, "POSTFIX")?;
        push_block(&mut out, &label, &content);
    }

    Ok(out)
}

fn read_block(
    module_base: &Path,
    source: &BlockSource,
    literal_label: &str,
) -> BuildResult<(String, String)> {
    match source {
        BlockSource::Literal(text) => Ok((literal_label.to_string(), text.clone())),
        BlockSource::File(path) => {
            let content = fs::read_to_string(path).map_err(|e| BuildError::io(path, e))?;
            let label = SourceFragment::new(module_base, path.clone()).label();
            Ok((label, content))
        }
    }
}

fn push_block(out: &mut String, label: &str, content: &str) {
    let body = content
        .strip_prefix('\u{feff}')
        .unwrap_or(content)
        .trim_end_matches(['\r', '\n']);

    out.push_str(&format!("#region '{}'\n", label));
    if !body.is_empty() {
        out.push_str(body);
        out.push('\n');
    }
    out.push_str(&format!("#endregion '{}'\n", label));
}
