//! Build command - assemble modules, in parallel when given several paths

use anyhow::{Context, Result};
use modbuild_build::{BuildOutcome, BuildReport, BuildTarget, Builder, Encoding, PartialBuildRequest};
use rayon::prelude::*;
use semver::Version;
use std::path::PathBuf;
use tracing::error;

/// Build command arguments
#[derive(Default)]
pub struct BuildArgs {
    /// Module paths (defaults to the current directory)
    pub paths: Vec<PathBuf>,
    /// Output directory
    pub output: Option<PathBuf>,
    /// Version written into the output manifest
    pub version: Option<String>,
    /// Directories copied verbatim into the output
    pub copy_directories: Vec<PathBuf>,
    /// Fragment directories in concatenation order
    pub source_directories: Vec<String>,
    /// Glob selecting public fragments
    pub public_filter: Option<String>,
    pub encoding: Option<Encoding>,
    /// Text or file placed before the first fragment
    pub prefix: Option<String>,
    /// Text or file placed after the last fragment
    pub postfix: Option<String>,
    pub target: Option<BuildTarget>,
    /// Print the resolved module information
    pub passthru: bool,
    /// Quiet output (errors only)
    pub quiet: bool,
    /// JSON output
    pub json: bool,
}

/// Run the build command
pub fn run(args: BuildArgs) -> Result<()> {
    let overrides = determine_overrides(&args)?;
    let paths = determine_paths(&args);

    // Every module is attempted; the first failure decides the exit status
    let results: Vec<Result<BuildReport>> = paths
        .par_iter()
        .map(|path| {
            Builder::new(path)
                .with_overrides(overrides.clone())
                .build()
                .with_context(|| format!("Failed to build module at {}", path.display()))
        })
        .collect();

    let mut reports = Vec::new();
    let mut failures = Vec::new();
    for result in results {
        match result {
            Ok(report) => reports.push(report),
            Err(err) => failures.push(err),
        }
    }

    if args.json {
        println!(
            "{}",
            serde_json::to_string_pretty(&serde_json::json!({
                "success": failures.is_empty(),
                "modules": reports,
                "errors": failures.iter().map(|e| format!("{:#}", e)).collect::<Vec<_>>(),
            }))?
        );
    } else {
        for report in &reports {
            if report.module.request.passthru {
                println!("{}", serde_json::to_string_pretty(&report.module)?);
            } else if !args.quiet {
                println!("{}", summarize(report));
            }
        }
    }

    let mut failures = failures.into_iter();
    match failures.next() {
        Some(first) => {
            for other in failures {
                error!("{:#}", other);
            }
            Err(first)
        }
        None => Ok(()),
    }
}

/// Turn command-line flags into the highest-priority configuration layer
fn determine_overrides(args: &BuildArgs) -> Result<PartialBuildRequest> {
    let version = args.version.as_deref().map(parse_version).transpose()?;

    Ok(PartialBuildRequest {
        output_directory: args.output.clone(),
        version,
        copy_directories: non_empty(&args.copy_directories),
        source_directories: non_empty(&args.source_directories),
        public_filter: args.public_filter.clone(),
        encoding: args.encoding,
        prefix: args.prefix.clone(),
        postfix: args.postfix.clone(),
        target: args.target,
        passthru: args.passthru.then_some(true),
        ..Default::default()
    })
}

/// Module paths to build, defaulting to the current directory
fn determine_paths(args: &BuildArgs) -> Vec<PathBuf> {
    if args.paths.is_empty() {
        vec![PathBuf::from(".")]
    } else {
        args.paths.clone()
    }
}

/// Parse a version, accepting a leading `v`
fn parse_version(raw: &str) -> Result<Version> {
    let trimmed = raw.strip_prefix('v').unwrap_or(raw);
    Version::parse(trimmed).with_context(|| format!("Invalid version: {}", raw))
}

fn non_empty<T: Clone>(values: &[T]) -> Option<Vec<T>> {
    (!values.is_empty()).then(|| values.to_vec())
}

/// One-line human-readable result
fn summarize(report: &BuildReport) -> String {
    let name = &report.module.name;
    match (&report.outcome, &report.artifact) {
        (BuildOutcome::Built, Some(artifact)) => format!(
            "Built {} -> {} ({} fragments, {} bytes) in {:.2}s",
            name,
            artifact.path.display(),
            artifact.fragments.len(),
            artifact.byte_len,
            report.elapsed.as_secs_f64()
        ),
        (BuildOutcome::Cleaned, _) => format!(
            "Cleaned {} ({})",
            name,
            report.module.request.output_directory.display()
        ),
        (outcome, _) => format!("{} is {}", name, outcome),
    }
}
