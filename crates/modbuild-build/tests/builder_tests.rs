//! Integration tests for the build pipeline
//!
//! Tests the complete pipeline against real module trees on disk

use modbuild_build::{BuildOutcome, BuildTarget, Builder, Encoding, PartialBuildRequest};
use pretty_assertions::assert_eq;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};
use tempfile::TempDir;

const MANIFEST: &str = r#"# Widgets module manifest
name = "Widgets"
root_module = "Widgets.psm1"
version = "0.0.1"
author = "Widget Team" # keep me
exported_functions = ["Old-Function"]

[private_data]
tags = ["widgets", "demo"]
"#;

/// Create a module tree under `<temp>/Widgets` with the given files
fn create_test_module(files: &[(&str, &str)]) -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let base = dir.path().join("Widgets");
    fs::create_dir_all(&base).unwrap();
    fs::write(base.join("Widgets.toml"), MANIFEST).unwrap();

    for (file_path, content) in files {
        let full_path = base.join(file_path);
        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(full_path, content).unwrap();
    }

    (dir, base)
}

/// Push every file under `root` one hour into the past
fn age_tree(root: &Path) {
    let past = SystemTime::now() - Duration::from_secs(3600);
    for entry in walkdir::WalkDir::new(root) {
        let entry = entry.unwrap();
        if entry.file_type().is_file() {
            File::options()
                .write(true)
                .open(entry.path())
                .unwrap()
                .set_modified(past)
                .unwrap();
        }
    }
}

fn output_dir(temp: &TempDir) -> PathBuf {
    dunce::canonicalize(temp.path())
        .unwrap()
        .join("Output")
        .join("Widgets")
}

fn read_manifest(temp: &TempDir) -> toml::Table {
    let content = fs::read_to_string(output_dir(temp).join("Widgets.toml")).unwrap();
    toml::from_str(&content).unwrap()
}

fn exports(table: &toml::Table) -> Vec<String> {
    table["exported_functions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|v| v.as_str().unwrap().to_string())
        .collect()
}

fn build(base: &Path, overrides: PartialBuildRequest) -> modbuild_build::BuildReport {
    Builder::new(base).with_overrides(overrides).build().unwrap()
}

#[test]
fn test_build_simple_module() {
    let (temp, base) = create_test_module(&[
        ("Private/Helper.ps1", "function Helper {}\n"),
        ("Public/Get-Widget.ps1", "function Get-Widget { Helper }\n"),
    ]);

    let report = build(&base, PartialBuildRequest::default());

    assert_eq!(report.outcome, BuildOutcome::Built);
    let artifact = report.artifact.unwrap();
    assert_eq!(artifact.path, output_dir(&temp).join("Widgets.psm1"));
    assert_eq!(artifact.fragments.len(), 2);
    assert_eq!(artifact.sha256.len(), 64);

    let script = fs::read_to_string(&artifact.path).unwrap();
    assert_eq!(
        script,
        "#region './Private/Helper.ps1'\n\
         function Helper {}\n\
         #endregion './Private/Helper.ps1'\n\
         #region './Public/Get-Widget.ps1'\n\
         function Get-Widget { Helper }\n\
         #endregion './Public/Get-Widget.ps1'\n"
    );
}

#[test]
fn test_prefix_literal_and_fragment_order() {
    let (temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);

    build(
        &base,
        PartialBuildRequest {
            prefix: Some("# header".to_string()),
            ..Default::default()
        },
    );

    let script = fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap();
    let lines: Vec<&str> = script.lines().collect();
    assert_eq!(
        lines,
        vec![
            "#region 'PREFIX'",
            "# header",
            "#endregion 'PREFIX'",
            "#region './Public/A.ps1'",
            "function A {}",
            "#endregion './Public/A.ps1'",
        ]
    );
}

#[test]
fn test_prefix_and_postfix_from_files() {
    let (temp, base) = create_test_module(&[
        ("header.ps1", "Set-StrictMode -Version Latest"),
        ("Public/A.ps1", "function A {}"),
    ]);

    build(
        &base,
        PartialBuildRequest {
            prefix: Some("header.ps1".to_string()),
            postfix: Some("Export-ModuleMember -Function A".to_string()),
            ..Default::default()
        },
    );

    let script = fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap();
    assert!(script.starts_with("#region './header.ps1'\nSet-StrictMode -Version Latest\n"));
    assert!(script.ends_with(
        "#region 'POSTFIX'\nExport-ModuleMember -Function A\n#endregion 'POSTFIX'\n"
    ));
}

#[test]
fn test_source_directory_order_defines_concatenation() {
    let (temp, base) = create_test_module(&[
        ("Public/Get-Widget.ps1", "# public"),
        ("Private/Helper.ps1", "# private"),
        ("Classes/Widget.ps1", "# class"),
        ("Enum/Size.ps1", "# enum"),
    ]);

    build(&base, PartialBuildRequest::default());

    let script = fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap();
    let bodies: Vec<&str> = script.lines().filter(|l| l.starts_with("# ")).collect();
    assert_eq!(bodies, vec!["# enum", "# class", "# private", "# public"]);
}

#[test]
fn test_repeated_builds_are_byte_identical() {
    let (temp, base) = create_test_module(&[
        ("Public/b.ps1", "function B {}"),
        ("Public/a.ps1", "function A {}"),
        ("Private/Nested/c.ps1", "function C {}"),
    ]);
    let script = output_dir(&temp).join("Widgets.psm1");

    build(&base, PartialBuildRequest::default());
    let first = fs::read(&script).unwrap();

    build(&base, PartialBuildRequest::default());
    let second = fs::read(&script).unwrap();

    assert_eq!(first, second);
}

#[test]
fn test_build_twice_second_run_is_noop() {
    let (temp, base) = create_test_module(&[("Public/Get-Widget.ps1", "function Get-Widget {}")]);
    age_tree(&base);

    let overrides = PartialBuildRequest {
        target: Some(BuildTarget::Build),
        ..Default::default()
    };

    let first = build(&base, overrides.clone());
    assert_eq!(first.outcome, BuildOutcome::Built);

    let script = output_dir(&temp).join("Widgets.psm1");
    let manifest = output_dir(&temp).join("Widgets.toml");
    let script_mtime = fs::metadata(&script).unwrap().modified().unwrap();
    let manifest_mtime = fs::metadata(&manifest).unwrap().modified().unwrap();

    let second = build(&base, overrides);
    assert_eq!(second.outcome, BuildOutcome::UpToDate);
    assert!(second.artifact.is_none());
    assert_eq!(fs::metadata(&script).unwrap().modified().unwrap(), script_mtime);
    assert_eq!(fs::metadata(&manifest).unwrap().modified().unwrap(), manifest_mtime);
}

#[test]
fn test_build_after_source_change_rebuilds() {
    let (temp, base) = create_test_module(&[("Public/Get-Widget.ps1", "function Get-Widget {}")]);
    age_tree(&base);

    let overrides = PartialBuildRequest {
        target: Some(BuildTarget::Build),
        ..Default::default()
    };
    build(&base, overrides.clone());
    age_tree(&output_dir(&temp));

    fs::write(base.join("Public/Get-Widget.ps1"), "function Get-Widget { 2 }").unwrap();

    let report = build(&base, overrides);
    assert_eq!(report.outcome, BuildOutcome::Built);
    let script = fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap();
    assert!(script.contains("function Get-Widget { 2 }"));
}

#[test]
fn test_clean_build_removes_stray_files() {
    let (temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);
    let out = output_dir(&temp);
    fs::create_dir_all(&out).unwrap();
    fs::write(out.join("stray.txt"), "left over").unwrap();

    let report = build(&base, PartialBuildRequest::default());

    assert_eq!(report.outcome, BuildOutcome::Built);
    assert!(!out.join("stray.txt").exists());
    assert!(out.join("Widgets.psm1").exists());
}

#[test]
fn test_clean_target_removes_output_and_stops() {
    let (temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);
    build(&base, PartialBuildRequest::default());
    assert!(output_dir(&temp).exists());

    let report = build(
        &base,
        PartialBuildRequest {
            target: Some(BuildTarget::Clean),
            ..Default::default()
        },
    );

    assert_eq!(report.outcome, BuildOutcome::Cleaned);
    assert!(!output_dir(&temp).exists());
}

#[test]
fn test_public_filter_sets_exports() {
    let (temp, base) = create_test_module(&[
        ("Public/Get-Foo.ps1", "function Get-Foo {}"),
        ("Public/Set-Bar.ps1", "function Set-Bar {}"),
        ("Private/Hidden.ps1", "function Hidden {}"),
    ]);

    let report = build(&base, PartialBuildRequest::default());

    let manifest = read_manifest(&temp);
    assert_eq!(exports(&manifest), vec!["Get-Foo", "Set-Bar"]);
    assert_eq!(
        report.patch.unwrap().exports,
        Some(vec!["Get-Foo".to_string(), "Set-Bar".to_string()])
    );
}

#[test]
fn test_public_filter_without_matches_clears_exports() {
    let (temp, base) = create_test_module(&[("Private/Hidden.ps1", "function Hidden {}")]);

    build(&base, PartialBuildRequest::default());

    let manifest = read_manifest(&temp);
    assert!(exports(&manifest).is_empty());
}

#[test]
fn test_empty_filter_and_no_version_keeps_manifest() {
    let (temp, base) = create_test_module(&[("Public/Get-Foo.ps1", "function Get-Foo {}")]);

    let report = build(
        &base,
        PartialBuildRequest {
            public_filter: Some(String::new()),
            ..Default::default()
        },
    );

    assert!(report.patch.unwrap().is_empty());
    let copied = fs::read_to_string(output_dir(&temp).join("Widgets.toml")).unwrap();
    assert_eq!(copied, MANIFEST);
}

#[test]
fn test_version_patch_preserves_other_content() {
    let (temp, base) = create_test_module(&[("Public/Get-Foo.ps1", "function Get-Foo {}")]);

    build(
        &base,
        PartialBuildRequest {
            version: Some(semver::Version::parse("2.3.4-beta1").unwrap()),
            ..Default::default()
        },
    );

    let copied = fs::read_to_string(output_dir(&temp).join("Widgets.toml")).unwrap();
    assert!(copied.starts_with("# Widgets module manifest\n"));
    assert!(copied.contains("author = \"Widget Team\" # keep me"));
    assert!(copied.contains("version = \"2.3.4\""));

    let manifest: toml::Table = toml::from_str(&copied).unwrap();
    assert_eq!(manifest["prerelease"].as_str(), Some("beta1"));
    assert_eq!(manifest["private_data"]["tags"].as_array().unwrap().len(), 2);
    assert_eq!(exports(&manifest), vec!["Get-Foo"]);
}

#[test]
fn test_stable_version_drops_prerelease() {
    let (temp, base) = create_test_module(&[]);
    fs::write(
        base.join("Widgets.toml"),
        "version = \"1.0.0\"\nprerelease = \"alpha\"\n",
    )
    .unwrap();

    build(
        &base,
        PartialBuildRequest {
            version: Some(semver::Version::new(1, 1, 0)),
            ..Default::default()
        },
    );

    let manifest = read_manifest(&temp);
    assert_eq!(manifest["version"].as_str(), Some("1.1.0"));
    assert!(!manifest.contains_key("prerelease"));
}

#[test]
fn test_passthrough_files_and_copy_directories() {
    let (temp, base) = create_test_module(&[
        ("Widgets.Format.ps1xml", "<Configuration/>"),
        ("build.toml", "passthru = false\n"),
        ("notes.txt", "not copied"),
        ("en-US/about_Widgets.help.txt", "help"),
        ("Public/A.ps1", "function A {}"),
    ]);

    build(
        &base,
        PartialBuildRequest {
            copy_directories: Some(vec![PathBuf::from("en-US")]),
            ..Default::default()
        },
    );

    let out = output_dir(&temp);
    assert!(out.join("Widgets.toml").exists());
    assert!(out.join("Widgets.Format.ps1xml").exists());
    assert!(out.join("en-US/about_Widgets.help.txt").exists());
    assert!(!out.join("build.toml").exists());
    assert!(!out.join("notes.txt").exists());
    assert!(!out.join("Public").exists());
}

#[test]
fn test_existing_root_script_is_replaced() {
    let (temp, base) = create_test_module(&[
        ("Widgets.psm1", "# stale hand-written script"),
        ("Public/A.ps1", "function A {}"),
    ]);

    build(&base, PartialBuildRequest::default());

    let script = fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap();
    assert!(!script.contains("stale"));
    assert!(script.contains("function A {}"));
}

#[test]
fn test_unicode_encoding_writes_bom() {
    let (temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);

    build(
        &base,
        PartialBuildRequest {
            encoding: Some(Encoding::Unicode),
            ..Default::default()
        },
    );

    let bytes = fs::read(output_dir(&temp).join("Widgets.psm1")).unwrap();
    assert_eq!(&bytes[..4], &[0xFF, 0xFE, b'#', 0x00]);
}

#[test]
fn test_module_without_fragments_builds_empty_script() {
    let (temp, base) = create_test_module(&[]);

    let report = build(&base, PartialBuildRequest::default());

    assert_eq!(report.artifact.unwrap().fragments.len(), 0);
    assert_eq!(
        fs::read_to_string(output_dir(&temp).join("Widgets.psm1")).unwrap(),
        ""
    );
}

#[test]
fn test_missing_copy_directory_is_fatal() {
    let (_temp, base) = create_test_module(&[]);

    let result = Builder::new(&base)
        .with_overrides(PartialBuildRequest {
            copy_directories: Some(vec![PathBuf::from("missing")]),
            ..Default::default()
        })
        .build();

    assert!(matches!(result, Err(modbuild_build::BuildError::Io { .. })));
}

#[test]
fn test_manifest_not_found_is_reported() {
    let temp = TempDir::new().unwrap();
    let result = Builder::new(temp.path()).build();

    assert!(matches!(
        result,
        Err(modbuild_build::BuildError::Config(
            modbuild_config::ConfigError::ManifestNotFound(_)
        ))
    ));
}

#[test]
fn test_relative_output_directory() {
    let (temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);

    let report = Builder::new(&base)
        .with_output_directory("dist/Widgets")
        .build()
        .unwrap();

    let expected = dunce::canonicalize(temp.path())
        .unwrap()
        .join("dist/Widgets/Widgets.psm1");
    assert_eq!(report.artifact.unwrap().path, expected);
    assert!(expected.exists());
}

#[test]
fn test_parent_output_directory_never_cleans_sources() {
    let (_temp, base) = create_test_module(&[("Public/A.ps1", "function A {}")]);

    for output in ["..", "Widgets/.."] {
        let result = Builder::new(&base).with_output_directory(output).build();

        assert!(matches!(
            result,
            Err(modbuild_build::BuildError::Config(
                modbuild_config::ConfigError::InvalidValue { .. }
            ))
        ));
        assert!(base.join("Widgets.toml").exists());
        assert!(base.join("Public/A.ps1").exists());
    }
}

#[test]
fn test_absolute_public_filter_inside_module() {
    let (temp, base) = create_test_module(&[
        ("Public/Get-Foo.ps1", "function Get-Foo {}"),
        ("Private/Hidden.ps1", "function Hidden {}"),
    ]);
    let filter = format!("{}/Public/*.ps1", dunce::canonicalize(&base).unwrap().display());

    build(
        &base,
        PartialBuildRequest {
            public_filter: Some(filter),
            ..Default::default()
        },
    );

    assert_eq!(exports(&read_manifest(&temp)), vec!["Get-Foo"]);
}
