//! CLI integration tests for Weft.
//!
//! These tests lay out a small monorepo on disk and run the binary over it.

use std::fs;
use std::path::Path;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the weft binary command, pointed at `root`.
///
/// HOME points into the temp repository so no user config is layered in.
fn weft(root: &Path) -> Command {
    let mut cmd = Command::cargo_bin("weft").unwrap();
    cmd.arg("--root")
        .arg(root)
        .env_remove("WEFT_ROOT")
        .env("HOME", root);
    cmd
}

/// Create a temporary directory for test repositories.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Write `<source_root>/<name>/setup.py` and `src/<name>/__init__.py`.
fn package(root: &Path, source_root: &str, name: &str, imports: &[&str]) {
    let setup = format!(
        "from setuptools import setup\n\nsetup(\n    name=\"{name}\",\n    entry_points={{\"console_scripts\": [\"{name}={name}.main:run\"]}},\n)\n"
    );
    write(root, &format!("{source_root}/{name}/setup.py"), &setup);

    let body: String = imports.iter().map(|i| format!("import {i}\n")).collect();
    write(
        root,
        &format!("{source_root}/{name}/src/{name}/__init__.py"),
        &body,
    );
}

/// pkg_a -> {pkg_b, requests}, pkg_b -> util.
fn sample_repo() -> TempDir {
    let tmp = temp_dir();
    let root = tmp.path();
    package(root, "lib", "pkg_a", &["pkg_b", "requests", "os"]);
    package(root, "lib", "pkg_b", &["util"]);
    package(root, "lib", "util", &[]);
    write(
        root,
        "3rdparty/python/import-map.json",
        r#"{"requests": "requests"}"#,
    );
    write(root, "3rdparty/python/requirements.txt", "requests==2.31.0\n");
    tmp
}

// ============================================================================
// weft check
// ============================================================================

#[test]
fn test_check_acyclic_repo() {
    let tmp = sample_repo();

    weft(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stdout(predicate::str::contains("4 targets"))
        .stdout(predicate::str::contains("no cycles"));
}

#[test]
fn test_check_reports_every_cycle() {
    let tmp = temp_dir();
    let root = tmp.path();
    package(root, "lib", "a", &["b"]);
    package(root, "lib", "b", &["a"]);
    package(root, "lib", "c", &["d"]);
    package(root, "lib", "d", &["e"]);
    package(root, "lib", "e", &["c"]);

    weft(root)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("circular dependencies found"))
        .stderr(predicate::str::contains(
            "cycle: lib/a/src -> lib/b/src -> lib/a/src",
        ))
        .stderr(predicate::str::contains(
            "cycle: lib/c/src -> lib/d/src -> lib/e/src -> lib/c/src",
        ));
}

#[test]
fn test_check_reports_duplicate_packages() {
    let tmp = temp_dir();
    let root = tmp.path();
    package(root, "lib", "common", &[]);
    package(root, "apps", "common", &[]);

    weft(root)
        .arg("check")
        .assert()
        .failure()
        .stderr(predicate::str::contains("duplicate target"))
        .stderr(predicate::str::contains("lib/common/src"))
        .stderr(predicate::str::contains("apps/common/src"));
}

#[test]
fn test_check_warns_on_unparseable_file() {
    let tmp = sample_repo();
    write(tmp.path(), "lib/util/src/util/broken.py", "def broken(:\n");

    weft(tmp.path())
        .arg("check")
        .assert()
        .success()
        .stderr(predicate::str::contains("broken.py"));

    weft(tmp.path()).args(["check", "--strict"]).assert().failure();
}

// ============================================================================
// weft deps
// ============================================================================

#[test]
fn test_deps_prints_build_order() {
    let tmp = sample_repo();

    weft(tmp.path())
        .args(["deps", "--target", "lib/pkg_a/src"])
        .assert()
        .success()
        .stdout("lib/util/src\nlib/pkg_b/src\n");
}

#[test]
fn test_deps_include_third_party() {
    let tmp = sample_repo();

    weft(tmp.path())
        .args(["deps", "--target", "lib/pkg_a/src", "--include-3rdparty"])
        .assert()
        .success()
        .stdout("3rdparty/python:requests\nlib/util/src\nlib/pkg_b/src\n");
}

#[test]
fn test_deps_direct_only() {
    let tmp = sample_repo();

    weft(tmp.path())
        .args(["deps", "--target", "lib/pkg_a/src", "--direct"])
        .assert()
        .success()
        .stdout("lib/pkg_b/src\n");

    weft(tmp.path())
        .args(["deps", "--target", "lib/pkg_a/src", "--direct", "--include-3rdparty"])
        .assert()
        .success()
        .stdout("3rdparty/python:requests\nlib/pkg_b/src\n");
}

#[test]
fn test_global_config_read_from_home() {
    let tmp = sample_repo();
    write(tmp.path(), ".weft/config.toml", "ignore_targets = [\"lib/util/src\"]\n");

    weft(tmp.path())
        .args(["deps", "--target", "lib/pkg_a/src"])
        .assert()
        .success()
        .stdout("lib/pkg_b/src\n");
}

#[test]
fn test_deps_unknown_target_lists_known() {
    let tmp = sample_repo();

    weft(tmp.path())
        .args(["deps", "--target", "lib/missing/src"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no target registered named `lib/missing/src`"))
        .stderr(predicate::str::contains("lib/pkg_a/src, lib/pkg_b/src, lib/util/src"));
}

// ============================================================================
// weft targets / describe
// ============================================================================

#[test]
fn test_targets_lists_kinds() {
    let tmp = sample_repo();
    write(tmp.path(), "lib/pkg_a/.weft.toml", "type = \"binary\"\n");
    write(tmp.path(), "lib/pkg_a/tests/unit/test_a.py", "import pkg_a\n");

    weft(tmp.path())
        .arg("targets")
        .assert()
        .success()
        .stdout(predicate::str::contains("lib/pkg_a/src\tbinary"))
        .stdout(predicate::str::contains("lib/pkg_a/tests/unit\ttest"))
        .stdout(predicate::str::contains("3rdparty/python:requests\trequirement"));

    weft(tmp.path())
        .args(["targets", "--kind", "library"])
        .assert()
        .success()
        .stdout("lib/pkg_b/src\tlibrary\nlib/util/src\tlibrary\n");
}

#[test]
fn test_describe_emits_json() {
    let tmp = sample_repo();

    let output = weft(tmp.path())
        .args(["describe", "--target-pattern", "pkg_a"])
        .output()
        .unwrap();
    assert!(output.status.success());

    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let descriptors = json.as_array().unwrap();
    assert_eq!(descriptors.len(), 1);
    assert_eq!(descriptors[0]["key"], "lib/pkg_a/src");
    assert_eq!(descriptors[0]["kind"], "library");

    let library = &descriptors[0]["blocks"][0];
    assert_eq!(library["rule"], "python_library");
    let rendered = library.to_string();
    assert!(rendered.contains("3rdparty/python:requests"));
    assert!(rendered.contains("lib/pkg_b/src"));
}

#[test]
fn test_extra_targets_from_config() {
    let tmp = sample_repo();
    write(
        tmp.path(),
        "weft.toml",
        "[[extra_targets]]\nkey = \"vendor/shim\"\ndependencies = [\"lib/util/src\"]\n",
    );
    package(tmp.path(), "lib", "uses_shim", &["shim"]);

    weft(tmp.path())
        .args(["deps", "--target", "lib/uses_shim/src"])
        .assert()
        .success()
        .stdout("lib/util/src\nvendor/shim\n");
}

// ============================================================================
// weft import-map
// ============================================================================

#[test]
fn test_import_map_up_to_date() {
    let tmp = sample_repo();

    weft(tmp.path())
        .arg("import-map")
        .assert()
        .success()
        .stdout(predicate::str::contains("up to date"));
}

#[test]
fn test_import_map_reports_drift() {
    let tmp = sample_repo();
    write(
        tmp.path(),
        "3rdparty/python/requirements.txt",
        "requests==2.31.0\nPyYAML\n",
    );

    weft(tmp.path())
        .arg("import-map")
        .assert()
        .failure()
        .stdout(predicate::str::contains("unmapped\tPyYAML"))
        .stderr(predicate::str::contains("import map is out of date"));
}
