//! CLI integration tests for extbuild.
//!
//! These drive the real binary against throwaway package trees.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the extbuild binary command.
fn extbuild() -> Command {
    Command::cargo_bin("extbuild").unwrap()
}

/// Create a temporary package root.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

// ============================================================================
// extbuild adapters
// ============================================================================

#[test]
fn test_adapters_lists_builtins_in_order() {
    let tmp = temp_dir();

    let output = extbuild()
        .arg("adapters")
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    let names: Vec<&str> = stdout
        .lines()
        .filter_map(|line| line.split_whitespace().next())
        .collect();
    assert_eq!(
        names,
        vec![
            "ExtConf",
            "Configure",
            "Rake",
            "CMake",
            "Cargo",
            "Makefile",
            "Java",
            "Go",
            "Crystal",
            "Zig",
            "Swift"
        ]
    );
}

#[test]
fn test_adapters_include_configured_generic() {
    let tmp = temp_dir();
    fs::create_dir_all(tmp.path().join(".extbuild")).unwrap();
    fs::write(
        tmp.path().join(".extbuild/config.toml"),
        r#"
[[adapters]]
name = "Nim"
patterns = ["*.nim"]
tools = ["nim"]
build_command = ["nim", "c", "--app:lib", "{{input}}"]
"#,
    )
    .unwrap();

    extbuild()
        .arg("adapters")
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Nim"))
        .stdout(predicate::str::contains("nim"));
}

// ============================================================================
// extbuild build
// ============================================================================

#[test]
fn test_build_unknown_descriptor_fails() {
    let tmp = temp_dir();

    extbuild()
        .args(["build", "ext/demo/build.gradle", "--ruby-version", "3.3.0"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains(
            "no adapter found for extension file: build.gradle",
        ));
}

#[test]
fn test_build_requires_descriptor() {
    extbuild().arg("build").assert().failure();
}

#[cfg(unix)]
fn write_touch_adapter(root: &std::path::Path) {
    fs::create_dir_all(root.join(".extbuild")).unwrap();
    fs::write(
        root.join(".extbuild/config.toml"),
        r#"
[[adapters]]
name = "Touch"
patterns = ["*.touch"]
build_command = ["sh", "-c", "echo built > demo.so"]
"#,
    )
    .unwrap();
    fs::create_dir_all(root.join("ext/demo")).unwrap();
    fs::write(root.join("ext/demo/demo.touch"), "").unwrap();
}

#[cfg(unix)]
#[test]
fn test_build_installs_versioned_and_plain_copies() {
    let tmp = temp_dir();
    write_touch_adapter(tmp.path());

    extbuild()
        .args(["build", "ext/demo/demo.touch", "--ruby-version", "3.4.1"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("Installed lib/3.4/demo.so"));

    assert!(tmp.path().join("lib/3.4/demo.so").is_file());
    assert!(tmp.path().join("lib/demo.so").is_file());
}

#[cfg(unix)]
#[test]
fn test_build_json_report() {
    let tmp = temp_dir();
    write_touch_adapter(tmp.path());

    let output = extbuild()
        .args([
            "build",
            "ext/demo/demo.touch",
            "--ruby-version",
            "3.3.0",
            "--message-format",
            "json",
        ])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let entry = &report["extensions"][0];
    assert_eq!(entry["adapter"], "Touch");
    assert_eq!(entry["success"], true);
    assert_eq!(entry["installed"][0], "lib/demo.so");
}

#[cfg(unix)]
#[test]
fn test_build_no_install() {
    let tmp = temp_dir();
    write_touch_adapter(tmp.path());

    extbuild()
        .args(["build", "ext/demo/demo.touch", "--ruby-version", "3.4.1", "--no-install"])
        .current_dir(tmp.path())
        .assert()
        .success();

    assert!(tmp.path().join("ext/demo/demo.so").is_file());
    assert!(!tmp.path().join("lib").exists());
}

#[cfg(unix)]
#[test]
fn test_build_failure_reports_adapter() {
    let tmp = temp_dir();
    fs::create_dir_all(tmp.path().join(".extbuild")).unwrap();
    fs::write(
        tmp.path().join(".extbuild/config.toml"),
        r#"
[[adapters]]
name = "Broken"
patterns = ["*.broken"]
build_command = ["sh", "-c", "echo boom; exit 3"]
"#,
    )
    .unwrap();
    fs::write(tmp.path().join("demo.broken"), "").unwrap();

    extbuild()
        .args(["build", "demo.broken", "--ruby-version", "3.4.1"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Broken build failed:"))
        .stderr(predicate::str::contains("boom"));
}

// ============================================================================
// extbuild doctor / clean
// ============================================================================

#[test]
fn test_doctor_json() {
    let tmp = temp_dir();

    let output = extbuild()
        .args(["doctor", "--message-format", "json"])
        .current_dir(tmp.path())
        .output()
        .unwrap();
    assert!(output.status.success());

    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["checks"][0]["adapter"], "ExtConf");
}

#[test]
fn test_clean_unknown_descriptor_is_not_fatal() {
    let tmp = temp_dir();

    extbuild()
        .args(["clean", "README.md"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stderr(predicate::str::contains("clean step(s) failed"));
}
