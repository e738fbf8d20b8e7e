//! Integration tests for the o11y-export binary
//!
//! These run the built binary and only exercise paths that never reach the
//! network or the terraform binary.

use std::process::Command;

/// Get the path to the o11y-export binary
fn export_binary() -> std::path::PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // Remove test executable name
    path.pop(); // Remove deps directory

    path.push("o11y-export");

    if cfg!(windows) {
        path.set_extension("exe");
    }

    path
}

fn run_export(args: &[&str]) -> std::process::Output {
    Command::new(export_binary())
        .args(args)
        .env_remove("O11Y_API_TOKEN")
        .env_remove("O11Y_REALM")
        .output()
        .expect("Failed to execute o11y-export")
}

#[test]
fn test_version() {
    let output = run_export(&["--version"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("o11y-export"));
}

#[test]
fn test_help_lists_targets() {
    let output = run_export(&["--help"]);

    assert!(output.status.success());

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    for flag in ["--group", "--dashboard", "--chart", "--detector", "--slo", "--api-key", "--realm"] {
        assert!(stdout.contains(flag), "missing {} in help", flag);
    }
}

#[test]
fn test_only_one_target_allowed() {
    let output = run_export(&["--api-key", "tok", "--group", "G1", "--slo", "S1"]);

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("cannot be used with"));
}

#[test]
fn test_unknown_flag() {
    let output = run_export(&["--dashbord", "D1"]);

    assert!(!output.status.success());
}

#[test]
fn test_invalid_config_file_fails_before_export() {
    let dir = tempfile::tempdir().unwrap();
    let config = dir.path().join("bad.yaml");
    std::fs::write(&config, "realm: [unterminated").unwrap();

    let output = Command::new(export_binary())
        .current_dir(dir.path())
        .args(["--api-key", "tok", "--slo", "S1", "--config"])
        .arg(&config)
        .output()
        .expect("Failed to execute o11y-export");

    assert!(!output.status.success());

    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Failed to parse config file"));
    assert!(!dir.path().join("terraform_output").exists());
}
