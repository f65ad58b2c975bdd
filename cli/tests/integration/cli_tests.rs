//! Integration tests for argument parsing, exit codes, and output channels.

#![allow(clippy::expect_used)]

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

pub fn amibake() -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("amibake"));
    cmd.env("NO_COLOR", "1");
    cmd.env_remove("AMIBAKE_CONFIG");
    cmd
}

/// Required flags pointing at `key_path`, in underscore form.
pub fn required_args(key_path: &str) -> Vec<String> {
    [
        ("--base_ami", "ami-0001"),
        ("--ami_name", "my-image"),
        ("--region", "us-east-1"),
        ("--subnet_id", "subnet-1"),
        ("--security_group", "sg-1"),
        ("--key_name", "builder"),
        ("--key_path", key_path),
    ]
    .into_iter()
    .flat_map(|(k, v)| [k.to_string(), v.to_string()])
    .collect()
}

// --- Help and version ---

#[test]
fn test_no_args_shows_help_and_exits_two() {
    amibake()
        .assert()
        .code(2)
        .stderr(predicate::str::contains("Usage:"));
}

#[test]
fn test_help_lists_underscore_flags() {
    amibake()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--base_ami"))
        .stdout(predicate::str::contains("--security_group"))
        .stdout(predicate::str::contains("--volume_size"))
        .stdout(predicate::str::contains("--probe_attempts"));
}

#[test]
fn test_version_flag_shows_name() {
    amibake()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("amibake"));
}

// --- Usage errors ---

#[test]
fn test_missing_required_flag_exits_two() {
    amibake()
        .args(["--base_ami", "ami-0001", "--region", "us-east-1"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("--ami_name"));
}

#[test]
fn test_zero_probe_attempts_is_usage_error() {
    let mut args = required_args("/nonexistent.pem");
    args.extend(["--probe_attempts".to_string(), "0".to_string()]);
    amibake().args(&args).assert().code(2);
}

#[test]
fn test_non_numeric_volume_size_is_usage_error() {
    let mut args = required_args("/nonexistent.pem");
    args.extend(["--volume_size".to_string(), "big".to_string()]);
    amibake().args(&args).assert().code(2);
}

#[test]
fn test_probe_interval_above_one_day_is_usage_error() {
    let mut args = required_args("/nonexistent.pem");
    args.extend(["--probe_interval".to_string(), "86401".to_string()]);
    amibake().args(&args).assert().code(2);
}

// --- Preconditions fail before any provider call ---

#[test]
fn test_missing_key_file_exits_one_with_message() {
    amibake()
        .args(required_args("/nonexistent/builder.pem"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("Error:"))
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_kebab_case_aliases_are_accepted() {
    amibake()
        .args([
            "--base-ami",
            "ami-0001",
            "--ami-name",
            "my-image",
            "--region",
            "us-east-1",
            "--subnet-id",
            "subnet-1",
            "--security-group",
            "sg-1",
            "--key-name",
            "builder",
            "--key-path",
            "/nonexistent/builder.pem",
        ])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_missing_script_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let key = dir.path().join("builder.pem");
    std::fs::write(&key, "key").expect("write key");
    let mut args = required_args(key.to_str().expect("utf-8 path"));
    args.extend([
        "--script".to_string(),
        dir.path().join("absent.sh").display().to_string(),
    ]);

    amibake()
        .args(&args)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("provisioning script"));
}

#[test]
fn test_invalid_ami_id_exits_one() {
    let dir = TempDir::new().expect("tempdir");
    let key = dir.path().join("builder.pem");
    std::fs::write(&key, "key").expect("write key");
    let mut args = required_args(key.to_str().expect("utf-8 path"));
    args[1] = "not-an-ami".to_string();

    amibake()
        .args(&args)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("not-an-ami"));
}

// --- NO_COLOR ---

#[test]
fn test_no_color_env_values_do_not_change_exit_code() {
    for value in ["1", "yes", "0", ""] {
        amibake()
            .env("NO_COLOR", value)
            .args(required_args("/nonexistent/builder.pem"))
            .assert()
            .code(1)
            .stderr(predicate::str::contains("does not exist"));
    }
}

#[test]
fn test_runs_without_no_color_env() {
    amibake()
        .env_remove("NO_COLOR")
        .args(required_args("/nonexistent/builder.pem"))
        .assert()
        .code(1)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains("does not exist"));
}

#[test]
fn test_no_color_flag_is_accepted() {
    amibake()
        .env_remove("NO_COLOR")
        .arg("--no-color")
        .args(required_args("/nonexistent/builder.pem"))
        .assert()
        .code(1);
}

// --- JSON output ---

#[test]
fn test_json_error_object_on_stdout() {
    let mut args = required_args("/nonexistent/builder.pem");
    args.push("--json".to_string());

    let output = amibake().args(&args).output().expect("run");

    assert_eq!(output.status.code(), Some(1));
    let v: serde_json::Value = serde_json::from_slice(&output.stdout).expect("valid JSON");
    assert_eq!(v["error"], true);
    assert_eq!(v["code"], "precondition");
    assert!(
        v["message"]
            .as_str()
            .is_some_and(|m| m.contains("does not exist"))
    );
}
