//! Integration tests for Insure CLI commands

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn seed_data_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../data")
}

fn insure() -> Command {
    let mut cmd = Command::cargo_bin("insure").unwrap();
    cmd.env("NO_COLOR", "1");
    cmd
}

const PRODUCTS: &str = r#"[
  {
    "id": "prod_home",
    "name": "Home Cover",
    "category": "home",
    "description": "Buildings and contents",
    "basePrice": 300,
    "createdAt": "2024-01-01T00:00:00Z"
  }
]"#;

/// Write a data directory with the given policies file and one product
fn data_dir_with(policies: &str) -> TempDir {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("products.json"), PRODUCTS).unwrap();
    fs::write(dir.path().join("policies.json"), policies).unwrap();
    dir
}

/// Test the version command
#[test]
fn test_cli_version() {
    insure()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("insure"));
}

/// Test the help command
#[test]
fn test_cli_help() {
    insure()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Commands:"))
        .stdout(predicate::str::contains("check"))
        .stdout(predicate::str::contains("show"))
        .stdout(predicate::str::contains("search"))
        .stdout(predicate::str::contains("keys"))
        .stdout(predicate::str::contains("next-id"));
}

/// The shipped seed data is consistent
#[test]
fn test_check_seed_data() {
    insure()
        .arg("check")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Policies: 10"))
        .stdout(predicate::str::contains("Data is consistent"));
}

/// Check fails on dangling products and duplicate ids
#[test]
fn test_check_reports_problems() {
    let dir = data_dir_with(
        r#"[
  {"id": "pol_001", "productId": "prod_home", "customerName": "Ann Lee",
   "startDate": "2025-01-01", "endDate": "2026-01-01", "premium": 100,
   "status": "active", "createdAt": "2024-12-01T00:00:00Z"},
  {"id": "pol_001", "productId": "prod_boat", "customerName": "Ben Ray",
   "startDate": "2025-01-01", "endDate": "2026-01-01", "premium": 100,
   "status": "active", "createdAt": "2024-12-01T00:00:00Z"}
]"#,
    );

    insure()
        .arg("check")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stdout(predicate::str::contains("duplicate policy id"))
        .stdout(predicate::str::contains("product prod_boat not found"));
}

/// Check fails on a malformed data file
#[test]
fn test_check_malformed_file() {
    let dir = data_dir_with("{ not json");

    insure()
        .arg("check")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to load data"));
}

/// Show prints the joined product
#[test]
fn test_show_policy() {
    insure()
        .arg("show")
        .arg("pol_001")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("Hannah Davis"))
        .stdout(predicate::str::contains("prod_home"));
}

/// Show with JSON output
#[test]
fn test_show_policy_json() {
    let output = insure()
        .arg("show")
        .arg("pol_003")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .arg("--format")
        .arg("json")
        .output()
        .unwrap();
    assert!(output.status.success());

    let body: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(body["id"], "pol_003");
    assert_eq!(body["product"]["id"], "prod_pet");
}

/// Show fails for an unknown id
#[test]
fn test_show_unknown_policy() {
    insure()
        .arg("show")
        .arg("pol_999")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Policy with ID pol_999 not found"));
}

/// Search is case-insensitive
#[test]
fn test_search() {
    insure()
        .arg("search")
        .arg("HANNAH")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .success()
        .stdout(predicate::str::contains("2 match(es)"))
        .stdout(predicate::str::contains("pol_001"))
        .stdout(predicate::str::contains("pol_004"));
}

/// Search without matches prints an empty JSON array
#[test]
fn test_search_no_match_json() {
    insure()
        .arg("search")
        .arg("Nobody")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .arg("--format")
        .arg("json")
        .assert()
        .success()
        .stdout(predicate::str::contains("[]"));
}

/// Keys lists all compiled-in keys with their status
#[test]
fn test_keys() {
    insure()
        .arg("keys")
        .assert()
        .success()
        .stdout(predicate::str::contains("RW50ZXIgdGhlIHRleHQgdG8gQmFzZTY0IEVuY29kZQm"))
        .stdout(predicate::str::contains("inactive"))
        .stdout(predicate::str::contains("expired"));
}

/// Keys in JSON carry permissions
#[test]
fn test_keys_json() {
    let output = insure().arg("keys").arg("--format").arg("json").output().unwrap();
    assert!(output.status.success());

    let rows: Vec<serde_json::Value> = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(rows.len(), 4);
    assert!(rows
        .iter()
        .any(|r| r["status"] == "active" && r["permissions"] == serde_json::json!(["read"])));
}

/// Next id follows the highest existing id
#[test]
fn test_next_id() {
    insure()
        .arg("next-id")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .success()
        .stdout(predicate::str::diff("pol_011\n"));
}

/// Next id on an empty data directory starts at one
#[test]
fn test_next_id_empty_dir() {
    let dir = TempDir::new().unwrap();

    insure()
        .arg("next-id")
        .arg("--data-dir")
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::diff("pol_001\n"));
}

/// Verbose flag is accepted
#[test]
fn test_verbose() {
    insure()
        .arg("--verbose")
        .arg("next-id")
        .arg("--data-dir")
        .arg(seed_data_dir())
        .assert()
        .success();
}
