//! CLI integration tests for mssql-snapshot.
//!
//! These tests cover argument parsing, help output, offline archive
//! verification and exit codes. None of them needs a running server.

use assert_cmd::Command;
use flate2::write::GzEncoder;
use flate2::Compression;
use predicates::prelude::*;
use serde_json::json;
use std::io::Write;
use std::path::Path;
use tempfile::TempDir;

/// Get a command for the mssql-snapshot binary.
fn cmd() -> Command {
    Command::cargo_bin("mssql-snapshot").unwrap()
}

fn connection_args() -> [&'static str; 8] {
    [
        "--server",
        "localhost",
        "--database",
        "Sales",
        "--username",
        "sa",
        "--password",
        "secret",
    ]
}

fn write_archive(path: &Path, document: &serde_json::Value) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = GzEncoder::new(file, Compression::default());
    encoder
        .write_all(serde_json::to_vec(document).unwrap().as_slice())
        .unwrap();
    encoder.finish().unwrap();
}

fn sample_document() -> serde_json::Value {
    json!({
        "metadata": {
            "export_date": "2024-03-01T10:30:00",
            "sql_server_version": "Microsoft SQL Server 2019 (RTM)\nCopyright (C) 2019",
            "database_name": "Sales",
            "collation": "SQL_Latin1_General_CP1_CI_AS",
            "version": "1.0-SQLSERVER",
            "total_tables": 2,
            "total_records": 3
        },
        "schemas": {},
        "tables": {
            "dbo.Customers": {
                "schema_name": "dbo",
                "table_name": "Customers",
                "row_count": 2
            },
            "dbo.Orders": {
                "schema_name": "dbo",
                "table_name": "Orders",
                "row_count": 1
            }
        },
        "data": {
            "dbo.Customers": [{"Id": 1, "Name": "Ana"}, {"Id": 2, "Name": "Luis"}],
            "dbo.Orders": [{"Id": 10, "CustomerId": 1, "Total": "12.5000"}]
        },
        "stored_procedures": {"dbo.GetOrders": "CREATE PROCEDURE dbo.GetOrders AS SELECT 1"},
        "functions": {},
        "views": {},
        "triggers": {},
        "indexes": {},
        "constraints": {},
        "table_order": ["dbo.Customers", "dbo.Orders"]
    })
}

// =============================================================================
// Help and Version Tests
// =============================================================================

#[test]
fn test_help_lists_operations_and_connection_flags() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--export"))
        .stdout(predicate::str::contains("--import"))
        .stdout(predicate::str::contains("--verify"))
        .stdout(predicate::str::contains("--server"))
        .stdout(predicate::str::contains("--backup-file"))
        .stdout(predicate::str::contains("--force"));
}

#[test]
fn test_short_help_flag() {
    cmd()
        .arg("-h")
        .assert()
        .success()
        .stdout(predicate::str::contains("--export"));
}

#[test]
fn test_version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("mssql-snapshot"));
}

// =============================================================================
// Argument Errors
// =============================================================================

#[test]
fn test_missing_operation_fails() {
    cmd().assert().failure().code(1);
}

#[test]
fn test_conflicting_operations_fail() {
    cmd().args(["--export", "--verify"]).assert().failure().code(1);
}

#[test]
fn test_unknown_flag_fails() {
    cmd()
        .args(["--verify", "--no-such-flag"])
        .assert()
        .failure()
        .code(1);
}

#[test]
fn test_export_without_connection_details_fails() {
    cmd()
        .args(["--export", "--force"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("server is required"));
}

#[test]
fn test_import_requires_backup_file() {
    cmd()
        .arg("--import")
        .args(connection_args())
        .arg("--force")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--backup-file"));
}

#[test]
fn test_import_with_missing_archive_fails() {
    cmd()
        .arg("--import")
        .args(connection_args())
        .args(["--backup-file", "/nonexistent/backup.gz", "--force"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("backup file not found"));
}

#[test]
fn test_missing_config_file_fails() {
    cmd()
        .args(["--export", "--config", "/nonexistent/source.yaml", "--force"])
        .assert()
        .failure()
        .code(1);
}

// =============================================================================
// Verify
// =============================================================================

#[test]
fn test_verify_requires_backup_file() {
    cmd()
        .arg("--verify")
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("--backup-file"));
}

#[test]
fn test_verify_prints_archive_summary() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup.gz");
    write_archive(&path, &sample_document());

    cmd()
        .args(["--verify", "--backup-file", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Database:"))
        .stdout(predicate::str::contains("Sales"))
        .stdout(predicate::str::contains("Microsoft SQL Server 2019 (RTM)"))
        .stdout(predicate::str::contains("Copyright").not());
}

#[test]
fn test_verify_json_output() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup.gz");
    write_archive(&path, &sample_document());

    let output = cmd()
        .args(["--verify", "--output-json", "--backup-file", path.to_str().unwrap()])
        .output()
        .unwrap();

    assert!(output.status.success());
    let report: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(report["database_name"], "Sales");
    assert_eq!(report["tables"], 2);
    assert_eq!(report["total_records"], 3);
    assert_eq!(report["procedures"], 1);
}

#[test]
fn test_verify_reports_inconsistent_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup.gz");
    let mut document = sample_document();
    document["tables"]["dbo.Orders"]["row_count"] = json!(5);
    write_archive(&path, &document);

    cmd()
        .args(["--verify", "--backup-file", path.to_str().unwrap()])
        .assert()
        .success()
        .stdout(predicate::str::contains("Warning:"));
}

#[test]
fn test_verify_rejects_corrupt_archive() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("backup.gz");
    std::fs::write(&path, b"this is not gzip").unwrap();

    cmd()
        .args(["--verify", "--backup-file", path.to_str().unwrap()])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn test_verify_missing_archive_fails() {
    cmd()
        .args(["--verify", "--backup-file", "/nonexistent/backup.gz"])
        .assert()
        .failure()
        .code(1);
}
