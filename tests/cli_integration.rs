//! Integration tests for the VaultKeep CLI.
//!
//! These tests exercise the binary end-to-end using `assert_cmd`.
//! No secret store is running, so we focus on argument handling and on
//! the failures that must happen before any network call.

use assert_cmd::Command;
use assert_fs::prelude::*;
use assert_fs::TempDir;
use predicates::prelude::*;

/// Helper: get a Command pointing at the vaultkeep binary, with the
/// caller's store credentials cleared.
fn vaultkeep() -> Command {
    #[allow(deprecated)]
    let mut cmd = Command::cargo_bin("vaultkeep").expect("binary should exist");
    cmd.env_remove("VAULT_ADDR")
        .env_remove("VAULT_TOKEN")
        .env_remove("VAULT_NAMESPACE")
        .env_remove("VAULTKEEP_ENCRYPTION_KEY");
    cmd
}

#[test]
fn help_flag_shows_usage() {
    vaultkeep()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Backup and restore"))
        .stdout(predicate::str::contains("backup"))
        .stdout(predicate::str::contains("restore"))
        .stdout(predicate::str::contains("completions"));
}

#[test]
fn version_flag_shows_version() {
    vaultkeep()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultkeep"));
}

#[test]
fn no_args_shows_help() {
    vaultkeep()
        .assert()
        .failure()
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn backup_help_lists_options() {
    vaultkeep()
        .args(["backup", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--mount-point"))
        .stdout(predicate::str::contains("--path"))
        .stdout(predicate::str::contains("--encryption-key"))
        .stdout(predicate::str::contains("--format"));
}

#[test]
fn restore_help_lists_dry_run() {
    vaultkeep()
        .args(["restore", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--dry-run"));
}

#[test]
fn path_requires_mount_point() {
    vaultkeep()
        .args(["backup", "--path", "app1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--mount-point"));
}

#[test]
fn backup_without_token_fails() {
    let tmp = TempDir::new().unwrap();

    vaultkeep()
        .arg("backup")
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("token"));

    tmp.child("vault_backup.json").assert(predicate::path::missing());
}

#[test]
fn backup_to_unreachable_store_fails() {
    let tmp = TempDir::new().unwrap();

    vaultkeep()
        .args(["--address", "http://127.0.0.1:1", "--token", "root", "backup"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to connect"));

    tmp.child("vault_backup.json").assert(predicate::path::missing());
}

#[test]
fn restore_missing_file_fails() {
    let tmp = TempDir::new().unwrap();

    vaultkeep()
        .args(["--token", "root", "restore", "--filename", "nope"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Backup file not found"));
}

#[test]
fn restore_encrypted_file_without_key_hints_at_key() {
    let tmp = TempDir::new().unwrap();
    tmp.child("vault_backup.json")
        .write_str("c29tZSBvcGFxdWUgYnl0ZXM=")
        .unwrap();

    vaultkeep()
        .args(["--token", "root", "restore"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("--encryption-key"));
}

#[test]
fn restore_with_wrong_key_fails() {
    let tmp = TempDir::new().unwrap();
    tmp.child("vault_backup.json").write_str("{}").unwrap();

    vaultkeep()
        .args(["--token", "root", "restore", "--encryption-key", "mysecretkey"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Decryption failed"));
}

#[test]
fn config_file_format_is_used() {
    let tmp = TempDir::new().unwrap();
    tmp.child(".vaultkeep.toml")
        .write_str("format = \"yaml\"\nfilename = \"nightly\"\n")
        .unwrap();

    vaultkeep()
        .args(["--token", "root", "restore"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("nightly.yaml"));
}

#[test]
fn unknown_format_is_rejected() {
    let tmp = TempDir::new().unwrap();

    vaultkeep()
        .args(["restore", "--format", "xml"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown backup format"));
}

#[test]
fn completions_bash_generates_script() {
    vaultkeep()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("vaultkeep"))
        .stdout(predicate::str::contains("--mount-point"));
}

#[test]
fn completions_unknown_shell_fails() {
    vaultkeep()
        .args(["completions", "tcsh"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid value"))
        .stderr(predicate::str::contains("bash"));
}
