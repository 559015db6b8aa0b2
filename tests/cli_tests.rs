//! CLI smoke tests through the compiled binary.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn cmd_with_isolated_config(tmp: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("callaudit").unwrap();
    cmd.env(
        "CALLAUDIT_CONFIG_PATH",
        tmp.path().join("config.toml").to_str().unwrap(),
    );
    cmd.env("CALLAUDIT_STORE_PATH", tmp.path().join("learning.db").to_str().unwrap());
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    let mut cmd = Command::cargo_bin("callaudit").unwrap();
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("audit"))
        .stdout(predicate::str::contains("phrases"))
        .stdout(predicate::str::contains("config"));
}

#[test]
fn test_version_flag() {
    let mut cmd = Command::cargo_bin("callaudit").unwrap();
    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_config_get_and_set() {
    let tmp = TempDir::new().unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["config", "get", "semantic.threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.68"));

    cmd_with_isolated_config(&tmp)
        .args(["config", "set", "semantic.threshold", "0.75"])
        .assert()
        .success();

    cmd_with_isolated_config(&tmp)
        .args(["config", "get", "semantic.threshold"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0.75"));
}

#[test]
fn test_config_set_invalid_value_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["config", "set", "batch.account_tier", "platinum"])
        .assert()
        .failure();
}

#[test]
fn test_config_list_shows_sections() {
    let tmp = TempDir::new().unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["config", "list"])
        .assert()
        .success()
        .stdout(predicate::str::contains("[vad]"))
        .stdout(predicate::str::contains("[learning]"));
}

#[test]
fn test_audit_lite_on_empty_folder_succeeds() {
    let tmp = TempDir::new().unwrap();
    let calls = tmp.path().join("calls");
    std::fs::create_dir(&calls).unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["audit", calls.to_str().unwrap(), "--lite", "--quiet"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No supported audio files"));
}

#[test]
fn test_audit_missing_folder_fails() {
    let tmp = TempDir::new().unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["audit", "/definitely/not/a/folder"])
        .assert()
        .failure();
}

#[test]
fn test_audit_rejects_zero_workers() {
    let tmp = TempDir::new().unwrap();
    cmd_with_isolated_config(&tmp)
        .args(["audit", tmp.path().to_str().unwrap(), "--max-workers", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("max-workers"));
}

#[test]
fn test_phrases_stats_on_fresh_store() {
    let tmp = TempDir::new().unwrap();
    let mut cmd = cmd_with_isolated_config(&tmp);
    cmd.env(
        "CALLAUDIT_CONFIG_PATH",
        tmp.path().join("config.toml").to_str().unwrap(),
    );
    // Point the store at the temp dir through the config file
    std::fs::write(
        tmp.path().join("config.toml"),
        format!(
            "[store]\npath = \"{}\"\n",
            tmp.path().join("learning.db").display()
        ),
    )
    .unwrap();
    cmd.args(["phrases", "stats"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Pending queue"));
}

#[test]
fn test_generate_completion_bash() {
    let mut cmd = Command::cargo_bin("callaudit").unwrap();
    cmd.args(["generate-completion", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("callaudit"));
}
