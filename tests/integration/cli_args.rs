//! Binary-level argument handling tests

use assert_cmd::Command;
use predicates::prelude::*;

use uplift::test_utils::FakeCli;

#[test]
fn test_help_lists_commands() {
    Command::cargo_bin("uplift")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(
            predicate::str::contains("upgrade")
                .and(predicate::str::contains("soak"))
                .and(predicate::str::contains("resolve")),
        );
}

#[test]
fn test_version_flag() {
    Command::cargo_bin("uplift")
        .unwrap()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("uplift"));
}

#[test]
fn test_upgrade_requires_task_count() {
    Command::cargo_bin("uplift")
        .unwrap()
        .args(["upgrade", "hello-world"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--tasks"));
}

#[test]
fn test_verbose_quiet_conflict() {
    Command::cargo_bin("uplift")
        .unwrap()
        .args(["--verbose", "--quiet", "resolve", "hello-world"])
        .assert()
        .failure();
}

#[test]
fn test_resolve_prints_served_version() {
    let fake = FakeCli::new();

    Command::cargo_bin("uplift")
        .unwrap()
        .args(["--quiet", "--cli"])
        .arg(fake.bin())
        .args(["resolve", "hello-world"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2.0.0-test"));
}

#[test]
fn test_missing_cli_binary_fails_cleanly() {
    Command::cargo_bin("uplift")
        .unwrap()
        .args(["--quiet", "--cli", "/definitely/not/here/cli", "resolve", "hello-world"])
        .assert()
        .failure();
}
