//! End-to-end tests for the `repo-mirror` binary
//!
//! These tests invoke the actual CLI binary and validate its behavior
//! from a user's perspective. Tests that would reach the network stop at
//! setup failures on purpose.

mod common;
use common::prelude::*;

/// Test that --help flag shows usage information
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_help_shows_usage() {
    let mut cmd = cargo_bin_cmd!("repo-mirror");

    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "keep a grouped local mirror of remote repositories",
        ))
        .stdout(predicate::str::contains("--jobs"));
}

/// Test that --version reports the binary name
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_version_flag() {
    let mut cmd = cargo_bin_cmd!("repo-mirror");

    cmd.arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("repo-mirror"));
}

/// A missing configuration document is the fatal setup failure: non-zero
/// exit and a hint on stderr.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_missing_config_document_fails() {
    let temp = TempDir::new().unwrap();

    let mut cmd = cargo_bin_cmd!("repo-mirror");

    cmd.arg("--root")
        .arg(temp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Configuration document not found"))
        .stderr(predicate::str::contains("hint:"));
}

/// An unknown --group selection fails before any remote work starts.
#[test]
#[cfg_attr(not(feature = "integration-tests"), ignore)]
fn test_unknown_group_selection_fails() {
    let fixture = TestFixture::new().with_config(configs::TWO_GROUPS);

    let mut cmd = cargo_bin_cmd!("repo-mirror");

    cmd.arg("--root")
        .arg(fixture.path())
        .arg("--group")
        .arg("does-not-exist")
        .assert()
        .failure()
        .stderr(predicate::str::contains("No group matches"))
        .stderr(predicate::str::contains("Known groups: Tools, Libraries"));
}
