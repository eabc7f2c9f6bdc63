use assert_cmd::prelude::*;
use predicates::prelude::*;
use predicates::str::contains;
use std::process::Command;
use tempfile::tempdir;

#[test]
fn client_help_lists_commands() {
    Command::cargo_bin("academia-client")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(contains("enroll").and(contains("add-course")));
}

#[test]
fn client_rejects_a_bad_address() {
    Command::cargo_bin("academia-client")
        .unwrap()
        .args(&[
            "--addr",
            "not-an-address",
            "--role",
            "student",
            "--user",
            "s1",
            "--password",
            "pass1",
            "list-courses",
        ])
        .assert()
        .failure()
        .stderr(contains("could not parse"));
}

#[test]
fn client_requires_a_role() {
    Command::cargo_bin("academia-client")
        .unwrap()
        .args(&["--user", "s1", "--password", "pass1", "list-courses"])
        .assert()
        .failure();
}

#[test]
fn server_rejects_a_bad_address() {
    let dir = tempdir().unwrap();
    Command::cargo_bin("academia-server")
        .unwrap()
        .args(&["--addr", "nowhere", "--data-dir"])
        .arg(dir.path())
        .assert()
        .failure()
        .stderr(contains("could not parse"));
}

#[test]
fn server_rejects_an_unknown_pool() {
    Command::cargo_bin("academia-server")
        .unwrap()
        .args(&["--pool", "rayon"])
        .assert()
        .failure();
}

#[test]
fn server_version() {
    Command::cargo_bin("academia-server")
        .unwrap()
        .arg("-V")
        .assert()
        .success()
        .stdout(contains(env!("CARGO_PKG_VERSION")));
}
