use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn help_describes_the_launcher() {
    Command::cargo_bin("dasklaunch")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("work module"))
        .stdout(predicate::str::contains("--rendezvous"));
}

#[test]
fn missing_module_fails_before_launching_anything() {
    Command::cargo_bin("dasklaunch")
        .unwrap()
        .assert()
        .failure()
        .stderr(predicate::str::contains("work module must be specified"));
}

#[test]
fn unknown_module_is_rejected() {
    Command::cargo_bin("dasklaunch")
        .unwrap()
        .args(["--module", "no-such-module"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown work module"));
}

#[test]
fn zero_scheduler_port_is_rejected() {
    Command::cargo_bin("dasklaunch")
        .unwrap()
        .args(["--module", "hello", "--sched-port", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("non-zero"));
}

#[test]
fn nonexistent_config_file_is_reported() {
    Command::cargo_bin("dasklaunch")
        .unwrap()
        .args(["--module", "hello", "--config", "/no/such/file.toml"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load config"));
}
