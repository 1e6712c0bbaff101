//! Binary-level tests for `erucli`.

use assert_cmd::Command;
use predicates::prelude::*;

fn erucli() -> Command {
    let mut cmd = Command::cargo_bin("erucli").expect("binary built");
    cmd.env_remove("ERU_ADDRESS")
        .env_remove("ERU_TIMEOUT")
        .env_remove("ERU_DEBUG")
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn help_lists_commands() {
    erucli()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("exec"))
        .stdout(predicate::str::contains("lambda"));
}

#[test]
fn invalid_address_exits_with_transport_failure() {
    erucli()
        .args(["-a", "http://core:5001", "exec", "c0ffee"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("invalid gateway URL"));
}

#[test]
fn address_read_from_environment() {
    erucli()
        .env("ERU_ADDRESS", "tcp://core:5001")
        .args(["exec", "c0ffee"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("tcp://core:5001"));
}

#[test]
fn unreachable_service_fails() {
    erucli()
        .args(["-a", "ws://127.0.0.1:1", "--timeout", "2", "exec", "c0ffee"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("Error:"));
}

#[test]
fn lambda_run_requires_image() {
    erucli()
        .args(["lambda", "run", "job"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("--image"));
}

#[test]
fn bad_env_pair_is_rejected() {
    erucli()
        .args(["lambda", "run", "--image", "alpine", "-e", "NOVALUE", "job"])
        .assert()
        .code(255)
        .stderr(predicate::str::contains("KEY=VALUE"));
}
