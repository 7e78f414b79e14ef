//! Binary smoke tests using assert_cmd.
//!
//! The probe is pointed at a closed local port so no test reaches the
//! real exchange.

use assert_cmd::Command;
use predicates::prelude::*;

fn cmd() -> Command {
    Command::cargo_bin("binance-probe").unwrap()
}

#[test]
fn help_flag() {
    cmd()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Binance"))
        .stdout(predicate::str::contains("BINANCE_PROBE_BASE_URL"));
}

#[test]
fn version_flag() {
    cmd()
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("binance-probe"));
}

#[test]
fn unknown_flag_is_rejected() {
    cmd()
        .arg("--retries")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unexpected argument"));
}

#[test]
fn unreachable_host_exits_with_failure() {
    cmd()
        .env("BINANCE_PROBE_BASE_URL", "http://127.0.0.1:9")
        .assert()
        .code(1)
        .stdout(predicate::str::contains("Testing Binance API Access"))
        .stdout(predicate::str::contains("Failed to connect"))
        .stdout(predicate::str::contains("Test 2").not());
}
