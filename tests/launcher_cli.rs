//! Launcher CLI integration tests: flag handling, exit codes, and process
//! replacement.

use assert_cmd::Command;
use predicates::prelude::*;

#[test]
fn test_help_exits_zero() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.arg("--help");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("PROGRAM"));
}

#[test]
fn test_short_help_exits_zero() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.arg("-h");
    cmd.assert().success();
}

#[test]
fn test_version_exits_zero() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.arg("--version");
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("gpudataperf"));
}

#[test]
fn test_no_program_exits_one() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("no program specified to profile"));
}

#[test]
fn test_unknown_flag_exits_one() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.arg("--definitely-not-a-flag");
    cmd.assert().failure().code(1);
}

#[test]
fn test_exec_failure_exits_one() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.arg("/nonexistent/program/path");
    cmd.assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("failed to execute program"));
}

#[test]
fn test_process_replacement_runs_target() {
    // The capture library will not exist next to the test launcher; the
    // dynamic loader warns about the failed preload and runs the target
    // anyway, which is exactly what we need to observe process replacement.
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.args(["/bin/echo", "profiled"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("profiled"));
}

#[test]
fn test_target_flags_are_passed_through() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.args(["/bin/echo", "-n", "no-newline"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("no-newline"));
}

#[test]
fn test_verbose_echoes_environment() {
    let mut cmd = Command::cargo_bin("gpudataperf").unwrap();
    cmd.args(["-v", "/bin/echo", "done"]);
    cmd.assert()
        .success()
        .stderr(predicate::str::contains("LD_PRELOAD"))
        .stderr(predicate::str::contains("info: profiling '/bin/echo done'"));
}
