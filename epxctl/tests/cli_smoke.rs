//! CLI tests for `epxctl` against a generated results tree.
//!
//! Spawns the binary and verifies output and exit codes for the read-only
//! subcommands.

use std::process::Command;

use epxres::test_support::ResultsFixture;

fn epxctl(fixture: &ResultsFixture) -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_epxctl"));
    cmd.env("EPX_RESULTS", fixture.root());
    cmd.env_remove("EPX_HOME");
    cmd
}

#[test]
fn jobs_lists_key_id_pairs() {
    let fixture = ResultsFixture::create();
    fixture.add_job("measles", 2, &[1]);

    let output = epxctl(&fixture).arg("jobs").output().expect("run epxctl");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "simpleflu 1\nmeasles 2\n");
}

#[test]
fn runs_lists_run_ids_for_a_key() {
    let fixture = ResultsFixture::create();

    let output = epxctl(&fixture)
        .args(["runs", "--job-key", "simpleflu"])
        .output()
        .expect("run epxctl");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(stdout, "1\n2\n3\n");
}

#[test]
fn variable_prints_run_columns_as_csv() {
    let fixture = ResultsFixture::create();

    let output = epxctl(&fixture)
        .args(["variable", "Infected", "--job-id", "1"])
        .output()
        .expect("run epxctl");
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.starts_with("RUN1,RUN2,RUN3\n"));
}

#[test]
fn unknown_key_fails_with_diagnostic() {
    let fixture = ResultsFixture::create();

    let output = epxctl(&fixture)
        .args(["status", "--job-key", "nonexistent"])
        .output()
        .expect("run epxctl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("nonexistent"));
}
