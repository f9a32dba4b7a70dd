//! Basic CLI smoke tests.
//!
//! Tests invoke CLI commands via cargo run and verify outputs.

use std::process::Command;

/// Run a CLI command and return output.
fn run_cli(args: &[&str]) -> (String, String, i32) {
    let output = Command::new("cargo")
        .args(["run", "-p", "flowday-cli", "--"])
        .args(args)
        .output()
        .expect("Failed to execute CLI command");

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();
    let code = output.status.code().unwrap_or(-1);

    (stdout, stderr, code)
}

#[test]
fn help_lists_the_command_areas() {
    let (stdout, _stderr, code) = run_cli(&["--help"]);
    assert_eq!(code, 0, "help failed");
    for area in ["plan", "habit", "coach", "review", "seed"] {
        assert!(stdout.contains(area), "help missing '{area}' area");
    }
}

#[test]
fn plan_help_shows_item_tracking() {
    let (stdout, _stderr, code) = run_cli(&["plan", "--help"]);
    assert_eq!(code, 0, "plan help failed");
    assert!(stdout.contains("complete"));
    assert!(stdout.contains("skip"));
}

#[test]
fn unknown_subcommand_fails() {
    let (_stdout, _stderr, code) = run_cli(&["frobnicate"]);
    assert_ne!(code, 0);
}
