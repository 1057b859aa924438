use predicates::prelude::*;
use assert_cmd::Command;

fn bf() -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("BF_CONFIG", "/nonexistent/bf-test/bf.toml");
    cmd
}

#[test]
fn bare_valid_program_outputs_expected_stdout_and_no_prompts() {
    bf().write_stdin("+++.")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("\u{3}"))
        .stderr(predicate::str::is_empty());
}

#[test]
fn bare_invalid_program_prints_concise_error_and_exits_clean() {
    bf().write_stdin("+]")
        .assert()
        .success()
        .stderr(predicate::str::contains("Parse error").and(predicate::str::contains("unmatched")));
}

#[test]
fn bare_unmatched_open_bracket_on_zero_cell() {
    bf().write_stdin("[")
        .assert()
        .success()
        .stderr(predicate::str::contains("unmatched bracket '['"));
}

#[test]
fn bare_comments_are_ignored() {
    bf().write_stdin("add three ++ +\nthen print .\n")
        .assert()
        .success()
        .stdout("\u{3}\n")
        .stderr(predicate::str::is_empty());
}
