use predicates::prelude::*;
use assert_cmd::Command;
use std::fs;

fn bf_with_config(path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("bf").unwrap();
    cmd.env("BF_CONFIG", path).env_remove("BF_REPL_ONCE");
    cmd
}

fn bf() -> Command {
    bf_with_config(std::path::Path::new("/nonexistent/bf-test/bf.toml"))
}

#[test]
fn meta_exit_exits_code_0_and_no_stdout() {
    bf().write_stdin(":exit\n")
        .assert()
        .code(0)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());
}

#[test]
fn meta_exit_discards_code_entered_before_it() {
    bf().write_stdin("+++.\n:exit\n+.\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}

#[test]
fn meta_help_prints_to_stderr_not_stdout() {
    bf().write_stdin(":help\n:exit\n")
        .assert()
        .success()
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::contains(":reset").and(predicate::str::contains(":input TEXT")));
}

#[test]
fn meta_run_keeps_memory_for_the_next_execution() {
    bf().write_stdin("+++\n:run\n+.\n")
        .assert()
        .success()
        .stdout("\n\u{4}\n");
}

#[test]
fn meta_reset_clears_memory() {
    bf().write_stdin("+++\n:reset\n+.\n")
        .assert()
        .success()
        .stdout("\n\u{1}\n");
}

#[test]
fn meta_input_feeds_following_runs() {
    bf().write_stdin(":input ab\n,.,.,.\n")
        .assert()
        .success()
        .stdout("abb\n");
}

#[test]
fn meta_mem_prints_memory_view_to_stderr() {
    bf().write_stdin(">+++++\n:mem\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("[  5]").and(predicate::str::contains("ptr=1 cell=5")));
}

#[test]
fn failed_run_keeps_previous_memory() {
    bf().write_stdin("++\n:run\n+++]\n:run\n.\n")
        .assert()
        .success()
        .stdout(predicate::str::ends_with("\u{2}\n"))
        .stderr(predicate::str::contains("unmatched bracket ']'"));
}

#[test]
fn unknown_meta_command_is_reported() {
    bf().write_stdin(":frobnicate\n+.\n")
        .assert()
        .success()
        .stdout("\u{1}\n")
        .stderr(predicate::str::contains("unknown meta command ':frobnicate'"));
}

#[test]
fn meta_dark_is_saved_to_preferences() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("bf.toml");

    bf_with_config(&path)
        .write_stdin(":dark\n")
        .assert()
        .success()
        .stderr(predicate::str::is_empty());
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("dark_mode = true"), "got: {saved}");

    bf_with_config(&path)
        .write_stdin(":light\n")
        .assert()
        .success();
    let saved = fs::read_to_string(&path).unwrap();
    assert!(saved.contains("dark_mode = false"), "got: {saved}");
}
