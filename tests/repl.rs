
// Utilities
fn make_cmd() -> assert_cmd::Command {
    let mut cmd = assert_cmd::Command::cargo_bin("bf").expect("bf binary");
    cmd.env("BF_CONFIG", "/nonexistent/bf-test/bf.toml");
    cmd
}

fn print_a() -> String {
    // 65 '+' then '.'
    format!("{}.", "+".repeat(65))
}

#[test]
fn repl_initial_prompt_appears() {
    let mut cmd = make_cmd();
    // In non-TTY (piped) stdin, REPL auto-selects bare mode and prints no prompt.
    cmd.write_stdin("")
        .assert()
        .success()
        .stdout(predicates::str::is_empty())
        .stderr(predicates::str::is_empty());
}

#[test]
fn repl_valid_program_then_eof_outputs_and_exits() {
    let mut cmd = make_cmd();

    cmd.env("BF_REPL_ONCE", "1")
        .write_stdin(print_a())
        .assert()
        .success()
        // In bare mode, only program output goes to stdout
        .stdout("A\n")
        .stderr(predicates::str::is_empty());
}

#[test]
fn repl_once_stops_after_first_execution() {
    let mut cmd = make_cmd();

    cmd.env("BF_REPL_ONCE", "1")
        .write_stdin(format!("{}\n:run\n.\n", print_a()))
        .assert()
        .success()
        .stdout("A\n");
}

#[test]
fn repl_invalid_program_reports_error_and_exits() {
    let mut cmd = make_cmd();

    cmd.env("BF_REPL_ONCE", "1")
        .write_stdin("+]") // `]` on a nonzero cell with no open loop
        .assert()
        .success() // exits cleanly in our bare-mode pipeline when stdin closes
        .stderr(predicates::str::contains("Parse error: unmatched bracket ']'"))
        // REPL prints a trailing newline on stdout after each execution for readability
        .stdout("\n");
}

#[test]
fn repl_timeout_flag_aborts_infinite_loop() {
    let mut cmd = make_cmd();

    cmd.args(["repl", "--bare", "--timeout", "100"])
        .env_remove("BF_MAX_STEPS")
        .timeout(std::time::Duration::from_secs(5))
        .write_stdin("+[]")
        .assert()
        .success()
        .stderr(predicates::str::contains(
            "Execution aborted: wall-clock timeout exceeded (100 ms)",
        ));
}

#[test]
fn repl_non_persistent_state_across_runs() {
    // Run 1
    let mut cmd1 = make_cmd();
    let assert1 = cmd1
        .env("BF_REPL_ONCE", "1")
        .write_stdin(print_a())
        .assert()
        .success();
    let out1 = String::from_utf8(assert1.get_output().stdout.clone()).expect("utf8");

    // Run 2 (fresh process): memory lives only as long as the REPL does
    let mut cmd2 = make_cmd();
    let assert2 = cmd2
        .env("BF_REPL_ONCE", "1")
        .write_stdin(print_a())
        .assert()
        .success();
    let out2 = String::from_utf8(assert2.get_output().stdout.clone()).expect("utf8");

    assert_eq!(out1, "A\n");
    assert_eq!(out1, out2, "stdout should be identical across processes");
}
