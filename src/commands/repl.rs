use std::io::{self, IsTerminal, Write};

use clap::Args;
use tracing::debug;

use crate::budget::RunLimits;
use crate::config::Preferences;
use crate::repl::{execute_bare_once, repl_loop, select_mode, ModeFlagOverride, ReplMode, ReplState, META_HELP};

#[derive(Args, Debug, Default)]
#[command(disable_help_flag = true)]
pub struct ReplArgs {
    /// Read all of stdin as one submission, without a line editor
    #[arg(long = "bare", conflicts_with = "editor")]
    pub bare: bool,

    /// Require the line editor; fails when stdin is not a terminal
    #[arg(long = "editor", conflicts_with = "bare")]
    pub editor: bool,

    /// Per-execution wall-clock limit in milliseconds
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Per-execution step limit
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

impl ReplArgs {
    fn mode_flag(&self) -> ModeFlagOverride {
        if self.bare {
            ModeFlagOverride::Bare
        } else if self.editor {
            ModeFlagOverride::Editor
        } else {
            ModeFlagOverride::None
        }
    }
}

/// `bf repl` (and bare `bf`). Returns the process exit code.
pub fn run(program: &str, args: ReplArgs, prefs: Preferences) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let fail = |msg: String| {
        eprintln!("{program}: {msg}");
        let _ = io::stderr().flush();
        1
    };

    let mode = match select_mode(args.mode_flag()) {
        Ok(mode) => mode,
        Err(msg) => return fail(msg),
    };

    // Ctrl+C leaves the session at once; pending output is flushed first.
    if let Err(e) = ctrlc::set_handler(|| {
        let _ = io::stdout().flush();
        let _ = io::stderr().flush();
        std::process::exit(0);
    }) {
        return fail(format!("failed to set ctrl+c handler: {e}"));
    }

    let limits = RunLimits::resolve(args.timeout_ms, args.max_steps, &prefs.limits);
    let mut state = ReplState::new(prefs, limits);
    debug!(?mode, "starting repl");

    let outcome = match mode {
        ReplMode::Editor => {
            if io::stderr().is_terminal() {
                eprintln!("bf repl: Enter adds a line, Ctrl+D (Ctrl+Z then Enter on Windows) runs the buffer.");
                eprintln!("The tape is kept between runs. :help lists meta commands, Ctrl+C quits.");
                let _ = io::stderr().flush();
            }
            repl_loop(&mut state)
        }
        ReplMode::Bare => execute_bare_once(&mut state),
    };

    match outcome {
        Ok(()) => 0,
        Err(e) => fail(format!("REPL error: {e}")),
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} repl [--bare|--editor] [--timeout <MS>] [--max-steps <N>]

Options:
  --bare              Read stdin to EOF and process it once (no line editor)
  --editor            Use the line editor; stdin must be a terminal
  --timeout <MS>      Wall-clock limit per execution (fallback BF_TIMEOUT_MS; default 2000)
  --max-steps <N>     Step limit per execution (fallback BF_MAX_STEPS; default unlimited)
  --help,   -h        Show this help

Each execution starts from the tape and pointer the previous one left.
An execution that fails is discarded and the tape stays as it was.

{1}
Mode:
  --bare / --editor win over BF_REPL_MODE=bare|editor, which wins over
  auto-detection: a terminal on stdin gets the editor, anything else bare mode.
  Banners are only printed when stderr is a terminal.

Keys (editor mode):
  Enter               New line
  Ctrl+D              Run the buffer (Ctrl+Z then Enter on Windows)
  Ctrl+C              Quit

Text other than the eight instructions is ignored. Output is followed by a
newline after every execution. BF_REPL_ONCE=1 stops after the first execution.
"#,
        program, META_HELP
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
