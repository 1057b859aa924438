use std::fs;
use std::io::{self, IsTerminal, Write};
use std::path::PathBuf;

use clap::{Args, Command, FromArgMatches};
use tracing::debug;

use crate::budget::{run_supervised, RunLimits};
use crate::cli_util::{print_engine_error, print_trace};
use crate::config::Preferences;
use crate::engine::{execute_traced, execute_with_control, Outcome};
use crate::tape::Tape;
use crate::{snapshot, view};

/// Step limit applied to `--debug` runs that have no explicit limit.
const DEBUG_MAX_STEPS: u64 = 100_000;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a step-by-step table of operations before the program output
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Print the memory cells around the pointer to stderr after the run
    #[arg(short = 'm', long = "memory")]
    pub memory: bool,

    /// Show non-printable output bytes as \xHH
    #[arg(long = "escape")]
    pub escape: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Pending input consumed by `,`
    #[arg(short = 'i', long = "input", value_name = "TEXT", conflicts_with = "input_file")]
    pub input: Option<String>,

    /// Read the pending input from PATH
    #[arg(long = "input-file", value_name = "PATH")]
    pub input_file: Option<String>,

    /// Tape snapshot to start from; rewritten after a successful run
    #[arg(long = "state", value_name = "PATH")]
    pub state: Option<PathBuf>,

    /// Wall-clock timeout in milliseconds (fallback BF_TIMEOUT_MS; default 2_000)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback BF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<u64>,

    /// Concatenated Brainfuck code parts; a part may start with `-`
    #[arg(value_name = "code", allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

impl RunArgs {
    /// Code parts accept leading hyphens, so options typed after the code
    /// arrive as code. Move them back to their fields.
    fn with_trailing_options(mut self) -> Result<Self, clap::Error> {
        let (options, code) = split_trailing_options(std::mem::take(&mut self.code));
        self.code = code;
        if options.is_empty() {
            return Ok(self);
        }

        let matches = RunArgs::augment_args(Command::new("run"))
            .try_get_matches_from(std::iter::once(String::from("run")).chain(options))?;
        let late = RunArgs::from_arg_matches(&matches)?;

        Ok(Self {
            debug: self.debug || late.debug,
            memory: self.memory || late.memory,
            escape: self.escape || late.escape,
            file: late.file.or(self.file),
            input: late.input.or(self.input),
            input_file: late.input_file.or(self.input_file),
            state: late.state.or(self.state),
            timeout_ms: late.timeout_ms.or(self.timeout_ms),
            max_steps: late.max_steps.or(self.max_steps),
            code: self.code,
            help: self.help || late.help,
        })
    }
}

/// Split `parts` into option tokens (with their values) and code parts.
fn split_trailing_options(parts: Vec<String>) -> (Vec<String>, Vec<String>) {
    let known: Vec<(String, bool)> = RunArgs::augment_args(Command::new("run"))
        .get_arguments()
        .filter(|arg| !arg.is_positional())
        .flat_map(|arg| {
            let takes_value = arg.get_action().takes_values();
            let long = arg.get_long().map(|l| (format!("--{l}"), takes_value));
            let short = arg.get_short().map(|c| (format!("-{c}"), takes_value));
            long.into_iter().chain(short)
        })
        .collect();

    let (mut options, mut code) = (Vec::new(), Vec::new());
    let mut parts = parts.into_iter();
    while let Some(part) = parts.next() {
        let (name, inline_value) = match part.split_once('=') {
            Some((name, _)) => (name, true),
            None => (part.as_str(), false),
        };
        let Some(takes_value) = known.iter().find(|(flag, _)| flag == name).map(|&(_, t)| t) else {
            code.push(part);
            continue;
        };
        options.push(part);
        if takes_value && !inline_value {
            options.extend(parts.next());
        }
    }
    (options, code)
}

pub fn run(program: &str, args: RunArgs, prefs: &Preferences) -> i32 {
    let args = args.with_trailing_options().unwrap_or_else(|e| e.exit());
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        debug,
        memory,
        escape,
        file,
        input,
        input_file,
        state,
        timeout_ms,
        max_steps,
        code,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if input.is_some() && input_file.is_some() {
        eprintln!("{program}: cannot use --input together with --input-file");
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let code_str = if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("")
    };

    let input_str = match (input, input_file) {
        (Some(text), _) => text,
        (None, Some(path)) => match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read input file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        },
        (None, None) => String::new(),
    };

    let tape = match state.as_deref().map(snapshot::load) {
        None | Some(Ok(None)) => Tape::new(),
        Some(Ok(Some(tape))) => tape,
        Some(Err(e)) => {
            eprintln!("{program}: {e}");
            let _ = io::stderr().flush();
            return 1;
        }
    };

    let mut limits = RunLimits::resolve(timeout_ms, max_steps, &prefs.limits);
    // Every traced step is kept in memory until the run ends.
    if debug && limits.max_steps.is_none() {
        limits.max_steps = Some(DEBUG_MAX_STEPS);
    }

    // Execute on a worker thread with cooperative cancellation
    let (result, trace) = run_supervised(&limits, |ctrl| {
        if debug {
            execute_traced(&code_str, &input_str, tape, Some(ctrl))
        } else {
            (execute_with_control(&code_str, &input_str, tape, Some(ctrl)), Vec::new())
        }
    });

    let stdout = io::stdout();
    let mut out = stdout.lock();
    if debug {
        let _ = print_trace(&mut out, &trace);
    }

    let (outcome, error) = match result {
        Ok(outcome) => (outcome, None),
        Err(failure) => (failure.partial, Some(failure.error)),
    };
    debug!(steps = outcome.steps, failed = error.is_some(), "run finished");

    if escape {
        let _ = write!(out, "{}", view::escape_output(&outcome.output));
    } else {
        let _ = write!(out, "{}", outcome.output);
    }
    let _ = out.flush();

    let mut exit_code = match error {
        None => 0,
        Some(err) if err.is_timeout() => {
            eprintln!("Execution aborted: wall-clock timeout exceeded ({} ms)", limits.timeout_ms);
            1
        }
        Some(err) => {
            print_engine_error(Some(program), &code_str, &err);
            1
        }
    };

    if exit_code == 0 {
        if let Some(path) = state.as_deref() {
            match snapshot::save(path, &outcome.tape) {
                Ok(()) => debug!(path = %path.display(), "snapshot written"),
                Err(e) => {
                    eprintln!("{program}: {e}");
                    exit_code = 1;
                }
            }
        }
    }

    if memory {
        print_memory(&outcome, prefs);
    }

    // For readability, ensure output ends with a newline
    let _ = writeln!(out);
    let _ = out.flush();
    let _ = io::stderr().flush();
    exit_code
}

fn print_memory(outcome: &Outcome, prefs: &Preferences) {
    let palette = io::stderr().is_terminal().then(|| prefs.palette());
    eprintln!(
        "{}",
        view::render_memory(&outcome.tape, prefs.memory_window, palette.as_ref())
    );
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>

Options:
  --file,   -f <PATH>   Read Brainfuck code from PATH instead of positional "<code>"
  --input,  -i <TEXT>   Pending input consumed by `,` (default: none)
  --input-file <PATH>   Read the pending input from PATH
  --state <PATH>        Start from the tape saved in PATH and save the final tape back
  --debug,  -d          Print a step-by-step table of operations (step limit defaults to 100000)
  --memory, -m          Print the memory cells around the pointer to stderr
  --escape              Show non-printable output bytes as \xHH
  --timeout <MS>        Wall-clock timeout (fallback BF_TIMEOUT_MS; default 2000)
  --max-steps <N>       Step limit (fallback BF_MAX_STEPS; default unlimited)
  --help,   -h          Show this help

Notes:
- Options may also follow the code; a code part may start with `-`.
- The tape has 30000 cells and wraps around at both ends; cells wrap modulo 256.
- `,` reads the next character of the pending input; when none is left the cell is unchanged.
- Characters outside of Brainfuck's ><+-.,[] are ignored.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Echo the pending input:
    {0} run --input "hi" ",[.,]"
- Keep memory between invocations:
    {0} run --state tape.toml "+++>"
    {0} run --state tape.toml "+."
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
