use std::env;
use std::io::{self, Write};

use bf_engine::commands::{repl::ReplArgs, run::RunArgs};
use bf_engine::config::Preferences;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run  [OPTIONS] "<code>"       # Run Brainfuck code (args are concatenated)
  {0} run  [OPTIONS] --file <PATH>  # Run Brainfuck code loaded from file
  {0} repl [--bare|--editor]        # Start a REPL; memory carries over between executions
  {0}                               # Same as `{0} repl`

Environment:
  BF_CONFIG       Preferences file (default: bf.toml in the XDG config home)
  BF_LOG          Log filter for diagnostics on stderr (default: warn)
  BF_TIMEOUT_MS   Wall-clock limit per execution
  BF_MAX_STEPS    Step limit per execution

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Repl(ReplArgs),
}

fn init_logging() {
    // Diagnostics only; program output and errors never go through here.
    let _ = tracing_subscriber::registry()
        .with(EnvFilter::try_from_env("BF_LOG").unwrap_or_else(|_| "warn".into()))
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .try_init();
}

fn main() {
    init_logging();

    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let prefs = Preferences::load();

    let code = match cli.command {
        Some(Command::Run(args)) => bf_engine::commands::run::run(&program, args, &prefs),
        Some(Command::Repl(args)) => bf_engine::commands::repl::run(&program, args, prefs),
        None => bf_engine::commands::repl::run(&program, ReplArgs::default(), prefs),
    };

    std::process::exit(code);
}
