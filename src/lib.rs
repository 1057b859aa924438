//! A Brainfuck execution engine on a 30,000-cell ring tape.
//!
//! The engine is a pure function of its inputs: a program, the pending input
//! and a starting [`Tape`]. It returns the output, the final tape (which
//! carries the data pointer) and the unconsumed input, or a [`Failure`]
//! carrying the same partial state next to the [`EngineError`].
//!
//! Around it the crate provides the pieces used by the `bf` binary: a
//! [`Session`] that carries the tape from one run to the next, execution
//! budgets, tape snapshots on disk, persisted preferences and a REPL.
//!
//! ```
//! use bf_engine::{execute, EngineError, Tape};
//!
//! let first = execute("+++>++", "", Tape::new()).unwrap();
//! let second = execute("+.", "", first.tape).unwrap();
//! assert_eq!(second.output, "\u{3}");
//!
//! let err = execute("+]", "", Tape::new()).unwrap_err();
//! assert_eq!(err.error, EngineError::UnmatchedCloseBracket { ip: 1 });
//! ```

pub mod budget;
pub mod cli_util;
pub mod commands;
pub mod config;
pub mod engine;
pub mod repl;
pub mod session;
pub mod snapshot;
pub mod tape;
pub mod theme;
pub mod view;

pub use engine::{
    execute, execute_traced, execute_with_control, EngineError, Failure, Outcome, RunResult, StepControl,
    TraceAction, TraceStep,
};
pub use session::Session;
pub use tape::{Tape, TapeError, TAPE_LEN};

/// Keep only Brainfuck instruction characters
pub fn bf_only(s: &str) -> String {
    s.chars()
        .filter(|c| matches!(c, '>' | '<' | '+' | '-' | '.' | ',' | '[' | ']'))
        .collect()
}
