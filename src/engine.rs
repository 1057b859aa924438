//! The execution engine.
//!
//! A run takes an immutable program, a pending-input string and a starting
//! [`Tape`], and produces the accumulated output, the final tape and the
//! unconsumed input. The engine performs no I/O of its own.
//!
//! Behaviors:
//! - The tape is a ring of 30,000 cells; `>` and `<` wrap around its ends.
//! - Cell arithmetic wraps modulo 256.
//! - `,` takes the next character of the pending input; with no input left it
//!   leaves the cell untouched.
//! - `.` appends the character whose code point is the current cell.
//! - Characters outside `><+-.,[]` are skipped.
//! - A `[` on a zero cell scans forward for its match; a `]` on a nonzero
//!   cell returns to the most recent loop entry on the loop stack.
//!
//! Quick start:
//!
//! ```
//! use bf_engine::{execute, Tape};
//!
//! let outcome = execute("++++++++[>++++++++<-]>+.", "", Tape::new()).expect("program should run");
//! assert_eq!(outcome.output, "A");
//! assert_eq!(outcome.tape.cursor(), 1);
//! ```

use std::fmt;
use std::str::Chars;
use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};
use std::time::Instant;

use crate::tape::Tape;

/// How many steps pass between two deadline checks.
const DEADLINE_CHECK_INTERVAL: u64 = 1024;

/// Errors that abort a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// A `[` on a zero cell had no matching `]` before the end of the program.
    #[error("Unmatched '[' at instruction {ip}")]
    UnmatchedOpenBracket { ip: usize },

    /// A `]` on a nonzero cell was reached with no open loop to return to.
    #[error("Unmatched ']' at instruction {ip}")]
    UnmatchedCloseBracket { ip: usize },

    /// Execution aborted due to step limit.
    #[error("Execution aborted: step limit exceeded ({limit})")]
    StepLimitExceeded { limit: u64 },

    #[error("Execution aborted: deadline exceeded")]
    DeadlineExceeded,

    /// Execution aborted due to cooperative cancellation (e.g., timeout)
    #[error("Execution aborted: cancelled")]
    Canceled,
}

impl EngineError {
    /// Instruction index of a bracket error.
    pub fn ip(&self) -> Option<usize> {
        match self {
            EngineError::UnmatchedOpenBracket { ip } | EngineError::UnmatchedCloseBracket { ip } => {
                Some(*ip)
            }
            _ => None,
        }
    }

    /// True for errors caused by the program's bracket structure rather than
    /// by an execution budget.
    pub fn is_structural(&self) -> bool {
        self.ip().is_some()
    }

    /// True for the aborts raised by a wall-clock limit.
    pub fn is_timeout(&self) -> bool {
        matches!(self, EngineError::DeadlineExceeded | EngineError::Canceled)
    }
}

/// Controls for cooperative cancellation and step limiting.
#[derive(Clone, Default)]
pub struct StepControl {
    pub max_steps: Option<u64>,
    pub cancel_flag: Arc<AtomicBool>,
    pub deadline: Option<Instant>,
}

impl StepControl {
    pub fn new(max_steps: Option<u64>, cancel_flag: Arc<AtomicBool>) -> Self {
        Self {
            max_steps,
            cancel_flag,
            deadline: None,
        }
    }

    /// Abort once `deadline` has passed. Checked every 1024 steps.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    fn check(&self, steps: u64) -> Result<(), EngineError> {
        if self.cancel_flag.load(Ordering::Relaxed) {
            return Err(EngineError::Canceled);
        }
        if let Some(max) = self.max_steps {
            if steps >= max {
                return Err(EngineError::StepLimitExceeded { limit: max });
            }
        }
        if let Some(deadline) = self.deadline {
            if steps % DEADLINE_CHECK_INTERVAL == 0 && Instant::now() >= deadline {
                return Err(EngineError::DeadlineExceeded);
            }
        }
        Ok(())
    }
}

/// Everything a run leaves behind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome {
    pub output: String,
    pub tape: Tape,
    /// Pending input the program did not consume.
    pub remaining_input: String,
    /// Number of program characters dispatched, no-ops included.
    pub steps: u64,
}

/// A run that stopped on an [`EngineError`], with the state reached so far.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct Failure {
    #[source]
    pub error: EngineError,
    pub partial: Outcome,
}

pub type RunResult = Result<Outcome, Failure>;

/// What a single instruction did, as recorded by [`execute_traced`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceAction {
    MovePointer { to: usize },
    Increment { from: u8, to: u8 },
    Decrement { from: u8, to: u8 },
    Output { byte: u8 },
    Input { byte: Option<u8> },
    SkipLoop { to: usize },
    EnterLoop,
    JumpBack { to: usize },
    ExitLoop,
}

impl fmt::Display for TraceAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TraceAction::MovePointer { to } => write!(f, "Moved pointer head to index {to}"),
            TraceAction::Increment { from, to } => write!(f, "Increment cell from {from} to {to}"),
            TraceAction::Decrement { from, to } => write!(f, "Decrement cell from {from} to {to}"),
            TraceAction::Output { byte } => {
                write!(f, "Output byte {byte} ({:?})", char::from(*byte))
            }
            TraceAction::Input { byte: Some(b) } => write!(f, "Read input -> {b}"),
            TraceAction::Input { byte: None } => write!(f, "Input empty; cell unchanged"),
            TraceAction::SkipLoop { to } => {
                write!(f, "Cell is 0; jump forward to matching ']' at IP {to}")
            }
            TraceAction::EnterLoop => write!(f, "Enter loop (cell != 0)"),
            TraceAction::JumpBack { to } => write!(f, "Cell != 0; jump back to '[' at IP {to}"),
            TraceAction::ExitLoop => write!(f, "Exit loop (cell is 0)"),
        }
    }
}

/// One row of an execution trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TraceStep {
    pub step: u64,
    pub ip: usize,
    /// Data pointer before the instruction ran.
    pub ptr: usize,
    /// Current cell before the instruction ran.
    pub cell: u8,
    pub instr: char,
    pub action: TraceAction,
}

/// Execute `program` against `tape` with `input` as the pending input.
pub fn execute(program: &str, input: &str, tape: Tape) -> RunResult {
    execute_with_control(program, input, tape, None)
}

/// Execute with cooperative cancellation, an optional step limit and an
/// optional deadline.
pub fn execute_with_control(
    program: &str,
    input: &str,
    tape: Tape,
    control: Option<&StepControl>,
) -> RunResult {
    let mut machine = Machine::new(program, input, tape);
    let result = machine.run(control, None);
    machine.finish(result)
}

/// Execute like [`execute_with_control`] and also return one [`TraceStep`]
/// per instruction executed. Skipped characters are not recorded.
pub fn execute_traced(
    program: &str,
    input: &str,
    tape: Tape,
    control: Option<&StepControl>,
) -> (RunResult, Vec<TraceStep>) {
    let mut trace = Vec::new();
    let mut machine = Machine::new(program, input, tape);
    let result = machine.run(control, Some(&mut trace));
    (machine.finish(result), trace)
}

struct Machine<'i> {
    program: Vec<char>,
    ip: usize,
    tape: Tape,
    input: Chars<'i>,
    output: String,
    loop_stack: Vec<usize>,
    steps: u64,
}

impl<'i> Machine<'i> {
    fn new(program: &str, input: &'i str, tape: Tape) -> Self {
        Self {
            program: program.chars().collect(),
            ip: 0,
            tape,
            input: input.chars(),
            output: String::new(),
            loop_stack: Vec::new(),
            steps: 0,
        }
    }

    fn run(
        &mut self,
        control: Option<&StepControl>,
        mut trace: Option<&mut Vec<TraceStep>>,
    ) -> Result<(), EngineError> {
        while self.ip < self.program.len() {
            if let Some(ctrl) = control {
                ctrl.check(self.steps)?;
            }

            let ip = self.ip;
            let instr = self.program[ip];
            let (ptr_before, cell_before) = (self.tape.cursor(), self.tape.current());

            let action = self.dispatch(instr)?;

            if let (Some(rows), Some(action)) = (trace.as_mut(), action) {
                rows.push(TraceStep {
                    step: self.steps,
                    ip,
                    ptr: ptr_before,
                    cell: cell_before,
                    instr,
                    action,
                });
            }

            self.steps += 1;
            self.ip += 1;
        }

        Ok(())
    }

    /// Apply one instruction. Returns `None` for characters that are not
    /// instructions.
    fn dispatch(&mut self, instr: char) -> Result<Option<TraceAction>, EngineError> {
        let action = match instr {
            '>' => {
                self.tape.move_right();
                TraceAction::MovePointer { to: self.tape.cursor() }
            }
            '<' => {
                self.tape.move_left();
                TraceAction::MovePointer { to: self.tape.cursor() }
            }
            '+' => {
                let from = self.tape.current();
                self.tape.increment();
                TraceAction::Increment { from, to: self.tape.current() }
            }
            '-' => {
                let from = self.tape.current();
                self.tape.decrement();
                TraceAction::Decrement { from, to: self.tape.current() }
            }
            '.' => {
                let byte = self.tape.current();
                self.output.push(char::from(byte));
                TraceAction::Output { byte }
            }
            ',' => {
                // Code points above 255 keep only their low byte.
                let byte = self.input.next().map(|c| (u32::from(c) & 0xFF) as u8);
                if let Some(b) = byte {
                    self.tape.set_current(b);
                }
                TraceAction::Input { byte }
            }
            '[' => {
                if self.tape.current() == 0 {
                    let to = self.matching_close()?;
                    // Land on the ']' itself; the step loop moves past it.
                    self.ip = to;
                    TraceAction::SkipLoop { to }
                } else {
                    self.loop_stack.push(self.ip);
                    TraceAction::EnterLoop
                }
            }
            ']' => {
                if self.tape.current() != 0 {
                    let Some(&to) = self.loop_stack.last() else {
                        return Err(EngineError::UnmatchedCloseBracket { ip: self.ip });
                    };
                    self.ip = to;
                    TraceAction::JumpBack { to }
                } else {
                    // An empty stack here is tolerated.
                    self.loop_stack.pop();
                    TraceAction::ExitLoop
                }
            }
            _ => return Ok(None),
        };
        Ok(Some(action))
    }

    /// Forward scan from the `[` at the current IP to its matching `]`.
    fn matching_close(&self) -> Result<usize, EngineError> {
        let start = self.ip + 1;
        let mut depth = 1usize;
        for (offset, &c) in self.program[start..].iter().enumerate() {
            match c {
                '[' => depth += 1,
                ']' => {
                    depth -= 1;
                    if depth == 0 {
                        return Ok(start + offset);
                    }
                }
                _ => {}
            }
        }
        Err(EngineError::UnmatchedOpenBracket { ip: self.ip })
    }

    fn finish(self, result: Result<(), EngineError>) -> RunResult {
        let outcome = Outcome {
            output: self.output,
            tape: self.tape,
            remaining_input: self.input.as_str().to_string(),
            steps: self.steps,
        };
        match result {
            Ok(()) => Ok(outcome),
            Err(error) => Err(Failure {
                error,
                partial: outcome,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tape::TAPE_LEN;

    fn run(code: &str) -> Outcome {
        execute(code, "", Tape::new()).expect("program should run")
    }

    #[test]
    fn hello_world() {
        let code = "++++++++[>++++[>++>+++>+++>+<<<<-]>+>+>->>+[<]<-]>>.>---.+++++++..+++.>>.<-.<.+++.------.--------.>>+.>++.";
        assert_eq!(run(code).output, "Hello World!\n");
    }

    #[test]
    fn right_pointer_wraps_to_zero() {
        let mut cells = vec![0; TAPE_LEN];
        cells[TAPE_LEN - 1] = 7;
        let tape = Tape::from_parts(cells, TAPE_LEN - 1).unwrap();
        let out = execute(">", "", tape).unwrap();
        assert_eq!(out.tape.cursor(), 0);
    }

    #[test]
    fn left_pointer_wraps_to_last_cell() {
        let out = run("<");
        assert_eq!(out.tape.cursor(), TAPE_LEN - 1);
    }

    #[test]
    fn wrapping_subtraction() {
        assert_eq!(run("-").tape.cells()[0], 255);
    }

    #[test]
    fn wrapping_addition() {
        let code = "+".repeat(256); // 256 increments should wrap around
        assert_eq!(run(&code).tape.cells()[0], 0);
    }

    #[test]
    fn non_instructions_are_skipped_but_counted() {
        let (result, trace) = execute_traced("+a+ \n+", "", Tape::new(), None);
        let out = result.unwrap();
        assert_eq!(out.tape.cells()[0], 3);
        assert_eq!(out.tape.cursor(), 0);
        assert!(out.output.is_empty());
        assert_eq!(out.steps, 6);
        assert_eq!(trace.len(), 3);
    }

    #[test]
    fn read_with_empty_input_leaves_cell_unchanged() {
        let out = run("+++,");
        assert_eq!(out.tape.cells()[0], 3);
    }

    #[test]
    fn input_is_consumed_front_first() {
        let out = execute(",>,>,", "AB", Tape::new()).unwrap();
        assert_eq!(&out.tape.cells()[..3], &[65, 66, 0]);
        assert!(out.remaining_input.is_empty());

        let out = execute(",", "xyz", Tape::new()).unwrap();
        assert_eq!(out.tape.cells()[0], b'x');
        assert_eq!(out.remaining_input, "yz");
    }

    #[test]
    fn wide_input_characters_keep_their_low_byte() {
        let out = execute(",>,", "\u{100}\u{20AC}", Tape::new()).unwrap();
        assert_eq!(&out.tape.cells()[..2], &[0, 0xAC]);
    }

    #[test]
    fn nested_loops_multiply() {
        let out = run("++[>++[>++<-]<-]");
        assert_eq!(out.tape.cells()[0], 0);
        assert_eq!(out.tape.cells()[1], 0);
        assert_eq!(out.tape.cells()[2], 8);
        assert_eq!(out.tape.cursor(), 0);
    }

    #[test]
    fn empty_loop_on_zero_cell_is_ok() {
        assert!(execute("[]", "", Tape::new()).is_ok());
    }

    #[test]
    fn skipped_loop_jumps_over_nested_brackets() {
        let out = run("[+[+]+]>+");
        assert_eq!(out.tape.cells()[0], 0);
        assert_eq!(out.tape.cells()[1], 1);
    }

    #[test]
    fn unmatched_open_bracket_returns_error() {
        // The starting cell is zero, so '[' scans forward and runs off the end.
        let err = execute("[+", "", Tape::new()).unwrap_err();
        assert_eq!(err.error, EngineError::UnmatchedOpenBracket { ip: 0 });
        assert_eq!(err.error.to_string(), "Unmatched '[' at instruction 0");
    }

    #[test]
    fn unmatched_close_bracket_returns_error() {
        let err = execute("+]", "", Tape::new()).unwrap_err();
        assert_eq!(err.error, EngineError::UnmatchedCloseBracket { ip: 1 });
        assert_eq!(err.error.to_string(), "Unmatched ']' at instruction 1");
    }

    #[test]
    fn close_bracket_on_zero_cell_is_tolerated() {
        assert!(execute("]", "", Tape::new()).is_ok());
    }

    #[test]
    fn unmatched_open_is_only_found_when_taken() {
        // The cell is nonzero, so the open loop is entered and never scanned.
        let out = run("+[-");
        assert_eq!(out.tape.cells()[0], 0);
    }

    #[test]
    fn failure_keeps_partial_state() {
        let code = format!("{}.+]", "+".repeat(33));
        let err = execute(&code, "", Tape::new()).unwrap_err();
        assert!(err.error.is_structural());
        assert_eq!(err.partial.output, "!");
        assert_eq!(err.partial.tape.cells()[0], 34);
    }

    #[test]
    fn tape_carries_over_between_runs() {
        let first = run("+++>++");
        assert_eq!(first.tape.cursor(), 1);
        let second = execute("+.", "", first.tape).unwrap();
        assert_eq!(second.output, "\u{3}");
    }

    #[test]
    fn step_limit_aborts_infinite_loop() {
        let ctrl = StepControl::new(Some(50), Arc::new(AtomicBool::new(false)));
        let err = execute_with_control("+[]", "", Tape::new(), Some(&ctrl)).unwrap_err();
        assert_eq!(err.error, EngineError::StepLimitExceeded { limit: 50 });
        assert_eq!(err.partial.steps, 50);
        assert_eq!(err.partial.tape.cells()[0], 1);
        assert!(!err.error.is_structural());
    }

    #[test]
    fn step_limit_allows_program_that_fits() {
        let ctrl = StepControl::new(Some(3), Arc::new(AtomicBool::new(false)));
        let out = execute_with_control("+++", "", Tape::new(), Some(&ctrl)).unwrap();
        assert_eq!(out.steps, 3);
    }

    #[test]
    fn cancel_flag_stops_before_first_step() {
        let ctrl = StepControl::new(None, Arc::new(AtomicBool::new(true)));
        let err = execute_with_control("+", "", Tape::new(), Some(&ctrl)).unwrap_err();
        assert_eq!(err.error, EngineError::Canceled);
        assert_eq!(err.partial.steps, 0);
    }

    #[test]
    fn passed_deadline_aborts() {
        let ctrl = StepControl::default().with_deadline(Instant::now());
        let err = execute_with_control("+[]", "", Tape::new(), Some(&ctrl)).unwrap_err();
        assert_eq!(err.error, EngineError::DeadlineExceeded);
        assert!(err.error.is_timeout());
        assert!(!err.error.is_structural());
    }

    #[test]
    fn trace_records_actions() {
        let (result, trace) = execute_traced(">+[-]", "", Tape::new(), None);
        assert!(result.is_ok());
        assert_eq!(trace[0].action, TraceAction::MovePointer { to: 1 });
        assert_eq!(trace[0].action.to_string(), "Moved pointer head to index 1");
        assert_eq!(trace[1].action, TraceAction::Increment { from: 0, to: 1 });
        assert_eq!(trace[2].action, TraceAction::EnterLoop);
        assert_eq!(trace[3].action, TraceAction::Decrement { from: 1, to: 0 });
        assert_eq!(trace[4].action, TraceAction::ExitLoop);
        assert_eq!(trace[4].ip, 4);
    }
}
