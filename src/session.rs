//! Caller-side state that survives between runs.
//!
//! A [`Session`] feeds the tape left by one run into the next and keeps the
//! pending input that earlier runs did not consume. The engine itself stays
//! stateless.

use tracing::debug;

use crate::engine::{execute_with_control, RunResult, StepControl};
use crate::tape::Tape;

#[derive(Debug, Default, Clone)]
pub struct Session {
    tape: Tape,
    pending_input: String,
    runs: u64,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn tape(&self) -> &Tape {
        &self.tape
    }

    pub fn pending_input(&self) -> &str {
        &self.pending_input
    }

    /// Replace the input that the next run's `,` instructions will read.
    pub fn set_input(&mut self, input: impl Into<String>) {
        self.pending_input = input.into();
    }

    /// Number of runs that completed and were committed.
    pub fn runs(&self) -> u64 {
        self.runs
    }

    /// Zero the tape, home the pointer and drop any pending input.
    pub fn reset(&mut self) {
        self.tape = Tape::new();
        self.pending_input.clear();
        debug!("session reset");
    }

    /// Run `program` against the session state.
    ///
    /// On success the final tape and the unconsumed input become the session
    /// state. On failure the session is left as it was; the partial state is
    /// only reported through the returned [`crate::Failure`].
    pub fn run(&mut self, program: &str, control: Option<&StepControl>) -> RunResult {
        let result = execute_with_control(program, &self.pending_input, self.tape.clone(), control);
        match &result {
            Ok(outcome) => {
                self.tape = outcome.tape.clone();
                self.pending_input = outcome.remaining_input.clone();
                self.runs += 1;
                debug!(steps = outcome.steps, cursor = self.tape.cursor(), "run committed");
            }
            Err(failure) => {
                debug!(error = %failure.error, steps = failure.partial.steps, "run failed; session unchanged");
            }
        }
        result
    }
}
