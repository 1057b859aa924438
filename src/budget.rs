//! Execution budgets for callers that must not hang on a looping program.

use std::env;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::{Duration, Instant};

use tracing::debug;

use crate::config::Limits;
use crate::engine::StepControl;

pub const TIMEOUT_ENV: &str = "BF_TIMEOUT_MS";
pub const MAX_STEPS_ENV: &str = "BF_MAX_STEPS";
pub const DEFAULT_TIMEOUT_MS: u64 = 2_000;

/// Wall-clock and step limits applied to one run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunLimits {
    pub timeout_ms: u64,
    pub max_steps: Option<u64>,
}

impl RunLimits {
    /// Resolve limits: flags -> env -> config file -> defaults.
    pub fn resolve(timeout_flag: Option<u64>, steps_flag: Option<u64>, config: &Limits) -> Self {
        let limits = Self::from_sources(
            timeout_flag,
            steps_flag,
            env::var(TIMEOUT_ENV).ok().as_deref(),
            env::var(MAX_STEPS_ENV).ok().as_deref(),
            config,
        );
        debug!(timeout_ms = limits.timeout_ms, max_steps = ?limits.max_steps, "resolved run limits");
        limits
    }

    fn from_sources(
        timeout_flag: Option<u64>,
        steps_flag: Option<u64>,
        timeout_env: Option<&str>,
        steps_env: Option<&str>,
        config: &Limits,
    ) -> Self {
        let parse = |s: &str| s.trim().parse::<u64>().ok();
        let timeout_ms = timeout_flag
            .or_else(|| timeout_env.and_then(parse))
            .or(config.timeout_ms)
            .unwrap_or(DEFAULT_TIMEOUT_MS);
        let max_steps = steps_flag
            .or_else(|| steps_env.and_then(parse))
            .or(config.max_steps);
        Self {
            timeout_ms,
            max_steps,
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

/// Extra wait past the deadline before the supervisor raises the cancel flag.
const CANCEL_GRACE: Duration = Duration::from_millis(250);

/// Run `job` on a worker thread under the wall-clock limit.
///
/// The job's [`StepControl`] carries a deadline at the timeout, so a running
/// engine stops itself with [`crate::EngineError::DeadlineExceeded`]. If no
/// result arrives shortly after the deadline the cancel flag is raised as
/// well. Either way the job's own result, with its partial state, is
/// returned.
pub fn run_supervised<T, F>(limits: &RunLimits, job: F) -> T
where
    T: Send,
    F: FnOnce(&StepControl) -> T + Send,
{
    let cancel = Arc::new(AtomicBool::new(false));
    let ctrl = StepControl::new(limits.max_steps, cancel.clone()).with_deadline(Instant::now() + limits.timeout());
    let ctrl = &ctrl;
    let (tx, rx) = mpsc::channel::<T>();

    thread::scope(|s| {
        let worker = s.spawn(move || {
            let _ = tx.send(job(ctrl));
        });

        let received = match rx.recv_timeout(limits.timeout() + CANCEL_GRACE) {
            Ok(value) => Ok(value),
            Err(mpsc::RecvTimeoutError::Timeout) => {
                cancel.store(true, Ordering::Relaxed);
                debug!(timeout_ms = limits.timeout_ms, "job missed its deadline; cancelling");
                rx.recv()
            }
            Err(mpsc::RecvTimeoutError::Disconnected) => Err(mpsc::RecvError),
        };

        match received {
            Ok(value) => value,
            // The worker dropped its sender without sending: it panicked.
            Err(_) => match worker.join() {
                Err(payload) => panic::resume_unwind(payload),
                Ok(()) => unreachable!("worker exited without sending a result"),
            },
        }
    })
}
