//! This module defines the result of a monitored run.
//!

use std::fmt::{Display, Formatter};
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

use super::MemorySize;
use super::process::ProcessOutput;

/// Exit code reported for runs that were terminated for breaching a limit.
pub const LIMIT_EXIT_CODE: i32 = -1;

/// Outcome of a monitored run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum RunOutcome {
    /// The process exited with code 0.
    Ok,

    /// The process exited with a non-zero code, or was killed by a signal `n` in which case the
    /// code is `-n`.
    RuntimeError(i32),

    /// The process consumed more CPU time than allowed.
    TimeLimitExceeded,

    /// The process lived longer, in wall clock time, than allowed.
    IdlenessLimitExceeded,

    /// The resident memory of the process grew beyond the limit.
    MemoryLimitExceeded,
}

/// Peak resource usage observed during a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakUsage {
    /// CPU time consumed.
    pub time: Duration,

    /// Largest resident set size observed.
    pub memory: MemorySize,
}

/// Result of a monitored run.
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RunResult {
    outcome: RunOutcome,
    comment: Option<String>,
    peak: Option<PeakUsage>,
    stdout: Option<Vec<u8>>,
    stderr: Option<Vec<u8>>,
}

impl RunResult {
    fn with_outcome(outcome: RunOutcome, comment: Option<String>) -> RunResult {
        RunResult {
            outcome,
            comment,
            peak: None,
            stdout: None,
            stderr: None
        }
    }

    /// Create a successful `RunResult`.
    pub fn ok() -> RunResult {
        RunResult::with_outcome(RunOutcome::Ok, None)
    }

    /// Create a `RunResult` from the exit code of a reaped process. Code 0 means success; any
    /// other code, including negated signal numbers, is a runtime error.
    pub fn from_exit_code(code: i32) -> RunResult {
        if code == 0 {
            RunResult::ok()
        } else {
            RunResult::runtime_error(code, format!("runtime error {}", code))
        }
    }

    /// Create a `RunResult` describing a runtime error.
    pub fn runtime_error<T>(code: i32, comment: T) -> RunResult
        where T: Into<String> {
        RunResult::with_outcome(RunOutcome::RuntimeError(code), Some(comment.into()))
    }

    /// Create a `RunResult` describing a breached CPU time limit.
    pub fn time_limit_exceeded<T>(comment: T) -> RunResult
        where T: Into<String> {
        RunResult::with_outcome(RunOutcome::TimeLimitExceeded, Some(comment.into()))
    }

    /// Create a `RunResult` describing a breached idleness limit.
    pub fn idleness_limit_exceeded<T>(comment: T) -> RunResult
        where T: Into<String> {
        RunResult::with_outcome(RunOutcome::IdlenessLimitExceeded, Some(comment.into()))
    }

    /// Create a `RunResult` describing a breached memory limit.
    pub fn memory_limit_exceeded<T>(comment: T) -> RunResult
        where T: Into<String> {
        RunResult::with_outcome(RunOutcome::MemoryLimitExceeded, Some(comment.into()))
    }

    /// Attach peak usage statistics to this result.
    pub fn with_peak(mut self, peak: Option<PeakUsage>) -> RunResult {
        self.peak = peak;
        self
    }

    /// Attach captured output to this result.
    pub fn with_output(mut self, output: ProcessOutput) -> RunResult {
        self.stdout = output.stdout;
        self.stderr = output.stderr;
        self
    }

    /// Get the outcome of the run.
    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// Determine whether the run succeeded.
    pub fn is_ok(&self) -> bool {
        self.outcome == RunOutcome::Ok
    }

    /// Get the exit code of the run: 0 on success, the raw code (or negated signal) on a runtime
    /// error and -1 when a limit was breached.
    pub fn exit_code(&self) -> i32 {
        match self.outcome {
            RunOutcome::Ok => 0,
            RunOutcome::RuntimeError(code) => code,
            _ => LIMIT_EXIT_CODE
        }
    }

    /// Get the human readable comment attached to the run, if any.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_ref().map(String::as_str)
    }

    /// Get the peak usage statistics, if the process was ever sampled.
    pub fn peak(&self) -> Option<PeakUsage> {
        self.peak
    }

    /// Get the CPU time consumed, if the process was ever sampled.
    pub fn time(&self) -> Option<Duration> {
        self.peak.map(|p| p.time)
    }

    /// Get the peak resident memory, if the process was ever sampled.
    pub fn memory(&self) -> Option<MemorySize> {
        self.peak.map(|p| p.memory)
    }

    /// Get the captured standard output.
    pub fn stdout(&self) -> Option<&[u8]> {
        self.stdout.as_ref().map(Vec::as_slice)
    }

    /// Get the captured standard error.
    pub fn stderr(&self) -> Option<&[u8]> {
        self.stderr.as_ref().map(Vec::as_slice)
    }
}

impl Display for RunResult {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.outcome {
            RunOutcome::Ok => f.write_str("[ok]"),
            RunOutcome::RuntimeError(code) => write!(f, "exit code: {}", code),
            RunOutcome::TimeLimitExceeded => f.write_str("time limit exceeded"),
            RunOutcome::IdlenessLimitExceeded => f.write_str("idleness limit exceeded"),
            RunOutcome::MemoryLimitExceeded => f.write_str("memory limit exceeded"),
        }
    }
}
