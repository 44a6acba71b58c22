//! This module defines verdicts of solutions checked against a test set.
//!

use std::fmt::{Display, Formatter};
use std::time::Duration;

use invoker::{MemorySize, PeakUsage, RunOutcome, RunResult};

/// Kind of a verdict. Failures carry the 1-based number of the test they happened on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VerdictKind {
    /// The solution passed every test.
    Ok,

    /// The solution cannot be compiled.
    CompilationError,

    /// The solution exited abnormally.
    RuntimeError(usize),

    /// The solution exceeded the CPU time limit.
    TimeLimit(usize),

    /// The solution exceeded the idleness limit.
    IdlenessLimit(usize),

    /// The solution exceeded the memory limit.
    MemoryLimit(usize),

    /// The checker rejected the output of the solution.
    WrongAnswer(usize),

    /// The checker rejected the format of the output of the solution.
    PresentationError(usize),

    /// The checker or the interactor failed.
    JudgeError(usize),
}

/// Verdict of a solution, with the peak usage observed over the tests it ran on.
#[derive(Clone, Debug)]
pub struct Verdict {
    kind: VerdictKind,
    comment: Option<String>,
    peak_time: Option<Duration>,
    peak_memory: Option<MemorySize>,
}

impl Verdict {
    fn new(kind: VerdictKind, comment: Option<String>) -> Verdict {
        Verdict {
            kind,
            comment,
            peak_time: None,
            peak_memory: None
        }
    }

    /// Create a verdict of a solution that passed every test.
    pub fn ok() -> Verdict {
        Verdict::new(VerdictKind::Ok, None)
    }

    /// Create a verdict of a solution that cannot be compiled.
    pub fn compilation_error<T>(comment: T) -> Verdict
        where T: Into<String> {
        Verdict::new(VerdictKind::CompilationError, Some(comment.into()))
    }

    /// Create a verdict of a solution whose run on the given test did not succeed.
    pub fn fail_solution(test: usize, result: &RunResult) -> Verdict {
        let kind = match result.outcome() {
            RunOutcome::RuntimeError(..) => VerdictKind::RuntimeError(test),
            RunOutcome::TimeLimitExceeded => VerdictKind::TimeLimit(test),
            RunOutcome::IdlenessLimitExceeded => VerdictKind::IdlenessLimit(test),
            RunOutcome::MemoryLimitExceeded => VerdictKind::MemoryLimit(test),
            RunOutcome::Ok => VerdictKind::JudgeError(test)
        };
        Verdict::new(kind, result.comment().map(str::to_owned))
    }

    /// Create a verdict of a solution whose output on the given test was rejected by the checker.
    /// Checker exit code 1 means a wrong answer and 2 a presentation error; anything else is a
    /// failure of the checker itself.
    pub fn fail_checker<T>(test: usize, result: &RunResult, comment: T) -> Verdict
        where T: Into<String> {
        let kind = match result.outcome() {
            RunOutcome::RuntimeError(1) => VerdictKind::WrongAnswer(test),
            RunOutcome::RuntimeError(2) => VerdictKind::PresentationError(test),
            _ => VerdictKind::JudgeError(test)
        };
        Verdict::new(kind, Some(comment.into()))
    }

    /// Create a wrong answer verdict on the given test.
    pub fn wrong_answer<T>(test: usize, comment: T) -> Verdict
        where T: Into<String> {
        Verdict::new(VerdictKind::WrongAnswer(test), Some(comment.into()))
    }

    /// Attach peak usage to this verdict.
    pub fn with_peaks(mut self, peak_time: Option<Duration>, peak_memory: Option<MemorySize>)
        -> Verdict {
        self.peak_time = peak_time;
        self.peak_memory = peak_memory;
        self
    }

    /// Get the kind of this verdict.
    pub fn kind(&self) -> VerdictKind {
        self.kind
    }

    /// Determine whether the solution is accepted.
    pub fn is_ok(&self) -> bool {
        self.kind == VerdictKind::Ok
    }

    /// Get the comment attached to this verdict.
    pub fn comment(&self) -> Option<&str> {
        self.comment.as_ref().map(String::as_str)
    }

    /// Get the peak CPU time over the tests.
    pub fn peak_time(&self) -> Option<Duration> {
        self.peak_time
    }

    /// Get the peak memory over the tests.
    pub fn peak_memory(&self) -> Option<MemorySize> {
        self.peak_memory
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.kind {
            VerdictKind::Ok => f.write_str("OK"),
            VerdictKind::CompilationError => f.write_str("CE"),
            VerdictKind::RuntimeError(test) => write!(f, "RE/{}", test),
            VerdictKind::TimeLimit(test) => write!(f, "TL/{}", test),
            VerdictKind::IdlenessLimit(test) => write!(f, "IL/{}", test),
            VerdictKind::MemoryLimit(test) => write!(f, "ML/{}", test),
            VerdictKind::WrongAnswer(test) => write!(f, "WA/{}", test),
            VerdictKind::PresentationError(test) => write!(f, "PE/{}", test),
            VerdictKind::JudgeError(test) => write!(f, "JE/{}", test),
        }
    }
}

/// Running maximum of peak usage over several runs.
#[derive(Clone, Copy, Debug, Default)]
pub struct PeakTracker {
    time: Option<Duration>,
    memory: Option<MemorySize>,
}

impl PeakTracker {
    /// Create a new, empty `PeakTracker` instance.
    pub fn new() -> PeakTracker {
        PeakTracker::default()
    }

    /// Merge the peak usage of one run.
    pub fn update(&mut self, peak: Option<PeakUsage>) {
        if let Some(peak) = peak {
            self.time = std::cmp::max(self.time, Some(peak.time));
            self.memory = std::cmp::max(self.memory, Some(peak.memory));
        }
    }

    /// Attach the tracked peaks to the given verdict.
    pub fn apply(&self, verdict: Verdict) -> Verdict {
        verdict.with_peaks(self.time, self.memory)
    }
}
