//! This module implements the runner, which drives started processes through the polling loop
//! and turns what it observes into `RunResult`s.
//!

use std::io::Write;
use std::time::Duration;

use super::{
    Result,
    ResultExt,
    Pipe,
    ProcessBuilder,
    ProcessCheck,
    ProcessHandle,
    ProcessOutput,
    ProcessResourceLimits,
    ProcessResourceUsage,
    Redirection,
    RunResult,
};

/// Interval between consecutive samples of a running process.
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// How long captured streams are still collected once a monitored run has ended.
const DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Capability of a runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunnerMode {
    /// Processes are sampled through `/proc` and limits are enforced.
    Monitored,

    /// Processes are only waited for; limits are not enforced.
    Basic,
}

/// Runs processes under resource limits.
#[derive(Clone, Debug)]
pub struct Runner {
    mode: RunnerMode,
    verbose: bool,
}

impl Runner {
    /// Create a new `Runner` instance enforcing limits through `/proc`.
    pub fn new() -> Runner {
        Runner {
            mode: RunnerMode::Monitored,
            verbose: false
        }
    }

    /// Create a new `Runner` instance that does not enforce any limits.
    pub fn basic() -> Runner {
        Runner {
            mode: RunnerMode::Basic,
            ..Runner::new()
        }
    }

    /// Create a new `Runner` instance whose mode depends on whether process accounting files are
    /// available on this system.
    pub fn detect() -> Runner {
        if std::path::Path::new("/proc/self/stat").exists() {
            Runner::new()
        } else {
            warn!("/proc is not available, falling back to basic runner");
            Runner::basic()
        }
    }

    /// Set whether progress lines are printed to stderr while processes run.
    pub fn verbose(mut self, verbose: bool) -> Runner {
        self.verbose = verbose;
        self
    }

    /// Get the mode of this runner.
    pub fn mode(&self) -> RunnerMode {
        self.mode
    }

    fn is_monitored(&self) -> bool {
        self.mode == RunnerMode::Monitored
    }

    /// Bound on collecting output after the loop. A basic runner has no limits to bound it by.
    fn drain_timeout(&self) -> Option<Duration> {
        if self.is_monitored() {
            Some(DRAIN_TIMEOUT)
        } else {
            None
        }
    }

    /// Log the limits this runner cannot enforce.
    fn warn_unsupported(&self, limits: &ProcessResourceLimits) {
        if self.is_monitored() {
            return;
        }
        if limits.cpu_time_limit.is_some() {
            warn!("basic runner doesn't support time limit");
        }
        if limits.idle_time_limit.is_some() {
            warn!("basic runner doesn't support idleness limit");
        }
        if limits.memory_limit.is_some() {
            warn!("basic runner doesn't support memory limit");
        }
    }

    /// Print the progress line of the given process, erased by backspaces so that the next line
    /// overwrites it.
    fn report_progress(&self, process: &ProcessHandle) {
        if !self.verbose {
            return;
        }

        let line = progress_line(process);
        let mut stderr = std::io::stderr();
        write!(stderr, "{}{}", line, "\x08".repeat(line.len())).ok();
        stderr.flush().ok();
    }

    /// Print the final usage of the given process.
    fn report_final(&self, process: &ProcessHandle) {
        if self.verbose {
            eprint!("[{}] ", progress_line(process));
        }
    }

    /// Run the process built by the given builder until it exits or breaches one of its limits.
    pub fn run(&self, builder: ProcessBuilder) -> Result<RunResult> {
        self.warn_unsupported(&builder.limits);
        debug!("Running {}", builder.command_line());

        let mut process = builder.start()?;
        let mut breach = None;

        if self.is_monitored() {
            // Sample first: a process exiting within one interval is still observed as a zombie.
            loop {
                match process.check() {
                    ProcessCheck::Running => self.report_progress(&process),
                    ProcessCheck::Breached(result) => {
                        breach = Some(result);
                        break;
                    },
                    ProcessCheck::Unavailable => ()
                };

                if process.communicate(Some(POLL_INTERVAL))?.is_some() {
                    break;
                }
            }
        }

        let output = process.finish(self.drain_timeout())?;
        self.report_final(&process);

        Ok(finalize(&process, breach, output))
    }

    /// Run a solution and an interactor connected to each other: the standard output of each one
    /// is the standard input of the other. Returns the results of the interactor and the solution,
    /// in this order.
    ///
    /// The `stdin` and `stdout` redirections of both builders are replaced by the connecting pipes.
    pub fn run_interactive(&self, mut solution: ProcessBuilder, mut interactor: ProcessBuilder)
        -> Result<(RunResult, RunResult)> {
        self.warn_unsupported(&solution.limits);
        self.warn_unsupported(&interactor.limits);
        debug!("Running {} with interactor {}",
            solution.command_line(), interactor.command_line());

        let (solution_stdin, interactor_stdout) = Pipe::new()
            .chain_err(|| "cannot create pipe to solution")?
            .into_ends();
        let (interactor_stdin, solution_stdout) = Pipe::new()
            .chain_err(|| "cannot create pipe to interactor")?
            .into_ends();

        solution.redirections.stdin = pipe_redirection(solution_stdin)?;
        solution.redirections.stdout = pipe_redirection(solution_stdout)?;
        interactor.redirections.stdin = pipe_redirection(interactor_stdin)?;
        interactor.redirections.stdout = pipe_redirection(interactor_stdout)?;

        // The builders own the pipe ends and close them once their process has started. Should
        // the interactor fail to start, dropping the solution handle kills the solution.
        let mut solution = solution.start()?;
        let mut interactor = interactor.start()?;

        let mut solution_breach = None;
        let mut interactor_breach = None;
        let no_wait = Some(Duration::from_millis(0));

        loop {
            if self.is_monitored() {
                if let ProcessCheck::Breached(result) = solution.check() {
                    solution_breach = Some(result);
                    interactor.kill();
                    break;
                }
                if let ProcessCheck::Breached(result) = interactor.check() {
                    interactor_breach = Some(result);
                    solution.kill();
                    break;
                }
                self.report_progress(&solution);
            }

            let solution_done = solution.communicate(no_wait)?.is_some();
            let interactor_done = interactor.communicate(no_wait)?.is_some();
            if solution_done && interactor_done {
                break;
            }

            std::thread::sleep(POLL_INTERVAL);
        }

        solution.kill();
        interactor.kill();
        let solution_output = solution.finish(self.drain_timeout())?;
        let interactor_output = interactor.finish(self.drain_timeout())?;
        self.report_final(&solution);

        Ok((
            finalize(&interactor, interactor_breach, interactor_output),
            finalize(&solution, solution_breach, solution_output)
        ))
    }
}

impl Default for Runner {
    fn default() -> Self {
        Runner::new()
    }
}

fn pipe_redirection(end: Option<std::fs::File>) -> Result<Redirection> {
    match end {
        Some(file) => Ok(Redirection::Handle(file)),
        None => bail!("pipe end already taken")
    }
}

/// Build the result of a finished process. A recorded breach takes precedence over the exit code.
fn finalize(process: &ProcessHandle, breach: Option<RunResult>, output: ProcessOutput)
    -> RunResult {
    let result = match breach {
        Some(result) => result,
        None => RunResult::from_exit_code(process.exit_code().unwrap_or(-1))
    };

    result.with_peak(process.peak()).with_output(output)
}

fn progress_line(process: &ProcessHandle) -> String {
    let memory = process.usage()
        .map(|usage: ProcessResourceUsage| usage.peak_resident_set_size.mebibytes())
        .unwrap_or(0.0);
    format!("{:.3}s, {:.2}MiB", process.elapsed().as_secs_f64(), memory)
}
