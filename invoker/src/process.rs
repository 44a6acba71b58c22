//! This module implements the handle to a started child process: sampling its resource usage,
//! enforcing limits, killing it and collecting its exit code and captured output.
//!

use std::io::Read;
use std::process::Child;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use nix::errno::Errno;
use nix::sys::signal::Signal;
use nix::sys::wait::{WaitPidFlag, WaitStatus};
use nix::unistd::Pid;

use super::{
    Error,
    ErrorKind,
    Result,
    ProcessResourceLimits,
    ProcessResourceUsage,
    PeakUsage,
    RunResult,
};

/// Interval between consecutive non-blocking `wait` calls while waiting with a deadline.
const REAP_INTERVAL: Duration = Duration::from_millis(1);

/// Output captured from the standard streams of a finished process. A stream that was not
/// redirected to `Redirection::Capture` is `None`.
#[derive(Clone, Debug, Default)]
pub struct ProcessOutput {
    /// Captured standard output.
    pub stdout: Option<Vec<u8>>,

    /// Captured standard error.
    pub stderr: Option<Vec<u8>>,
}

/// Drains one captured stream on a background thread so that the child never blocks on a full
/// pipe buffer.
struct OutputCollector {
    receiver: Option<Receiver<std::io::Result<Vec<u8>>>>,
    data: Option<Vec<u8>>,
}

impl OutputCollector {
    /// Create a collector for a stream that is not captured.
    fn none() -> Self {
        OutputCollector {
            receiver: None,
            data: None
        }
    }

    /// Start draining the given stream.
    fn start<R>(mut source: R) -> Self
        where R: Read + Send + 'static {
        let (sender, receiver) = mpsc::channel();
        std::thread::spawn(move || {
            let mut buffer = Vec::new();
            let ret = source.read_to_end(&mut buffer).map(|_| buffer);
            // The receiving side is gone only if the handle has been dropped.
            sender.send(ret).ok();
        });

        OutputCollector {
            receiver: Some(receiver),
            data: None
        }
    }

    /// Determine whether the stream is captured and has not reached EOF yet.
    fn is_pending(&self) -> bool {
        self.receiver.is_some()
    }

    /// Stop waiting for the stream. The reader thread exits on its own once the stream is closed.
    fn abandon(&mut self) {
        self.receiver = None;
    }

    /// Wait for the stream to reach EOF, at most for the given timeout. `None` waits without a
    /// bound. Returns `true` if the stream has been fully collected.
    fn poll(&mut self, timeout: Option<Duration>) -> Result<bool> {
        let ret = match self.receiver {
            Some(ref receiver) => match timeout {
                Some(timeout) => receiver.recv_timeout(timeout),
                None => receiver.recv().map_err(|_| RecvTimeoutError::Disconnected)
            },
            None => return Ok(true)
        };

        match ret {
            Ok(Ok(data)) => {
                self.receiver = None;
                self.data = Some(data);
                Ok(true)
            },
            Ok(Err(e)) => {
                self.receiver = None;
                Err(Error::with_chain(e, ErrorKind::OutputReaderFailed))
            },
            Err(RecvTimeoutError::Timeout) => Ok(false),
            Err(RecvTimeoutError::Disconnected) => {
                self.receiver = None;
                bail!(ErrorKind::OutputReaderFailed)
            }
        }
    }
}

/// Result of sampling a running process against its limits.
#[derive(Debug)]
pub enum ProcessCheck {
    /// The process is within its limits.
    Running,

    /// The process breached a limit and has been killed. The contained result describes the
    /// breach.
    Breached(RunResult),

    /// The process could not be sampled, usually because it has already exited.
    Unavailable,
}

/// A handle to a started child process.
///
/// The handle owns the child: if it is dropped before the child has been reaped, the child is
/// killed and reaped.
pub struct ProcessHandle {
    /// The pid of the child process.
    pid: Pid,

    /// The instant at which the child process was started.
    started: Instant,

    /// Limits enforced by `check`.
    limits: ProcessResourceLimits,

    /// Accumulated resource usage. `None` until the first successful sample.
    usage: Option<ProcessResourceUsage>,

    /// Exit code of the child process. `None` until the child has been reaped.
    exit_code: Option<i32>,

    stdout: OutputCollector,
    stderr: OutputCollector,
}

impl ProcessHandle {
    /// Create a new `ProcessHandle` taking over the given spawned child.
    pub(crate) fn attach(mut child: Child, limits: ProcessResourceLimits) -> ProcessHandle {
        let pid = Pid::from_raw(child.id() as i32);
        trace!("ProcessHandle::attach to process ID {}", pid.as_raw());

        let stdout = match child.stdout.take() {
            Some(stream) => OutputCollector::start(stream),
            None => OutputCollector::none()
        };
        let stderr = match child.stderr.take() {
            Some(stream) => OutputCollector::start(stream),
            None => OutputCollector::none()
        };

        ProcessHandle {
            pid,
            started: Instant::now(),
            limits,
            usage: None,
            exit_code: None,
            stdout,
            stderr
        }
    }

    /// Get the ID of the child process.
    pub fn pid(&self) -> i32 {
        self.pid.as_raw()
    }

    /// Get the wall clock time elapsed since the child process was started.
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Get the limits enforced on this process.
    pub fn limits(&self) -> &ProcessResourceLimits {
        &self.limits
    }

    /// Get the accumulated resource usage, if the process has been sampled at least once.
    pub fn usage(&self) -> Option<ProcessResourceUsage> {
        self.usage
    }

    /// Get the peak usage, if the process has been sampled at least once.
    pub fn peak(&self) -> Option<PeakUsage> {
        self.usage.map(|usage| PeakUsage {
            time: usage.cpu_time(),
            memory: usage.peak_resident_set_size
        })
    }

    /// Get the exit code of the process, available once it has been reaped. A process killed by
    /// signal `n` has exit code `-n`.
    pub fn exit_code(&self) -> Option<i32> {
        self.exit_code
    }

    fn set_exit_code(&mut self, code: i32) {
        trace!("Process {} reaped with exit code {}", self.pid, code);
        self.exit_code = Some(code);
    }

    /// Reap the child process if it has exited, without blocking. Returns `true` once the child
    /// has been reaped.
    fn try_wait(&mut self) -> Result<bool> {
        if self.exit_code.is_some() {
            return Ok(true);
        }

        match nix::sys::wait::waitpid(self.pid, Some(WaitPidFlag::WNOHANG)) {
            Ok(WaitStatus::Exited(_, code)) => self.set_exit_code(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => self.set_exit_code(-(sig as i32)),
            Ok(..) => return Ok(false),
            Err(nix::Error::Sys(Errno::EINTR)) => return Ok(false),
            Err(e) => return Err(e.into())
        };

        Ok(true)
    }

    /// Block until the child process has been reaped.
    fn wait(&mut self) -> Result<()> {
        while self.exit_code.is_none() {
            match nix::sys::wait::waitpid(self.pid, None) {
                Ok(WaitStatus::Exited(_, code)) => self.set_exit_code(code),
                Ok(WaitStatus::Signaled(_, sig, _)) => self.set_exit_code(-(sig as i32)),
                Ok(..) | Err(nix::Error::Sys(Errno::EINTR)) => (),
                Err(e) => return Err(e.into())
            };
        }

        Ok(())
    }

    /// Wait for the child process to be reaped, until the given deadline. `None` waits without a
    /// bound.
    fn wait_until(&mut self, deadline: Option<Instant>) -> Result<bool> {
        loop {
            if self.try_wait()? {
                return Ok(true);
            }

            let deadline = match deadline {
                Some(deadline) => deadline,
                None => {
                    self.wait()?;
                    return Ok(true);
                }
            };

            let now = Instant::now();
            if now >= deadline {
                return Ok(false);
            }
            std::thread::sleep(std::cmp::min(REAP_INTERVAL, deadline - now));
        }
    }

    /// Wait, at most for the given timeout, for the process to exit and for its captured streams
    /// to reach EOF. Returns `None` if the timeout expired first; `Some(output)` otherwise. A
    /// timeout of `None` waits without a bound.
    pub fn communicate(&mut self, timeout: Option<Duration>) -> Result<Option<ProcessOutput>> {
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        if !self.wait_until(deadline)? {
            return Ok(None);
        }

        for collector in [&mut self.stdout, &mut self.stderr].iter_mut() {
            let remaining = deadline.map(|deadline| {
                deadline.checked_duration_since(Instant::now()).unwrap_or_default()
            });
            if !collector.poll(remaining)? {
                return Ok(None);
            }
        }

        Ok(Some(ProcessOutput {
            stdout: self.stdout.data.clone(),
            stderr: self.stderr.data.clone()
        }))
    }

    /// Sample the resource usage of the process and check it against the limits. A process that
    /// breaches a limit is killed before this function returns.
    ///
    /// Once the process has been reaped only the idleness limit is checked, and only while its
    /// captured streams are still open, e.g. held by a descendant.
    pub fn check(&mut self) -> ProcessCheck {
        if self.exit_code.is_some() {
            if !self.stdout.is_pending() && !self.stderr.is_pending() {
                return ProcessCheck::Unavailable;
            }
            return match check_idleness(&self.limits, self.started.elapsed()) {
                Some(result) => {
                    debug!("Output of process {} still open past its idleness limit", self.pid);
                    ProcessCheck::Breached(result.with_peak(self.peak()))
                },
                None => ProcessCheck::Unavailable
            };
        }

        let sample = match ProcessResourceUsage::usage_of(self.pid) {
            Ok(sample) => sample,
            Err(e) => {
                trace!("Cannot sample process {}: {}", self.pid, e);
                return ProcessCheck::Unavailable;
            }
        };

        let usage = match self.usage {
            Some(ref mut usage) => {
                usage.update(&sample);
                *usage
            },
            None => {
                self.usage = Some(sample);
                sample
            }
        };
        trace!("Process {} resource usage: {:?}", self.pid, usage);

        match check_limits(&self.limits, &usage, self.started.elapsed()) {
            Some(result) => {
                debug!("Process {} breached its limits: {:?}", self.pid, result.comment());
                self.kill();
                ProcessCheck::Breached(result.with_peak(self.peak()))
            },
            None => ProcessCheck::Running
        }
    }

    /// Reap the process and collect whatever its captured streams produced. Streams still open
    /// after the given timeout, e.g. because a descendant inherited them, are abandoned and
    /// reported as `None`. A timeout of `None` waits without a bound.
    pub fn finish(&mut self, timeout: Option<Duration>) -> Result<ProcessOutput> {
        self.wait()?;

        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let pid = self.pid;
        for collector in [&mut self.stdout, &mut self.stderr].iter_mut() {
            let remaining = deadline.map(|deadline| {
                deadline.checked_duration_since(Instant::now()).unwrap_or_default()
            });
            if !collector.poll(remaining)? {
                debug!("Abandon output of process {}: stream still open", pid);
                collector.abandon();
            }
        }

        Ok(ProcessOutput {
            stdout: self.stdout.data.clone(),
            stderr: self.stderr.data.clone()
        })
    }

    /// Kill the child process with `SIGKILL`. Killing a process that has already exited or been
    /// killed does nothing.
    pub fn kill(&mut self) {
        if self.exit_code.is_some() {
            return;
        }

        match nix::sys::signal::kill(self.pid, Signal::SIGKILL) {
            Ok(..) | Err(nix::Error::Sys(Errno::ESRCH)) => (),
            Err(e) => warn!("cannot kill process {}: {}", self.pid, e)
        };
    }
}

impl Drop for ProcessHandle {
    fn drop(&mut self) {
        if self.exit_code.is_none() {
            self.kill();
            if let Err(e) = self.wait() {
                warn!("cannot reap process {}: {}", self.pid, e);
            }
        }
    }
}

/// Checks that the process does not exceed the given limits, in the order CPU time, idleness and
/// memory. Returns the result describing the first breached limit.
fn check_limits(limits: &ProcessResourceLimits, usage: &ProcessResourceUsage,
    elapsed: Duration) -> Option<RunResult> {
    if let Some(cpu_time_limit) = limits.cpu_time_limit {
        if usage.cpu_time() > cpu_time_limit {
            return Some(RunResult::time_limit_exceeded(
                format!("cpu usage: {:.2}", usage.cpu_time().as_secs_f64())));
        }
    }

    if let Some(result) = check_idleness(limits, elapsed) {
        return Some(result);
    }

    if let Some(memory_limit) = limits.memory_limit {
        if usage.resident_set_size > memory_limit {
            return Some(RunResult::memory_limit_exceeded(
                format!("memory usage: {}", usage.resident_set_size.bytes())));
        }
    }

    None
}

fn check_idleness(limits: &ProcessResourceLimits, elapsed: Duration) -> Option<RunResult> {
    match limits.idle_time_limit {
        Some(idle_time_limit) if elapsed > idle_time_limit => Some(
            RunResult::idleness_limit_exceeded(format!("time usage: {:.2}", elapsed.as_secs_f64()))),
        _ => None
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemorySize, ProcessBuilder, Redirection, RunOutcome};

    fn usage(cpu_ms: u64, rss: usize) -> ProcessResourceUsage {
        ProcessResourceUsage {
            user_cpu_time: Duration::from_millis(cpu_ms),
            kernel_cpu_time: Duration::new(0, 0),
            resident_set_size: MemorySize::Bytes(rss),
            peak_resident_set_size: MemorySize::Bytes(rss)
        }
    }

    #[test]
    fn test_check_limits_order() {
        let limits = ProcessResourceLimits {
            cpu_time_limit: Some(Duration::from_millis(100)),
            idle_time_limit: Some(Duration::from_millis(100)),
            memory_limit: Some(MemorySize::Bytes(100))
        };

        let result = check_limits(&limits, &usage(200, 200), Duration::from_millis(200)).unwrap();
        assert_eq!(RunOutcome::TimeLimitExceeded, result.outcome());
        assert_eq!(Some("cpu usage: 0.20"), result.comment());

        let result = check_limits(&limits, &usage(50, 200), Duration::from_millis(200)).unwrap();
        assert_eq!(RunOutcome::IdlenessLimitExceeded, result.outcome());

        let result = check_limits(&limits, &usage(50, 200), Duration::from_millis(50)).unwrap();
        assert_eq!(RunOutcome::MemoryLimitExceeded, result.outcome());
        assert_eq!(Some("memory usage: 200"), result.comment());
    }

    #[test]
    fn test_check_limits_is_strict() {
        let limits = ProcessResourceLimits {
            cpu_time_limit: Some(Duration::from_millis(100)),
            idle_time_limit: None,
            memory_limit: Some(MemorySize::Bytes(100))
        };
        assert!(check_limits(&limits, &usage(100, 100), Duration::from_secs(100)).is_none());
    }

    #[test]
    fn test_communicate_captures_output() {
        let mut builder = ProcessBuilder::from_command(vec!["sh", "-c", "echo out; echo err >&2"])
            .unwrap();
        builder.redirections.stdout = Redirection::Capture;
        builder.redirections.stderr = Redirection::Capture;

        let mut process = builder.start().unwrap();
        let output = process.communicate(None).unwrap().unwrap();
        assert_eq!(Some(0), process.exit_code());
        assert_eq!(Some(&b"out\n"[..]), output.stdout.as_ref().map(Vec::as_slice));
        assert_eq!(Some(&b"err\n"[..]), output.stderr.as_ref().map(Vec::as_slice));
    }

    #[test]
    fn test_communicate_times_out() {
        let mut process = ProcessBuilder::from_command(vec!["sleep", "5"]).unwrap()
            .start().unwrap();
        assert!(process.communicate(Some(Duration::from_millis(20))).unwrap().is_none());
        assert!(process.exit_code().is_none());

        process.kill();
        process.communicate(None).unwrap().unwrap();
        assert_eq!(Some(-(Signal::SIGKILL as i32)), process.exit_code());
    }

    #[test]
    fn test_kill_is_idempotent() {
        let mut process = ProcessBuilder::from_command(vec!["sleep", "5"]).unwrap()
            .start().unwrap();
        process.kill();
        process.kill();
        process.communicate(None).unwrap();
        process.kill();
        assert!(process.exit_code().is_some());
    }

    #[test]
    fn test_check_after_exit_is_unavailable() {
        let mut process = ProcessBuilder::new("true").start().unwrap();
        process.communicate(None).unwrap();
        match process.check() {
            ProcessCheck::Unavailable => (),
            check => panic!("unexpected check result: {:?}", check)
        }
    }

    #[test]
    fn test_check_after_exit_enforces_idleness() {
        let mut builder = ProcessBuilder::from_command(vec!["sh", "-c", "sleep 3 & exit 0"])
            .unwrap();
        builder.redirections.stdout = Redirection::Capture;
        builder.limits.idle_time_limit = Some(Duration::from_millis(200));

        let mut process = builder.start().unwrap();
        assert!(process.communicate(Some(Duration::from_millis(500))).unwrap().is_none());
        assert_eq!(Some(0), process.exit_code());
        match process.check() {
            ProcessCheck::Breached(result) =>
                assert_eq!(RunOutcome::IdlenessLimitExceeded, result.outcome()),
            check => panic!("unexpected check result: {:?}", check)
        }

        let start = Instant::now();
        let output = process.finish(Some(Duration::from_millis(100))).unwrap();
        assert!(start.elapsed() < Duration::from_secs(1));
        assert_eq!(None, output.stdout);
    }

    #[test]
    fn test_sample_before_reap() {
        let mut process = ProcessBuilder::new("true").start().unwrap();
        std::thread::sleep(Duration::from_millis(50));
        match process.check() {
            ProcessCheck::Running => (),
            check => panic!("unexpected check result: {:?}", check)
        }
        process.communicate(None).unwrap().unwrap();
        assert!(process.peak().is_some());
    }

    #[test]
    fn test_breached_process_is_killed() {
        let mut builder = ProcessBuilder::from_command(vec!["sh", "-c", "while :; do :; done"])
            .unwrap();
        builder.limits.cpu_time_limit = Some(Duration::from_millis(100));
        builder.limits.idle_time_limit = Some(Duration::from_secs(10));

        let mut process = builder.start().unwrap();
        let pid = process.pid();
        let result = loop {
            if let ProcessCheck::Breached(result) = process.check() {
                break result;
            }
            std::thread::sleep(Duration::from_millis(10));
        };
        assert_eq!(RunOutcome::TimeLimitExceeded, result.outcome());

        process.communicate(None).unwrap();
        assert_eq!(Some(-(Signal::SIGKILL as i32)), process.exit_code());
        assert!(!std::path::Path::new(&format!("/proc/{}", pid)).exists());
    }
}
