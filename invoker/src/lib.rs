//! This crate implements the invoker of the problem development harness. The invoker is
//! responsible for executing solutions, generators, validators, checkers and interactors while
//! watching their resource consumption.
//!
//! The invoker implements:
//!
//! * Normal process operations: build, start, sample, kill and reap a process;
//!
//! * Resource limits: CPU time limits, idleness (wall clock) limits and memory limits, enforced by
//! polling the process accounting files under `/proc`;
//!
//! * Redirections: redirects stdin, stdout and stderr of child processes to files, pipes, the null
//! device or capture buffers;
//!
//! * Interaction: wires a solution and an interactor to each other through a pair of pipes and
//! watches both of them at once.
//!
//! The invoker is a watchdog, not a security boundary: it does not isolate the child processes in
//! any way.
//!

#[macro_use]
extern crate log;
#[macro_use]
extern crate error_chain;
extern crate libc;
extern crate nix;
extern crate procinfo;

#[cfg(feature = "serde")]
extern crate serde;


mod executable;
mod misc;
mod pipe;
mod process;
mod result;
mod runner;
mod usage;

use std::cmp::Ordering;
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Serialize, Deserialize};

pub use executable::Executable;
pub use pipe::Pipe;
pub use process::{ProcessCheck, ProcessHandle, ProcessOutput};
pub use result::{PeakUsage, RunOutcome, RunResult};
pub use runner::{Runner, RunnerMode};
pub use usage::ProcessResourceUsage;

error_chain! {
    types {
        Error, ErrorKind, ResultExt, Result;
    }

    foreign_links {
        Io(::std::io::Error);
        Nix(::nix::Error);
    }

    errors {
        InvalidProcessArgument(arg: String) {
            description("invalid argument to subprocess")
            display("invalid argument to subprocess: \"{}\"", arg)
        }

        InvalidEnvironmentVariable(name: String) {
            description("invalid environment variable to subprocess")
            display("invalid environment variable to subprocess: \"{}\"", name)
        }

        EmptyCommand {
            description("empty command line")
        }

        InvalidRedirection(reason: String) {
            description("invalid redirection")
            display("invalid redirection: {}", reason)
        }

        ChildStartupFailed(program: String) {
            description("failed to launch child process")
            display("failed to launch child process: {}", program)
        }

        OutputReaderFailed {
            description("failed to collect output of child process")
        }
    }
}


/// Measurement of the size of a block of memory.
#[derive(Clone, Copy, Debug, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum MemorySize {
    /// Measurement in bytes.
    Bytes(usize),

    /// Measurement in kilobytes.
    KiloBytes(usize),

    /// Measurement in megabytes.
    MegaBytes(usize),

    /// Measurement in gigabytes.
    GigaBytes(usize),

    /// Measurement in terabytes.
    TeraBytes(usize)
}

impl MemorySize {
    /// Convert the current measurement to memory size in bytes. Returns `None` if the size does
    /// not fit in a `usize`.
    pub fn checked_bytes(&self) -> Option<usize> {
        match *self {
            MemorySize::Bytes(s) => Some(s),
            MemorySize::KiloBytes(s) => s.checked_mul(1 << 10),
            MemorySize::MegaBytes(s) => s.checked_mul(1 << 20),
            MemorySize::GigaBytes(s) => s.checked_mul(1 << 30),
            MemorySize::TeraBytes(s) => s.checked_mul(1 << 40)
        }
    }

    /// Convert the current measurement to memory size in bytes, saturating at `usize::MAX`.
    pub fn bytes(&self) -> usize {
        self.checked_bytes().unwrap_or(std::usize::MAX)
    }

    /// Get the measurement in mebibytes, as used in progress lines.
    pub fn mebibytes(&self) -> f64 {
        self.bytes() as f64 / (1024.0 * 1024.0)
    }
}

impl PartialEq for MemorySize {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl PartialOrd for MemorySize {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MemorySize {
    fn cmp(&self, other: &Self) -> Ordering {
        self.bytes().cmp(&other.bytes())
    }
}

impl From<usize> for MemorySize {
    fn from(value: usize) -> MemorySize {
        MemorySize::Bytes(value)
    }
}

impl Display for MemorySize {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            MemorySize::Bytes(s) => f.write_fmt(format_args!("{} B", s)),
            MemorySize::KiloBytes(s) => f.write_fmt(format_args!("{} KB", s)),
            MemorySize::MegaBytes(s) => f.write_fmt(format_args!("{} MB", s)),
            MemorySize::GigaBytes(s) => f.write_fmt(format_args!("{} GB", s)),
            MemorySize::TeraBytes(s) => f.write_fmt(format_args!("{} TB", s))
        }
    }
}

/// Specify limits on time and memory resources.
#[derive(Clone, Copy, Debug)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ProcessResourceLimits {
    /// Limit on CPU time (user plus kernel) available for the child process. `None` if no
    /// constraits are set.
    pub cpu_time_limit: Option<Duration>,

    /// Limit on wall clock time since the child process was started. `None` if no constraits are
    /// set.
    pub idle_time_limit: Option<Duration>,

    /// Limit on resident memory available for the child process. `None` if no constraits are set.
    pub memory_limit: Option<MemorySize>
}

impl ProcessResourceLimits {
    /// Create a new `ProcessResourceLimits` instance that contains no constraits.
    pub fn empty() -> Self {
        ProcessResourceLimits {
            cpu_time_limit: None,
            idle_time_limit: None,
            memory_limit: None
        }
    }

    /// Determine whether any constraint is set.
    pub fn is_empty(&self) -> bool {
        self.cpu_time_limit.is_none()
            && self.idle_time_limit.is_none()
            && self.memory_limit.is_none()
    }
}

impl Default for ProcessResourceLimits {
    fn default() -> Self {
        ProcessResourceLimits::empty()
    }
}

/// Target of one redirected standard stream.
#[derive(Debug)]
pub enum Redirection {
    /// The child process shares the stream with the calling process.
    Inherit,

    /// The stream is connected to the null device.
    Null,

    /// The stream is connected to the file at the given path. The file is opened for reading when
    /// used as `stdin` and created (or truncated) for writing otherwise.
    File(PathBuf),

    /// The stream is connected to an already opened file, e.g. one end of a `Pipe`.
    Handle(File),

    /// The stream is collected into a buffer available in the run result. Not allowed for `stdin`.
    Capture,
}

impl Redirection {
    /// Convert this redirection into a `Stdio` for the stream with the given name.
    fn into_stdio(self, stream: &str) -> Result<Stdio> {
        match self {
            Redirection::Inherit => Ok(Stdio::inherit()),
            Redirection::Null => Ok(Stdio::null()),
            Redirection::File(path) => {
                let file = if stream == "stdin" {
                    File::open(&path)
                } else {
                    File::create(&path)
                };
                let file = file.chain_err(|| ErrorKind::InvalidRedirection(
                    format!("cannot open {} for {}", path.display(), stream)))?;
                Ok(Stdio::from(file))
            },
            Redirection::Handle(file) => Ok(Stdio::from(file)),
            Redirection::Capture => {
                if stream == "stdin" {
                    bail!(ErrorKind::InvalidRedirection(String::from("stdin cannot be captured")));
                }
                Ok(Stdio::piped())
            }
        }
    }
}

impl Default for Redirection {
    fn default() -> Self {
        Redirection::Inherit
    }
}

/// Specify redirections of standard streams.
#[derive(Debug, Default)]
pub struct ProcessRedirection {
    /// Redirected `stdin`.
    pub stdin: Redirection,

    /// Redirected `stdout`.
    pub stdout: Redirection,

    /// Redirected `stderr`.
    pub stderr: Redirection
}

/// Provide mechanism to build a monitored child process.
#[derive(Debug)]
pub struct ProcessBuilder {
    /// Path to the executable file.
    file: PathBuf,

    /// Arguments passed to the child process, not including the executable itself.
    args: Vec<String>,

    /// Environment variables added to the inherited environment of the child process.
    envs: Vec<(String, String)>,

    /// Working directory of the child process.
    pub working_dir: Option<PathBuf>,

    /// Limits to be applied to the new child process.
    pub limits: ProcessResourceLimits,

    /// Redirections to be applied to the new child process.
    pub redirections: ProcessRedirection,
}

impl ProcessBuilder {
    /// Create a new `ProcessBuilder` instance, given the executable file's path.
    pub fn new<T>(file: T) -> ProcessBuilder
        where T: Into<PathBuf> {
        ProcessBuilder {
            file: file.into(),
            args: Vec::new(),
            envs: Vec::new(),
            working_dir: None,
            limits: ProcessResourceLimits::empty(),
            redirections: ProcessRedirection::default(),
        }
    }

    /// Create a new `ProcessBuilder` instance from a full command line whose first element is the
    /// program to execute.
    pub fn from_command<I, S>(command: I) -> Result<ProcessBuilder>
        where I: IntoIterator<Item = S>, S: Into<String> {
        let mut command = command.into_iter().map(Into::into);
        let file = match command.next() {
            Some(file) => file,
            None => bail!(ErrorKind::EmptyCommand)
        };

        let mut builder = ProcessBuilder::new(file);
        for arg in command {
            builder.add_arg(arg)?;
        }

        Ok(builder)
    }

    /// Add an argument to the child process. If the given argument is not a valid C-style string,
    /// then returns `Err(e)` where the error kind of `e` is `ErrorKind::InvalidProcessArgument`.
    pub fn add_arg<T>(&mut self, arg: T) -> Result<()>
        where T: Into<String> {
        let arg = arg.into();
        if misc::is_valid_c_string(&arg) {
            self.args.push(arg);
            Ok(())
        } else {
            debug!("Invalid process argument: \"{}\"", arg.escape_debug());
            bail!(ErrorKind::InvalidProcessArgument(arg));
        }
    }

    /// Add an environment variable to the child process.
    pub fn add_env<T1, T2>(&mut self, name: T1, value: T2) -> Result<()>
        where T1: Into<String>, T2: Into<String> {
        let name = name.into();
        let value = value.into();

        if !misc::is_valid_c_string(&name) || !misc::is_valid_c_string(&value) {
            debug!("Invalid environment variable \"{}\": not a valid C string.", name.escape_debug());
            bail!(ErrorKind::InvalidEnvironmentVariable(name));
        }
        if name.is_empty() || name.as_bytes().contains(&b'=') {
            debug!("Invalid environment variable name: \"{}\".", name);
            bail!(ErrorKind::InvalidEnvironmentVariable(name));
        }

        self.envs.push((name, value));
        Ok(())
    }

    /// Get the path to the executable file.
    pub fn file(&self) -> &std::path::Path {
        &self.file
    }

    /// Get the arguments passed to the child process.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Get the full command line, the executable followed by its arguments.
    pub fn command_line(&self) -> String {
        std::iter::once(self.file.display().to_string())
            .chain(self.args.iter().cloned())
            .collect::<Vec<String>>()
            .join(" ")
    }

    /// Start the child process. Any failure that prevents the program from being executed at all
    /// is reported as `Err`; everything that happens after a successful start is reported by the
    /// returned `ProcessHandle`.
    pub fn start(self) -> Result<ProcessHandle> {
        let ProcessBuilder { file, args, envs, working_dir, limits, redirections } = self;

        let mut command = std::process::Command::new(&file);
        command.args(&args)
            .envs(envs)
            .stdin(redirections.stdin.into_stdio("stdin")?)
            .stdout(redirections.stdout.into_stdio("stdout")?)
            .stderr(redirections.stderr.into_stdio("stderr")?);
        if let Some(ref dir) = working_dir {
            command.current_dir(dir);
        }

        trace!("Starting child process: {:?}", command);
        let child = command.spawn()
            .chain_err(|| ErrorKind::ChildStartupFailed(file.display().to_string()))?;

        // `command` owns the parent side copies of redirected handles, which must be closed
        // before the child can observe EOF on its pipes.
        drop(command);

        Ok(ProcessHandle::attach(child, limits))
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_size_to_bytes() {
        assert_eq!(2, MemorySize::Bytes(2).bytes());
        assert_eq!(2 * 1024, MemorySize::KiloBytes(2).bytes());
        assert_eq!(2 * 1024 * 1024, MemorySize::MegaBytes(2).bytes());
        assert_eq!(2 * 1024 * 1024 * 1024, MemorySize::GigaBytes(2).bytes());
        assert_eq!(2 * 1024 * 1024 * 1024 * 1024, MemorySize::TeraBytes(2).bytes());
    }

    #[test]
    fn test_memory_size_overflow_saturates() {
        let size = MemorySize::TeraBytes(99999999);
        assert_eq!(None, size.checked_bytes());
        assert_eq!(std::usize::MAX, size.bytes());
        assert!(size > MemorySize::GigaBytes(1));
    }

    #[test]
    fn test_memory_size_compares_by_bytes() {
        assert_eq!(MemorySize::KiloBytes(1024), MemorySize::MegaBytes(1));
        assert!(MemorySize::Bytes(1024 * 1024 + 1) > MemorySize::MegaBytes(1));
    }

    #[test]
    fn test_builder_from_command() {
        let builder = ProcessBuilder::from_command(vec!["python3", "gen.py", "7"]).unwrap();
        assert_eq!(std::path::Path::new("python3"), builder.file());
        assert_eq!(&["gen.py".to_owned(), "7".to_owned()], builder.args());
        assert_eq!("python3 gen.py 7", builder.command_line());
    }

    #[test]
    fn test_builder_rejects_empty_command() {
        let err = ProcessBuilder::from_command(Vec::<String>::new()).unwrap_err();
        match err.kind() {
            ErrorKind::EmptyCommand => (),
            kind => panic!("unexpected error kind: {:?}", kind)
        }
    }

    #[test]
    fn test_builder_rejects_nul_argument() {
        let mut builder = ProcessBuilder::new("true");
        assert!(builder.add_arg("a\x00b").is_err());
        assert!(builder.add_env("A=B", "c").is_err());
        assert!(builder.add_env("A", "c").is_ok());
    }

    #[test]
    fn test_start_missing_program_fails() {
        let builder = ProcessBuilder::new("/nonexistent/definitely/not/here");
        match builder.start() {
            Err(e) => match e.kind() {
                ErrorKind::ChildStartupFailed(..) => (),
                kind => panic!("unexpected error kind: {:?}", kind)
            },
            Ok(..) => panic!("missing program started")
        }
    }

    #[test]
    fn test_stdin_capture_is_rejected() {
        let mut builder = ProcessBuilder::new("true");
        builder.redirections.stdin = Redirection::Capture;
        assert!(builder.start().is_err());
    }
}
