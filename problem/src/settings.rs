//! This module implements limit and file settings of problems and solutions.
//!

use std::fmt::{Display, Formatter};
use std::time::Duration;

use invoker::{MemorySize, ProcessResourceLimits};

use crate::{ErrorKind, Result};

/// Default CPU time limit.
pub const DEFAULT_TIME_LIMIT: Duration = Duration::from_secs(5);

/// Default idleness limit.
pub const DEFAULT_IDLE_LIMIT: Duration = Duration::from_secs(10);

/// Default memory limit, in mebibytes.
pub const DEFAULT_MEMORY_LIMIT_MB: usize = 768;

/// Name of the file a program reads its input from or writes its output to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FileName {
    /// Standard input or standard output.
    Std,

    /// A named file inside the working directory of the program.
    Name(String),
}

impl FileName {
    /// Parse a file name. `<std>`, `<stdin>` and `<stdout>` denote the standard streams.
    pub fn parse(value: &str) -> FileName {
        match value {
            "<std>" | "<stdin>" | "<stdout>" => FileName::Std,
            name => FileName::Name(name.to_owned())
        }
    }

    /// Determine whether this file name denotes a standard stream.
    pub fn is_std(&self) -> bool {
        *self == FileName::Std
    }
}

impl Display for FileName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            FileName::Std => f.write_str("<std>"),
            FileName::Name(name) => f.write_str(name)
        }
    }
}

/// Parse a memory size such as `256M`. Accepted suffixes are `K`, `M`, `G` and `T`, all of them
/// powers of 1024; a bare number is a number of bytes.
pub fn parse_memory(value: &str) -> Result<MemorySize> {
    let value = value.trim();
    let (number, suffix) = match value.char_indices().last() {
        Some((pos, c)) if "KMGT".contains(c) => (&value[..pos], Some(c)),
        _ => (value, None)
    };

    let number = match number.parse::<usize>() {
        Ok(number) => number,
        Err(..) => bail!(ErrorKind::InvalidMemorySize(value.to_owned()))
    };

    let size = match suffix {
        Some('K') => MemorySize::KiloBytes(number),
        Some('M') => MemorySize::MegaBytes(number),
        Some('G') => MemorySize::GigaBytes(number),
        Some('T') => MemorySize::TeraBytes(number),
        _ => MemorySize::Bytes(number)
    };
    if size.checked_bytes().is_none() {
        bail!(ErrorKind::InvalidMemorySize(value.to_owned()));
    }

    Ok(size)
}

/// Limits and file names used when running a program. Every field is optional: an unset field
/// falls back to the same field of a parent `Settings`, see `Settings::fallback`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Settings {
    /// CPU time limit.
    pub limit_time: Option<Duration>,

    /// Idleness (wall clock) limit.
    pub limit_idle: Option<Duration>,

    /// Memory limit.
    pub limit_memory: Option<MemorySize>,

    /// Input file name.
    pub input: Option<FileName>,

    /// Output file name.
    pub output: Option<FileName>,
}

impl Settings {
    /// Create a new `Settings` instance with every field unset.
    pub fn new() -> Settings {
        Settings::default()
    }

    /// Create a new `Settings` instance holding the default value of every field.
    pub fn defaults() -> Settings {
        Settings {
            limit_time: Some(DEFAULT_TIME_LIMIT),
            limit_idle: Some(DEFAULT_IDLE_LIMIT),
            limit_memory: Some(MemorySize::MegaBytes(DEFAULT_MEMORY_LIMIT_MB)),
            input: Some(FileName::Std),
            output: Some(FileName::Std)
        }
    }

    /// Create a new `Settings` instance whose unset fields are taken from `parent`.
    pub fn fallback(&self, parent: &Settings) -> Settings {
        Settings {
            limit_time: self.limit_time.or(parent.limit_time),
            limit_idle: self.limit_idle.or(parent.limit_idle),
            limit_memory: self.limit_memory.or(parent.limit_memory),
            input: self.input.clone().or_else(|| parent.input.clone()),
            output: self.output.clone().or_else(|| parent.output.clone())
        }
    }

    /// Get the resource limits described by this instance.
    pub fn limits(&self) -> ProcessResourceLimits {
        ProcessResourceLimits {
            cpu_time_limit: self.limit_time,
            idle_time_limit: self.limit_idle,
            memory_limit: self.limit_memory
        }
    }

    /// Get the input file name, standard input if unset.
    pub fn input(&self) -> FileName {
        self.input.clone().unwrap_or(FileName::Std)
    }

    /// Get the output file name, standard output if unset.
    pub fn output(&self) -> FileName {
        self.output.clone().unwrap_or(FileName::Std)
    }
}
