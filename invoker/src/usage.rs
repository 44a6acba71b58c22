//! This module samples resource usage of running processes from the accounting files under
//! `/proc`.
//!

use std::time::Duration;

use nix::unistd::Pid;

use super::MemorySize;
use super::misc;

/// Resource usage statistics of a process, as observed by the polling loop.
#[derive(Clone, Copy, Debug)]
pub struct ProcessResourceUsage {
    /// CPU time spent in user mode.
    pub user_cpu_time: Duration,

    /// CPU time spent in kernel mode.
    pub kernel_cpu_time: Duration,

    /// Resident set size observed by the latest sample.
    pub resident_set_size: MemorySize,

    /// Largest resident set size ever observed.
    pub peak_resident_set_size: MemorySize,
}

impl ProcessResourceUsage {
    /// Create an empty `ProcessResourceUsage` instance.
    pub fn new() -> Self {
        ProcessResourceUsage {
            user_cpu_time: Duration::new(0, 0),
            kernel_cpu_time: Duration::new(0, 0),
            resident_set_size: MemorySize::Bytes(0),
            peak_resident_set_size: MemorySize::Bytes(0)
        }
    }

    /// Get resource usage for the specified process.
    ///
    /// CPU times come from fields 14 and 15 of `/proc/[pid]/stat`; the resident set size comes from
    /// `/proc/[pid]/statm` and is converted from pages to bytes.
    pub fn usage_of(pid: Pid) -> std::io::Result<Self> {
        let stat = procinfo::pid::stat(pid.as_raw())?;
        let statm = procinfo::pid::statm(pid.as_raw())?;
        let rss = MemorySize::Bytes(statm.resident * misc::page_size());

        Ok(ProcessResourceUsage {
            user_cpu_time: misc::duration_from_clocks(stat.utime),
            kernel_cpu_time: misc::duration_from_clocks(stat.stime),
            resident_set_size: rss,
            peak_resident_set_size: rss
        })
    }

    /// Get the total CPU time consumed, a.k.a. the sum of the user CPU time and
    /// the kernel CPU time.
    pub fn cpu_time(&self) -> Duration {
        self.user_cpu_time + self.kernel_cpu_time
    }

    /// Merge a newer sample into this instance. CPU times and the peak never decrease; the current
    /// resident set size follows the newer sample.
    pub fn update(&mut self, other: &Self) {
        if other.user_cpu_time > self.user_cpu_time {
            self.user_cpu_time = other.user_cpu_time;
        }
        if other.kernel_cpu_time > self.kernel_cpu_time {
            self.kernel_cpu_time = other.kernel_cpu_time;
        }
        if other.peak_resident_set_size > self.peak_resident_set_size {
            self.peak_resident_set_size = other.peak_resident_set_size;
        }
        self.resident_set_size = other.resident_set_size;
    }
}

impl Default for ProcessResourceUsage {
    fn default() -> Self {
        ProcessResourceUsage::new()
    }
}
