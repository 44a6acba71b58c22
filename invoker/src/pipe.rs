use std::fs::File;
use std::os::unix::io::{FromRawFd, RawFd};

use nix::fcntl::OFlag;

use super::Result;

/// An anonymous pipe whose ends are closed on `exec`, so that a child process only sees the end
/// that was explicitly redirected to one of its standard streams.
///
/// The first field of the tuple struct is the read end, the second field of the tuple struct is
/// the write end.
#[derive(Debug)]
pub struct Pipe(Option<File>, Option<File>);

impl Pipe {
    /// Create a new `Pipe` instance.
    pub fn new() -> Result<Pipe> {
        let (read_fd, write_fd) = nix::unistd::pipe2(OFlag::O_CLOEXEC)?;
        Ok(Pipe::from_raw_fd(read_fd, write_fd))
    }

    /// Create a new `Pipe` instance whose 2 ends are constructed from raw file descriptors.
    fn from_raw_fd(read_fd: RawFd, write_fd: RawFd) -> Pipe {
        Pipe(
            Some(unsafe { File::from_raw_fd(read_fd) }),
            Some(unsafe { File::from_raw_fd(write_fd) })
        )
    }

    /// Take ownership of the read end of the pipe, leaving `None` in the corresponding slot in
    /// this `Pipe` instance.
    pub fn take_read_end(&mut self) -> Option<File> {
        self.0.take()
    }

    /// Take ownership of the write end of the pipe, leaving `None` in the corresponding slot in
    /// this `Pipe` instance.
    pub fn take_write_end(&mut self) -> Option<File> {
        self.1.take()
    }

    /// Consume the pipe and get both ends, read end first.
    pub fn into_ends(mut self) -> (Option<File>, Option<File>) {
        (self.take_read_end(), self.take_write_end())
    }
}
