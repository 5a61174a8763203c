use nix::fcntl::{FcntlArg, FdFlag, fcntl};
use nix::unistd::dup2;
use std::fs::File;
use std::io::{self, Write};
use std::mem::ManuallyDrop;
use std::os::fd::{AsRawFd, FromRawFd, IntoRawFd, OwnedFd, RawFd};

/// Where a stage reads its standard input from.
///
/// A bound descriptor is owned: it is closed when the binding is dropped,
/// unless it was consumed by [`Input::bind`].
#[derive(Debug)]
pub enum Input {
    /// Keep whatever standard input the process already has.
    Inherit,
    /// Duplicate this descriptor onto standard input.
    Fd(OwnedFd),
}

/// Where a stage writes its standard output to.
#[derive(Debug)]
pub enum Output {
    /// Keep whatever standard output the process already has.
    Inherit,
    /// Duplicate this descriptor onto standard output.
    Fd(OwnedFd),
}

impl Input {
    /// Rebind the calling process's standard input, closing the original
    /// descriptor afterwards.
    pub(crate) fn bind(self) -> nix::Result<()> {
        match self {
            Input::Inherit => Ok(()),
            Input::Fd(fd) => bind_onto(fd, libc::STDIN_FILENO),
        }
    }
}

impl Output {
    /// Rebind the calling process's standard output, closing the original
    /// descriptor afterwards.
    pub(crate) fn bind(self) -> nix::Result<()> {
        match self {
            Output::Inherit => Ok(()),
            Output::Fd(fd) => bind_onto(fd, libc::STDOUT_FILENO),
        }
    }

    /// Writer for a stage that runs inside the current process.
    pub(crate) fn into_writer(self) -> Box<dyn Write> {
        match self {
            Output::Inherit => Box::new(io::stdout()),
            Output::Fd(fd) => Box::new(File::from(fd)),
        }
    }
}

fn bind_onto(fd: OwnedFd, slot: RawFd) -> nix::Result<()> {
    if fd.as_raw_fd() == slot {
        // Already in place; keep it open across exec.
        let raw = fd.into_raw_fd();
        fcntl(raw, FcntlArg::F_SETFD(FdFlag::empty()))?;
        return Ok(());
    }
    dup2(fd.as_raw_fd(), slot)?;
    drop(fd);
    Ok(())
}

/// Unbuffered writer over one of the standard descriptors.
///
/// Used in forked children, where the std handles' locks may have been held
/// by another thread at fork time. The descriptor is never closed.
pub(crate) struct RawStdio(ManuallyDrop<File>);

impl RawStdio {
    pub(crate) fn stdout() -> Self {
        Self(ManuallyDrop::new(unsafe {
            File::from_raw_fd(libc::STDOUT_FILENO)
        }))
    }

    pub(crate) fn stderr() -> Self {
        Self(ManuallyDrop::new(unsafe {
            File::from_raw_fd(libc::STDERR_FILENO)
        }))
    }
}

impl Write for RawStdio {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        (&*self.0).write(data)
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
