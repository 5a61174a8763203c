//! Fork/exec plumbing for a single pipeline stage.
//!
//! Everything that runs on the child side of a fork lives here. The child
//! never returns into the caller's code: it either becomes the target
//! program, or reports the failure on its standard error and `_exit`s.

use crate::builtin::Builtin;
use crate::command::{ArgVector, ExitCode};
use crate::error::{ShellError, exec_reason};
use crate::io_adapters::{Input, Output, RawStdio};
use nix::errno::Errno;
use nix::sys::signal::{SigHandler, Signal, signal};
use nix::sys::wait::{WaitStatus, waitpid};
use nix::unistd::{ForkResult, Pid, execvp, fork};
use std::ffi::CString;
use std::io::{self, Write};
use tracing::debug;

/// Exit status of a child whose program could not be found.
pub const STATUS_NOT_FOUND: ExitCode = 127;
/// Exit status of a child whose program was found but could not be run.
pub const STATUS_NOT_EXECUTABLE: ExitCode = 126;

/// Start `argv` in a new child process with the given standard input and
/// output.
///
/// Returns as soon as the child exists; the parent's copies of `input` and
/// `output` are closed before this returns, whether or not the fork worked.
pub fn spawn(input: Input, output: Output, argv: &ArgVector) -> Result<Pid, ShellError> {
    let c_args = argv.to_c_strings()?;
    fork_stage(argv.program(), input, output, || {
        let errno = exec(&c_args);
        report_exec_failure(argv.program(), errno)
    })
}

/// Like [`spawn`], but the child runs `builtin` instead of a program.
///
/// Whatever the builtin changes (the working directory for `cd`) changes in
/// the child only.
pub fn spawn_builtin(
    input: Input,
    output: Output,
    builtin: Builtin,
    argv: &ArgVector,
) -> Result<Pid, ShellError> {
    fork_stage(argv.program(), input, output, || {
        builtin.execute(argv, &mut RawStdio::stdout(), &mut RawStdio::stderr())
    })
}

/// Bind `input`/`output` in the calling process and replace its image with
/// `argv`.
///
/// Only returns on failure.
pub fn replace_process(input: Input, output: Output, argv: &ArgVector) -> ShellError {
    let c_args = match argv.to_c_strings() {
        Ok(c_args) => c_args,
        Err(e) => return e,
    };
    flush_std();
    let errno = match input.bind().and_then(|()| output.bind()) {
        Ok(()) => exec(&c_args),
        Err(errno) => errno,
    };
    ShellError::Exec {
        program: argv.program().to_string(),
        source: errno,
    }
}

/// Block until `pid` terminates and translate its wait status.
pub fn wait_for(pid: Pid) -> Result<ExitCode, ShellError> {
    loop {
        match waitpid(pid, None) {
            Ok(WaitStatus::Exited(_, code)) => return Ok(code),
            Ok(WaitStatus::Signaled(_, sig, _)) => return Ok(128 + sig as i32),
            Ok(_) | Err(Errno::EINTR) => continue,
            Err(source) => return Err(ShellError::Wait { pid, source }),
        }
    }
}

fn fork_stage<F>(program: &str, input: Input, output: Output, in_child: F) -> Result<Pid, ShellError>
where
    F: FnOnce() -> ExitCode,
{
    // Anything still buffered would otherwise be written twice.
    flush_std();
    match unsafe { fork() } {
        Ok(ForkResult::Parent { child }) => {
            drop(input);
            drop(output);
            debug!(pid = %child, program, "spawned stage");
            Ok(child)
        }
        Ok(ForkResult::Child) => {
            let code = match input.bind().and_then(|()| output.bind()) {
                Ok(()) => in_child(),
                Err(errno) => {
                    let _ = writeln!(
                        RawStdio::stderr(),
                        "pipesh: {}: can't set up descriptors: {}",
                        program,
                        errno.desc()
                    );
                    STATUS_NOT_EXECUTABLE
                }
            };
            unsafe { libc::_exit(code) }
        }
        Err(source) => Err(ShellError::Spawn {
            program: program.to_string(),
            source,
        }),
    }
}

fn exec(c_args: &[CString]) -> Errno {
    // The Rust runtime ignores SIGPIPE and exec keeps ignored signals
    // ignored; programs expect the default.
    let _ = unsafe { signal(Signal::SIGPIPE, SigHandler::SigDfl) };
    match execvp(&c_args[0], c_args) {
        Ok(never) => match never {},
        Err(errno) => errno,
    }
}

fn report_exec_failure(program: &str, errno: Errno) -> ExitCode {
    let _ = writeln!(RawStdio::stderr(), "pipesh: {}: {}", program, exec_reason(&errno));
    match errno {
        Errno::ENOENT => STATUS_NOT_FOUND,
        _ => STATUS_NOT_EXECUTABLE,
    }
}

fn flush_std() {
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();
}
