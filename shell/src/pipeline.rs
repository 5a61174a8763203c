use crate::builtin::{Builtin, try_builtin};
use crate::command::{ArgVector, ExitCode};
use crate::error::ShellError;
use crate::io_adapters::{Input, Output};
use crate::spawner::{replace_process, spawn, spawn_builtin, wait_for};
use nix::fcntl::OFlag;
use nix::unistd::{Pid, pipe2};
use std::io;
use tracing::{debug, warn};

/// Ordered list of stages, each one reading the previous stage's output.
///
/// A pipeline always has at least one stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pipeline {
    stages: Vec<ArgVector>,
}

impl Pipeline {
    pub fn new(stages: Vec<ArgVector>) -> Result<Self, ShellError> {
        if stages.is_empty() {
            return Err(ShellError::EmptyPipeline);
        }
        Ok(Self { stages })
    }

    pub fn stages(&self) -> &[ArgVector] {
        &self.stages
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Run every stage in its own child process, with the shell's own standard
    /// input and output at the ends of the pipeline.
    ///
    /// Returns the terminal stage's status once every child has been reaped.
    pub fn run(&self) -> Result<ExitCode, ShellError> {
        self.run_with(Input::Inherit, Output::Inherit)
    }

    /// Same as [`Pipeline::run`], with explicit bindings for the first stage's
    /// input and the last stage's output.
    pub fn run_with(&self, input: Input, output: Output) -> Result<ExitCode, ShellError> {
        let (last, _) = self.split_last();
        let mut children = Vec::with_capacity(self.stages.len());
        let input = self.spawn_producers(input, &mut children)?;
        match spawn_stage(input, output, last) {
            Ok(pid) => children.push(pid),
            Err(e) => return Err(abort(children, e)),
        }
        reap(children)
    }

    /// Run the pipeline with the calling process as its terminal stage.
    ///
    /// All but the last stage are spawned as children. A builtin terminal
    /// stage runs in place and its status is returned after every child has
    /// been reaped; any other terminal stage replaces the current process
    /// image, so on success this never returns.
    pub fn exec(&self) -> Result<ExitCode, ShellError> {
        let (last, _) = self.split_last();
        let mut children = Vec::with_capacity(self.stages.len() - 1);
        let input = self.spawn_producers(Input::Inherit, &mut children)?;
        let in_place = try_builtin(last, &mut Output::Inherit.into_writer(), &mut io::stderr());
        match in_place {
            Some(code) => {
                drop(input);
                reap(children)?;
                Ok(code)
            }
            None => {
                debug!(program = last.program(), "replacing shell with terminal stage");
                let error = replace_process(input, Output::Inherit, last);
                // Our stdin may now be the last pipe's read end, so waiting
                // here could block a producer forever. The caller exits on
                // this error and the children see the pipe close.
                warn!(%error, started = children.len(), "terminal stage failed to start");
                Err(error)
            }
        }
    }

    fn split_last(&self) -> (&ArgVector, &[ArgVector]) {
        match self.stages.split_last() {
            Some(split) => split,
            None => unreachable!("pipeline without stages"),
        }
    }

    /// Spawn every stage but the last, each writing into a fresh pipe.
    ///
    /// Returns the read end of the final pipe, or `input` itself for a single
    /// stage pipeline. On failure the children spawned so far are reaped
    /// before the error is returned.
    fn spawn_producers(&self, input: Input, children: &mut Vec<Pid>) -> Result<Input, ShellError> {
        let (_, producers) = self.split_last();
        let mut current = input;
        for stage in producers {
            let (read, write) = match pipe2(OFlag::O_CLOEXEC) {
                Ok(ends) => ends,
                Err(errno) => {
                    drop(current);
                    return Err(abort(std::mem::take(children), ShellError::Pipe(errno)));
                }
            };
            debug!(?read, ?write, program = stage.program(), "allocated pipe");
            // The write end moves into the spawn call and is closed on our
            // side once it returns.
            match spawn_stage(current, Output::Fd(write), stage) {
                Ok(pid) => children.push(pid),
                Err(e) => {
                    drop(read);
                    return Err(abort(std::mem::take(children), e));
                }
            }
            current = Input::Fd(read);
        }
        Ok(current)
    }
}

fn spawn_stage(input: Input, output: Output, stage: &ArgVector) -> Result<Pid, ShellError> {
    match Builtin::lookup(stage.program()) {
        Some(builtin) => spawn_builtin(input, output, builtin, stage),
        None => spawn(input, output, stage),
    }
}

/// Wait for every child, returning the last one's status.
fn reap(children: Vec<Pid>) -> Result<ExitCode, ShellError> {
    let mut status = 0;
    let mut first_error = None;
    for pid in children {
        match wait_for(pid) {
            Ok(code) => {
                debug!(%pid, code, "reaped stage");
                status = code;
            }
            Err(e) => {
                first_error.get_or_insert(e);
            }
        }
    }
    match first_error {
        Some(e) => Err(e),
        None => Ok(status),
    }
}

/// Reap what was already started and hand back the error that stopped the
/// pipeline.
fn abort(children: Vec<Pid>, error: ShellError) -> ShellError {
    warn!(%error, started = children.len(), "pipeline aborted");
    if let Err(e) = reap(children) {
        warn!(error = %e, "failed to reap aborted pipeline");
    }
    error
}
