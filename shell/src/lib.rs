//! A minimal pipeline shell.
//!
//! A line such as `ls -la | awk {print} | sort | uniq` is split on `|` into
//! stages, and each stage becomes its own operating-system process, with one
//! stage's standard output wired to the next stage's standard input through
//! an anonymous pipe. There is no quoting, globbing, expansion, redirection or
//! job control.
//!
//! The pieces, leaves first:
//! - [`ArgVector`]: program name and arguments of one stage.
//! - [`Input`]/[`Output`]: descriptor bindings for a stage's standard streams.
//! - [`spawner`]: fork, rebind and exec a single stage.
//! - [`Pipeline`]: allocate the pipes, spawn the stages, wait for all of them.
//! - [`builtin`]: in-process commands (`cd`).
//! - [`Interpreter`]: the read-parse-run loop.

pub mod builtin;
mod command;
pub mod error;
mod interpreter;
mod io_adapters;
pub mod parser;
mod pipeline;
pub mod spawner;

pub use builtin::Builtin;
pub use command::{ArgVector, ExitCode};
pub use error::ShellError;
pub use interpreter::{DEFAULT_PROMPT, Interpreter, LineReader, ScriptedLines};
pub use io_adapters::{Input, Output};
pub use parser::parse_line;
pub use pipeline::Pipeline;
