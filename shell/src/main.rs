use anyhow::Context;
use argh::FromArgs;
use nix::errno::Errno;
use pipesh::spawner::{STATUS_NOT_EXECUTABLE, STATUS_NOT_FOUND};
use pipesh::{Interpreter, ShellError, parse_line};
use rustyline::DefaultEditor;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

const BANNER: &str = "Welcome to shell";

#[derive(FromArgs)]
/// A minimal shell: runs `|`-separated commands as a pipeline of processes.
struct Args {
    /// run this one pipeline instead of reading lines; its last stage
    /// replaces the shell process.
    #[argh(option, short = 'c')]
    command: Option<String>,

    /// do not print the welcome banner.
    #[argh(switch, short = 'q')]
    quiet: bool,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Args = argh::from_env();
    let result = match args.command {
        Some(line) => run_command(&line),
        None => run_interactive(args.quiet),
    };
    match result {
        Ok(status) => ExitCode::from(status as u8),
        Err(e) => {
            eprintln!("pipesh: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run_command(line: &str) -> anyhow::Result<i32> {
    let Some(pipeline) = parse_line(line)? else {
        return Ok(0);
    };
    match pipeline.exec() {
        Ok(status) => Ok(status),
        Err(e @ ShellError::Exec { source, .. }) => {
            eprintln!("pipesh: {}", e);
            Ok(match source {
                Errno::ENOENT => STATUS_NOT_FOUND,
                _ => STATUS_NOT_EXECUTABLE,
            })
        }
        Err(e) => Err(e.into()),
    }
}

fn run_interactive(quiet: bool) -> anyhow::Result<i32> {
    if !quiet {
        println!("{}", BANNER);
    }
    let mut editor = DefaultEditor::new().context("can't set up line editor")?;
    Interpreter::default().repl(&mut editor)
}
