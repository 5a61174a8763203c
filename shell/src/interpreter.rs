use crate::command::ExitCode;
use crate::error::ShellError;
use crate::io_adapters::{Input, Output};
use crate::parser::parse_line;
use colored::Colorize;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::os::fd::OwnedFd;
use tracing::debug;

/// Prompt shown before every line, green after a successful pipeline and red
/// after a failed one.
pub const DEFAULT_PROMPT: &str = "$ ";

/// Source of raw input lines for the shell loop.
pub trait LineReader {
    /// Show `prompt` and read one line.
    ///
    /// Returns `Ok(None)` at end of input.
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>>;
}

impl LineReader for DefaultEditor {
    fn read_line(&mut self, prompt: &str) -> anyhow::Result<Option<String>> {
        match self.readline(prompt) {
            Ok(line) => {
                if !line.trim().is_empty() {
                    self.add_history_entry(line.as_str())?;
                }
                Ok(Some(line))
            }
            // Ctrl-C drops the line being edited and prompts again.
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(ReadlineError::Eof) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}

/// Lines taken from an iterator, without any prompt.
pub struct ScriptedLines<I> {
    lines: I,
}

impl<I> ScriptedLines<I>
where
    I: Iterator<Item = String>,
{
    pub fn new<T>(lines: T) -> Self
    where
        T: IntoIterator<IntoIter = I>,
    {
        Self {
            lines: lines.into_iter(),
        }
    }
}

impl<I> LineReader for ScriptedLines<I>
where
    I: Iterator<Item = String>,
{
    fn read_line(&mut self, _prompt: &str) -> anyhow::Result<Option<String>> {
        Ok(self.lines.next())
    }
}

/// The read-parse-run loop.
///
/// Every pipeline, including a lone builtin such as `cd`, runs in child
/// processes, so a `cd` typed at the prompt does not move the shell itself.
///
/// Example
/// ```no_run
/// use pipesh::{Interpreter, ScriptedLines};
/// let mut sh = Interpreter::default();
/// let mut lines = ScriptedLines::new(vec!["ls -la | sort".to_string()]);
/// let status = sh.repl(&mut lines).unwrap();
/// assert_eq!(status, 0);
/// ```
pub struct Interpreter {
    prompt: String,
    input: Option<OwnedFd>,
    output: Option<OwnedFd>,
    last_status: ExitCode,
}

impl Interpreter {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            input: None,
            output: None,
            last_status: 0,
        }
    }

    /// Connect every pipeline's first stage to `input` and last stage to
    /// `output` instead of the shell's own standard streams.
    pub fn with_stdio(mut self, input: Option<OwnedFd>, output: Option<OwnedFd>) -> Self {
        self.input = input;
        self.output = output;
        self
    }

    /// Status of the most recent pipeline.
    pub fn last_status(&self) -> ExitCode {
        self.last_status
    }

    /// The prompt for the next line, coloured by [`Interpreter::last_status`].
    ///
    /// Colour is dropped when stdout is not a terminal or `NO_COLOR` is set.
    pub fn prompt(&self) -> String {
        let prompt = self.prompt.as_str();
        match self.last_status {
            0 => prompt.green().to_string(),
            _ => prompt.red().to_string(),
        }
    }

    /// Read and run lines until `reader` runs dry.
    ///
    /// Pipeline failures are reported on stderr and never stop the loop;
    /// only a failing line reader does. Returns the last pipeline's status.
    pub fn repl(&mut self, reader: &mut dyn LineReader) -> anyhow::Result<ExitCode> {
        while let Some(line) = reader.read_line(&self.prompt())? {
            if let Err(e) = self.execute_line(&line) {
                eprintln!("pipesh: {}", e);
                self.last_status = 1;
            }
        }
        debug!(status = self.last_status, "end of input");
        Ok(self.last_status)
    }

    /// Parse and run one line.
    ///
    /// Returns `Ok(None)` for a blank line, which runs nothing and leaves
    /// [`Interpreter::last_status`] untouched.
    pub fn execute_line(&mut self, line: &str) -> Result<Option<ExitCode>, ShellError> {
        let Some(pipeline) = parse_line(line)? else {
            return Ok(None);
        };
        let input = match &self.input {
            Some(fd) => Input::Fd(fd.try_clone().map_err(ShellError::Descriptor)?),
            None => Input::Inherit,
        };
        let output = match &self.output {
            Some(fd) => Output::Fd(fd.try_clone().map_err(ShellError::Descriptor)?),
            None => Output::Inherit,
        };
        debug!(stages = pipeline.len(), "running pipeline");
        let status = pipeline.run_with(input, output)?;
        self.last_status = status;
        Ok(Some(status))
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT)
    }
}
