use crate::error::ShellError;
use std::ffi::CString;

/// Conventional process exit code type used by this crate.
///
/// A value of 0 indicates success; any non-zero value indicates failure.
/// Children killed by a signal are reported as `128 + signal`, the way POSIX
/// shells do.
pub type ExitCode = i32;

/// Program name and arguments of one pipeline stage.
///
/// Element 0 is the executable name. An `ArgVector` is never empty and none of
/// its elements is an empty string, so every stage has a program to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgVector {
    args: Vec<String>,
}

impl ArgVector {
    /// Build an argument vector from already tokenized words.
    pub fn new<I, S>(args: I) -> Result<Self, ShellError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let args: Vec<String> = args.into_iter().map(Into::into).collect();
        if args.is_empty() {
            return Err(ShellError::EmptyStage { index: 0 });
        }
        if args.iter().any(|a| a.is_empty()) {
            return Err(ShellError::EmptyArgument);
        }
        Ok(Self { args })
    }

    /// Name of the program this stage runs.
    pub fn program(&self) -> &str {
        &self.args[0]
    }

    /// Full vector, program name included.
    pub fn args(&self) -> &[String] {
        &self.args
    }

    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.args.len()
    }

    /// Convert to the NUL terminated strings `execvp` wants.
    ///
    /// Done in the parent before forking so the child has nothing left to
    /// allocate or validate.
    pub(crate) fn to_c_strings(&self) -> Result<Vec<CString>, ShellError> {
        self.args
            .iter()
            .map(|a| {
                CString::new(a.as_bytes()).map_err(|_| ShellError::NulByte { arg: a.clone() })
            })
            .collect()
    }
}
