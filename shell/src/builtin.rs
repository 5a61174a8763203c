use crate::command::{ArgVector, ExitCode};
use crate::error::ShellError;
use argh::{EarlyExit, FromArgs};
use std::env;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Built-in commands known to the shell at compile time.
///
/// Builtins are parsed using the [`argh`] crate (`FromArgs`) and run inside
/// whichever process executes their pipeline stage: a forked child in the
/// interactive shell, or the shell process itself for the terminal stage of
/// [`Pipeline::exec`](crate::Pipeline::exec).
pub(crate) trait BuiltinCommand: Sized + FromArgs {
    /// Canonical name of the command, e.g. "cd".
    const NAME: &'static str;

    /// Executes the command, writing its regular output to `stdout`.
    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode, ShellError>;
}

/// The builtins this shell recognizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Builtin {
    Cd,
}

impl Builtin {
    /// Look a program name up among the builtins.
    pub fn lookup(name: &str) -> Option<Self> {
        match name {
            n if n == Cd::NAME => Some(Builtin::Cd),
            _ => None,
        }
    }

    /// Run the builtin in the current process.
    ///
    /// Argument errors and failures are reported on `stderr` and turned into
    /// a non-zero status; they never propagate further.
    pub fn execute(
        self,
        argv: &ArgVector,
        stdout: &mut dyn Write,
        stderr: &mut dyn Write,
    ) -> ExitCode {
        match self {
            Builtin::Cd => run::<Cd>(argv, stdout, stderr),
        }
    }
}

/// Run `argv` as a builtin if its program name is one.
///
/// Returns `None` when the name is not a builtin, leaving the stage to the
/// process spawner.
pub fn try_builtin(
    argv: &ArgVector,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> Option<ExitCode> {
    Builtin::lookup(argv.program()).map(|b| b.execute(argv, stdout, stderr))
}

fn run<T: BuiltinCommand>(
    argv: &ArgVector,
    stdout: &mut dyn Write,
    stderr: &mut dyn Write,
) -> ExitCode {
    let args: Vec<&str> = argv.args()[1..].iter().map(String::as_str).collect();
    let code = match T::from_args(&[T::NAME], &args) {
        Ok(cmd) => match cmd.execute(stdout) {
            Ok(code) => code,
            Err(e) => {
                let _ = writeln!(stderr, "pipesh: {}", e);
                1
            }
        },
        Err(EarlyExit { output, status }) => match status {
            Ok(()) => {
                let _ = write!(stdout, "{}", output);
                0
            }
            Err(()) => {
                let _ = write!(stderr, "{}", output);
                1
            }
        },
    };
    let _ = stdout.flush();
    code
}

#[derive(FromArgs)]
/// Change the current working directory and print it.
pub struct Cd {
    #[argh(positional)]
    /// directory to switch to; absolute or relative to the current directory.
    pub path: String,
}

impl BuiltinCommand for Cd {
    const NAME: &'static str = "cd";

    fn execute(self, stdout: &mut dyn Write) -> Result<ExitCode, ShellError> {
        let cwd = change_dir(&self.path)?;
        writeln!(stdout, "Current Working Directory: {}", cwd.display()).map_err(|e| {
            ShellError::Builtin {
                name: Cd::NAME,
                reason: e.to_string(),
            }
        })?;
        Ok(0)
    }
}

/// Change the working directory of the calling process.
///
/// Returns the resulting working directory.
pub fn change_dir(path: impl AsRef<Path>) -> Result<PathBuf, ShellError> {
    let path = path.as_ref();
    let fail = |e: std::io::Error| ShellError::Builtin {
        name: Cd::NAME,
        reason: format!("{}: {}", path.display(), e),
    };
    env::set_current_dir(path).map_err(fail)?;
    env::current_dir().map_err(fail)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(words: &[&str]) -> ArgVector {
        ArgVector::new(words.iter().copied()).unwrap()
    }

    #[test]
    fn only_cd_is_a_builtin() {
        assert_eq!(Builtin::lookup("cd"), Some(Builtin::Cd));
        assert_eq!(Builtin::lookup("ls"), None);
        assert_eq!(Builtin::lookup("CD"), None);
    }

    #[test]
    fn non_builtin_is_left_alone() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        assert_eq!(try_builtin(&argv(&["ls", "-la"]), &mut out, &mut err), None);
        assert!(out.is_empty() && err.is_empty());
    }

    #[test]
    fn cd_without_path_fails() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = try_builtin(&argv(&["cd"]), &mut out, &mut err);
        assert_eq!(code, Some(1));
        assert!(out.is_empty());
        assert!(!err.is_empty());
    }

    #[test]
    fn cd_with_too_many_arguments_fails() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = try_builtin(&argv(&["cd", "/", "/tmp"]), &mut out, &mut err);
        assert_eq!(code, Some(1));
        assert!(!err.is_empty());
    }

    #[test]
    fn cd_to_nonexistent_dir_reports_and_keeps_cwd() {
        let before = env::current_dir().unwrap();
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = try_builtin(
            &argv(&["cd", "/nonexistent/pipesh/dir"]),
            &mut out,
            &mut err,
        );
        assert_eq!(code, Some(1));
        let err = String::from_utf8(err).unwrap();
        assert!(
            err.starts_with("pipesh: cd: /nonexistent/pipesh/dir: "),
            "unexpected diagnostic {:?}",
            err
        );
        assert!(out.is_empty());
        assert_eq!(env::current_dir().unwrap(), before);
    }

    #[test]
    fn cd_help_goes_to_stdout() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let code = try_builtin(&argv(&["cd", "--help"]), &mut out, &mut err);
        assert_eq!(code, Some(0));
        assert!(String::from_utf8(out).unwrap().contains("Usage: cd"));
    }
}
