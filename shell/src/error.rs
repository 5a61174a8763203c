use nix::errno::Errno;
use nix::unistd::Pid;
use thiserror::Error;

/// Everything that can go wrong while building or running a pipeline.
///
/// All variants are local to a single pipeline invocation: the shell loop
/// reports them and moves on to the next line.
#[derive(Error, Debug)]
pub enum ShellError {
    #[error("parse error: empty command in stage {index}")]
    EmptyStage { index: usize },
    #[error("parse error: pipeline has no stages")]
    EmptyPipeline,
    #[error("parse error: empty argument")]
    EmptyArgument,
    #[error("parse error: argument contains a NUL byte: {arg:?}")]
    NulByte { arg: String },
    #[error("can't duplicate descriptor: {0}")]
    Descriptor(#[source] std::io::Error),
    #[error("can't create pipe: {0}")]
    Pipe(#[source] Errno),
    #[error("can't spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: Errno,
    },
    #[error("{program}: {}", exec_reason(.source))]
    Exec {
        program: String,
        #[source]
        source: Errno,
    },
    #[error("can't wait for child {pid}: {source}")]
    Wait {
        pid: Pid,
        #[source]
        source: Errno,
    },
    #[error("{name}: {reason}")]
    Builtin { name: &'static str, reason: String },
}

/// Human readable reason for a failed program replacement.
pub(crate) fn exec_reason(errno: &Errno) -> &'static str {
    match *errno {
        Errno::ENOENT => "command not found",
        other => other.desc(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exec_error_names_the_program() {
        let err = ShellError::Exec {
            program: "frobnicate".into(),
            source: Errno::ENOENT,
        };
        assert_eq!(err.to_string(), "frobnicate: command not found");

        let err = ShellError::Exec {
            program: "/etc".into(),
            source: Errno::EACCES,
        };
        assert_eq!(err.to_string(), "/etc: Permission denied");
    }

    #[test]
    fn builtin_error_is_prefixed_with_its_name() {
        let err = ShellError::Builtin {
            name: "cd",
            reason: "/nope: No such file or directory".into(),
        };
        assert_eq!(err.to_string(), "cd: /nope: No such file or directory");
    }
}
