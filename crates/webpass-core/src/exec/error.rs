//! Command execution error types

use std::io;

use thiserror::Error;

use super::runner::CommandOutput;

/// Errors that can occur while running an external command
///
/// Whatever output the process produced before failing is kept on the
/// variants that have any, so callers can surface `stderr` to operators.
#[derive(Error, Debug)]
pub enum ExecError {
    /// The process could not be started
    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    /// The process ran and exited with a failure status
    #[error("{program} exited with {}: {}", describe_code(.code), .output.stderr.trim())]
    Exited {
        program: String,
        code: Option<i32>,
        output: CommandOutput,
    },

    /// Feeding standard input failed
    #[error("failed to write input to {program}: {source}")]
    Stdin {
        program: String,
        #[source]
        source: io::Error,
        output: CommandOutput,
    },

    /// Waiting on the process or draining its output failed
    #[error("failed waiting for {program}: {source}")]
    Wait {
        program: String,
        #[source]
        source: io::Error,
    },
}

fn describe_code(code: &Option<i32>) -> String {
    match code {
        Some(code) => format!("status {}", code),
        None => "no status (terminated by signal)".to_string(),
    }
}

impl ExecError {
    /// Create an exit-status error, mainly for scripted runners
    pub fn exited(program: impl Into<String>, code: i32, stderr: impl Into<String>) -> Self {
        Self::Exited {
            program: program.into(),
            code: Some(code),
            output: CommandOutput {
                stdout: String::new(),
                stderr: stderr.into(),
            },
        }
    }

    /// Output captured before the failure, if the process got that far
    pub fn output(&self) -> Option<&CommandOutput> {
        match self {
            Self::Exited { output, .. } | Self::Stdin { output, .. } => Some(output),
            Self::Spawn { .. } | Self::Wait { .. } => None,
        }
    }

    /// Captured standard error, if any
    pub fn stderr(&self) -> Option<&str> {
        self.output().map(|o| o.stderr.as_str())
    }
}

pub type ExecResult<T> = Result<T, ExecError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exited_display_includes_stderr() {
        let err = ExecError::exited("git", 1, "fatal: not a git repository\n");
        assert_eq!(
            err.to_string(),
            "git exited with status 1: fatal: not a git repository"
        );
        assert_eq!(err.stderr(), Some("fatal: not a git repository\n"));
    }

    #[test]
    fn test_spawn_has_no_output() {
        let err = ExecError::Spawn {
            program: "gpg".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "no such file"),
        };
        assert!(err.output().is_none());
        assert!(err.to_string().starts_with("failed to start gpg"));
    }
}
