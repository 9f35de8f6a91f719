//! Command runner trait and the process-backed implementation

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use super::error::{ExecError, ExecResult};

/// A program and its arguments, run without a shell
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    /// Program name or path, resolved through `PATH`
    pub program: String,
    /// Arguments passed verbatim
    pub args: Vec<String>,
    /// Working directory, or the caller's when unset
    pub current_dir: Option<PathBuf>,
}

impl CommandLine {
    /// Create a command line for a program with no arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            current_dir: None,
        }
    }

    /// Append one argument
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Set the working directory
    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Captured output of a finished command
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandOutput {
    pub stdout: String,
    pub stderr: String,
}

/// Runs one external command to completion
///
/// Implementations must feed `stdin` (skipped when empty), close the input
/// stream, capture stdout and stderr separately, and return an error exactly
/// when the process could not be started or exited unsuccessfully.
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandLine, stdin: &str) -> ExecResult<CommandOutput>;
}

/// Runner that spawns real processes
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl SystemRunner {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandLine, stdin: &str) -> ExecResult<CommandOutput> {
        tracing::debug!(command = %command, "running external command");

        let mut cmd = Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &command.current_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(|source| ExecError::Spawn {
            program: command.program.clone(),
            source,
        })?;

        // Input is written while stdout/stderr are drained: a child that fills
        // an output pipe before consuming all of its input would otherwise
        // block forever.
        let input = child.stdin.take();
        let write_input = async move {
            if let Some(mut pipe) = input {
                if !stdin.is_empty() {
                    pipe.write_all(stdin.as_bytes()).await?;
                }
                pipe.shutdown().await?;
            }
            Ok::<(), io::Error>(())
        };

        let (written, waited) = tokio::join!(write_input, child.wait_with_output());

        let raw = waited.map_err(|source| ExecError::Wait {
            program: command.program.clone(),
            source,
        })?;
        let output = CommandOutput {
            stdout: String::from_utf8_lossy(&raw.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&raw.stderr).into_owned(),
        };

        if !raw.status.success() {
            return Err(ExecError::Exited {
                program: command.program.clone(),
                code: raw.status.code(),
                output,
            });
        }

        match written {
            // The child may legitimately exit without reading all of its input.
            Err(e) if e.kind() != io::ErrorKind::BrokenPipe => Err(ExecError::Stdin {
                program: command.program.clone(),
                source: e,
                output,
            }),
            _ => Ok(output),
        }
    }
}
