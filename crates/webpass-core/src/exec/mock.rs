//! Recording command runner for testing
//!
//! Never spawns a process. Every call is recorded with its start and end
//! instant, which makes it possible to assert on ordering and overlap of
//! invocations (for example, that a store never runs two `git` commands at
//! once).

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::error::{ExecError, ExecResult};
use super::runner::{CommandLine, CommandOutput, CommandRunner};

/// One recorded call
#[derive(Debug, Clone)]
pub struct Invocation {
    pub command: CommandLine,
    pub stdin: String,
    pub started: Instant,
    pub finished: Instant,
}

type Responder = Box<dyn Fn(&CommandLine, &str) -> ExecResult<CommandOutput> + Send + Sync>;

/// Scripted [`CommandRunner`] that records what it was asked to run
///
/// # Example
///
/// ```
/// use webpass_core::exec::{CommandLine, CommandRunner, RecordingRunner};
///
/// # tokio_test_block_on(async {
/// let runner = RecordingRunner::with_stdout("plaintext\n");
/// let output = runner.run(&CommandLine::new("gpg"), "passphrase").await.unwrap();
///
/// assert_eq!(output.stdout, "plaintext\n");
/// assert_eq!(runner.invocations()[0].stdin, "passphrase");
/// # });
/// # fn tokio_test_block_on<F: std::future::Future>(f: F) -> F::Output {
/// #     tokio::runtime::Builder::new_current_thread().enable_time().build().unwrap().block_on(f)
/// # }
/// ```
pub struct RecordingRunner {
    responder: Responder,
    delay: Duration,
    invocations: Mutex<Vec<Invocation>>,
    in_flight: Mutex<usize>,
}

impl RecordingRunner {
    /// Runner whose commands all succeed with empty output
    pub fn new() -> Self {
        Self::with_responder(|_, _| Ok(CommandOutput::default()))
    }

    /// Runner whose commands all succeed with the given stdout
    pub fn with_stdout(stdout: impl Into<String>) -> Self {
        let stdout = stdout.into();
        Self::with_responder(move |_, _| {
            Ok(CommandOutput {
                stdout: stdout.clone(),
                stderr: String::new(),
            })
        })
    }

    /// Runner whose commands all exit with `code` and the given stderr
    pub fn failing(code: i32, stderr: impl Into<String>) -> Self {
        let stderr = stderr.into();
        Self::with_responder(move |cmd, _| Err(ExecError::exited(cmd.program.clone(), code, stderr.clone())))
    }

    /// Runner that answers each call with `responder`
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&CommandLine, &str) -> ExecResult<CommandOutput> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: Duration::ZERO,
            invocations: Mutex::new(Vec::new()),
            in_flight: Mutex::new(0),
        }
    }

    /// Make every call take `delay` before answering
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// All completed calls, in completion order
    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }

    /// Number of completed calls
    pub fn call_count(&self) -> usize {
        self.invocations.lock().len()
    }

    /// Number of completed calls to `program`
    pub fn calls_to(&self, program: &str) -> usize {
        self.invocations
            .lock()
            .iter()
            .filter(|i| i.command.program == program)
            .count()
    }

    /// Number of calls currently running
    pub fn in_flight(&self) -> usize {
        *self.in_flight.lock()
    }
}

impl Default for RecordingRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for RecordingRunner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingRunner")
            .field("delay", &self.delay)
            .field("calls", &self.call_count())
            .finish()
    }
}

#[async_trait]
impl CommandRunner for RecordingRunner {
    async fn run(&self, command: &CommandLine, stdin: &str) -> ExecResult<CommandOutput> {
        let started = Instant::now();
        *self.in_flight.lock() += 1;

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let result = (self.responder)(command, stdin);

        *self.in_flight.lock() -= 1;
        self.invocations.lock().push(Invocation {
            command: command.clone(),
            stdin: stdin.to_string(),
            started,
            finished: Instant::now(),
        });
        result
    }
}
