//! External command execution
//!
//! Every interaction with `git` and `gpg` goes through a [`CommandRunner`]:
//! - [`SystemRunner`] spawns real processes via `tokio::process`
//! - [`RecordingRunner`] records invocations and returns scripted output, for tests

mod error;
mod runner;
mod mock;

pub use error::{ExecError, ExecResult};
pub use runner::{CommandLine, CommandOutput, CommandRunner, SystemRunner};
pub use mock::{Invocation, RecordingRunner};
