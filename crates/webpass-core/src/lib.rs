//! Webpass Core
//!
//! Serve a `pass`-style password store to authenticated callers.
//! This crate holds everything except the transport: it can sit behind an
//! HTTP server, a CLI, or anything else that can drive a tokio runtime.
//!
//! ## Pieces
//!
//! - `store`: a git-synced directory of gpg files, with path containment
//!   and a background pull loop
//! - `exec`: how `git` and `gpg` get run, swappable for tests
//! - `auth`: pluggable credential checks, looked up by scheme name
//! - `backend`: one authenticator bound to one store and a private key
//! - `config`: the startup file that wires it all together
//!
//! ```rust,no_run
//! use webpass_core::{AuthRegistry, CancellationToken, Config, PassStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::load("config.json")?;
//! let lifecycle = CancellationToken::new();
//! let backend = config.backend(&AuthRegistry::builtin(), lifecycle.clone()).await?;
//!
//! let user = backend.auth("alice", "wonderland").await?;
//! println!("{}", user.decrypt("email/work.gpg", "passphrase").await?);
//!
//! lifecycle.cancel();
//! # Ok(())
//! # }
//! ```

pub mod types;
pub mod exec;
pub mod store;
pub mod auth;
pub mod backend;
pub mod config;

// Re-export commonly used types
pub use types::CancellationToken;

pub use exec::{CommandRunner, ExecError, RecordingRunner, SystemRunner};

pub use store::{DiskStore, PassStore, StoreError, StoreOptions, StoreResult};

pub use auth::{AuthError, AuthOutcome, AuthRegistry, AuthResult, Authenticator};

pub use backend::{Backend, StoreUser, User};

pub use config::{Config, ConfigError, ConfigResult};
