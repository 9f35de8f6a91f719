//! Core traits and types for password stores

use std::io;
use std::path::Path;

use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};

use crate::exec::ExecError;
use crate::types::CancellationToken;

/// Readable stream over an item's raw (encrypted) bytes
pub type ItemReader = Box<dyn AsyncRead + Send + Unpin>;

/// Writable stream positioned at the start of a new or truncated item
pub type ItemWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Errors that can occur during store operations
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("item not found: {0}")]
    NotFound(String),

    /// The item would resolve outside the store root
    #[error("invalid item path: {0}")]
    InvalidPath(String),

    #[error("store is already initialized")]
    AlreadyInitialized,

    /// `git` or `gpg` failed; carries the captured output
    #[error(transparent)]
    Command(#[from] ExecError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Lifecycle of a store's background synchronization
///
/// `Uninitialized → Running → Stopped`. A stopped store cannot be restarted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Uninitialized,
    Running,
    Stopped,
}

/// A directory of encrypted items kept in sync with a remote
///
/// Items are addressed by paths relative to the store root. Every
/// implementation must reject item paths that resolve outside the root with
/// [`StoreError::InvalidPath`] before touching the filesystem.
#[async_trait]
pub trait PassStore: Send + Sync {
    /// Start background synchronization, bound to `lifecycle`
    ///
    /// Syncs once immediately, then on every interval until `lifecycle` is
    /// cancelled. May succeed at most once per store.
    async fn init(&self, lifecycle: CancellationToken) -> StoreResult<()>;

    /// Pull from the remote once
    async fn sync(&self) -> StoreResult<()>;

    /// The store root
    fn path(&self) -> &Path;

    /// Whether the item resolves inside the store and exists
    async fn exists(&self, item: &str) -> bool;

    /// All visible items, relative to the root, `/`-separated
    async fn list(&self) -> StoreResult<Vec<String>>;

    /// Open an item's ciphertext for reading
    async fn open(&self, item: &str) -> StoreResult<ItemReader>;

    /// Decrypt an item with the given passphrase
    async fn decrypt(&self, item: &str, passphrase: &str) -> StoreResult<String>;

    /// Create (or truncate) an item for writing
    async fn create(&self, item: &str) -> StoreResult<ItemWriter>;
}
