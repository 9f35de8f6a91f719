//! Core traits and types for authentication

use std::io;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::backend::User;
use crate::store::PassStore;

/// Errors surfaced by authentication and key lookup
#[derive(Error, Debug)]
pub enum AuthError {
    /// Rejected credentials. Deliberately says nothing about whether the
    /// user exists.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// No private key is configured, or the configured file is missing
    #[error("no such key")]
    NoSuchKey,

    /// The provider itself failed (not a rejection)
    #[error("auth provider error: {0}")]
    Provider(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type AuthResult<T> = Result<T, AuthError>;

/// What a successful authentication grants
pub enum AuthOutcome {
    /// Use the backend's shared store and key policy
    DefaultStore,
    /// Use this store instead, with the backend's key policy
    Store(Arc<dyn PassStore>),
    /// A complete capability; returned to the caller unchanged
    User(Arc<dyn User>),
}

impl std::fmt::Debug for AuthOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AuthOutcome::DefaultStore => f.write_str("DefaultStore"),
            AuthOutcome::Store(store) => f.debug_tuple("Store").field(&store.path()).finish(),
            AuthOutcome::User(user) => f.debug_tuple("User").field(&user.path()).finish(),
        }
    }
}

/// A credential check produced by an auth provider
#[async_trait]
pub trait Authenticator: Send + Sync {
    /// Name of the scheme this authenticator implements
    fn scheme(&self) -> &str;

    /// Check credentials
    ///
    /// Must return [`AuthError::InvalidCredentials`] for both unknown users
    /// and wrong passwords.
    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<AuthOutcome>;
}
