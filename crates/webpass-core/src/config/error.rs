use std::io;

use thiserror::Error;

use crate::store::StoreError;

/// Errors raised while loading configuration or building a backend from it
///
/// All of these are fatal at startup.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("unknown auth type: {0}")]
    UnknownAuth(String),

    #[error("auth type already registered: {0}")]
    DuplicateAuth(String),

    #[error("invalid configuration for auth type {scheme}: {message}")]
    InvalidAuthConfig { scheme: String, message: String },

    #[error("auth.type is required")]
    MissingAuthType,

    #[error("invalid configuration: {0}")]
    Invalid(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("failed to parse JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("store setup failed: {0}")]
    Store(#[from] StoreError),
}

pub type ConfigResult<T> = Result<T, ConfigError>;
