//! Fixed user list authentication
//!
//! ```json
//! {
//!   "type": "static",
//!   "users": {
//!     "alice": "<sha256 hex of alice's password>"
//!   }
//! }
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use sha2::{Digest, Sha256};

use super::traits::{AuthError, AuthOutcome, AuthResult, Authenticator};
use crate::config::{ConfigError, ConfigResult};

const SCHEME: &str = "static";

type PasswordDigest = [u8; 32];

/// SHA-256 of a password, hex encoded, as expected in the `users` map
pub fn password_digest(password: &str) -> String {
    hex::encode(digest(password))
}

fn digest(password: &str) -> PasswordDigest {
    Sha256::digest(password.as_bytes()).into()
}

fn digests_match(a: &PasswordDigest, b: &PasswordDigest) -> bool {
    a.iter().zip(b.iter()).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[derive(Debug, Deserialize)]
struct StaticAuthConfig {
    #[serde(default)]
    users: HashMap<String, String>,
}

/// Authenticates against a fixed set of users
///
/// All users share the default store.
#[derive(Debug, Clone, Default)]
pub struct StaticAuthenticator {
    users: HashMap<String, PasswordDigest>,
}

impl StaticAuthenticator {
    /// An authenticator with no users; rejects everyone
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a user with a plaintext password
    pub fn with_user(mut self, username: impl Into<String>, password: &str) -> Self {
        self.users.insert(username.into(), digest(password));
        self
    }

    /// Build from the scheme's configuration blob
    pub fn from_config(config: &Value) -> ConfigResult<Self> {
        let invalid = |message: String| ConfigError::InvalidAuthConfig {
            scheme: SCHEME.to_string(),
            message,
        };

        let parsed: StaticAuthConfig =
            serde_json::from_value(config.clone()).map_err(|e| invalid(e.to_string()))?;

        let mut users = HashMap::with_capacity(parsed.users.len());
        for (username, hex_digest) in parsed.users {
            let bytes = hex::decode(hex_digest.trim())
                .map_err(|e| invalid(format!("user {:?}: {}", username, e)))?;
            let digest: PasswordDigest = bytes.try_into().map_err(|_| {
                invalid(format!("user {:?}: expected a 32-byte SHA-256 digest", username))
            })?;
            users.insert(username, digest);
        }

        Ok(Self { users })
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

pub(super) fn create(config: &Value) -> ConfigResult<Arc<dyn Authenticator>> {
    Ok(Arc::new(StaticAuthenticator::from_config(config)?))
}

#[async_trait]
impl Authenticator for StaticAuthenticator {
    fn scheme(&self) -> &str {
        SCHEME
    }

    async fn authenticate(&self, username: &str, password: &str) -> AuthResult<AuthOutcome> {
        // Hash even for unknown users so both rejections cost the same
        let presented = digest(password);
        match self.users.get(username) {
            Some(expected) if digests_match(expected, &presented) => Ok(AuthOutcome::DefaultStore),
            _ => Err(AuthError::InvalidCredentials),
        }
    }
}
