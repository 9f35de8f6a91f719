//! Auth provider registry
//!
//! Providers are registered explicitly on an [`AuthRegistry`] value built at
//! startup. [`AuthRegistry::builtin`] walks a static list of the providers
//! shipped with this crate; embedders add their own with
//! [`AuthRegistry::register`] before building a backend.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use super::none;
use super::static_users;
use super::traits::Authenticator;
use crate::config::{ConfigError, ConfigResult};

/// Turns a scheme's raw configuration into an authenticator
pub type AuthFactory = Box<dyn Fn(&Value) -> ConfigResult<Arc<dyn Authenticator>> + Send + Sync>;

/// Definition of a registered auth provider
pub struct ProviderDefinition {
    /// Scheme name, matched against `auth.type` in the configuration
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factory function to create authenticators
    pub factory: AuthFactory,
}

impl std::fmt::Debug for ProviderDefinition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderDefinition")
            .field("name", &self.name)
            .field("description", &self.description)
            .finish()
    }
}

struct BuiltinProvider {
    name: &'static str,
    description: &'static str,
    factory: fn(&Value) -> ConfigResult<Arc<dyn Authenticator>>,
}

const BUILTIN_PROVIDERS: &[BuiltinProvider] = &[
    BuiltinProvider {
        name: "none",
        description: "Accept any credentials and use the default store",
        factory: none::create,
    },
    BuiltinProvider {
        name: "static",
        description: "Fixed users with SHA-256 password digests",
        factory: static_users::create,
    },
];

/// Registry of auth providers keyed by scheme name
///
/// Registration needs `&mut self`; once the registry is shared it is
/// read-only, so the set of schemes cannot change after startup.
///
/// # Example
///
/// ```
/// use serde_json::json;
/// use webpass_core::auth::AuthRegistry;
///
/// let registry = AuthRegistry::builtin();
/// let auth = registry.create("none", &json!({ "type": "none" })).unwrap();
/// assert_eq!(auth.scheme(), "none");
///
/// assert!(registry.create("kerberos", &json!({})).is_err());
/// ```
#[derive(Debug, Default)]
pub struct AuthRegistry {
    providers: HashMap<String, ProviderDefinition>,
}

impl AuthRegistry {
    /// An empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding every provider shipped with this crate
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for provider in BUILTIN_PROVIDERS {
            let factory = provider.factory;
            registry.providers.insert(
                provider.name.to_string(),
                ProviderDefinition {
                    name: provider.name.to_string(),
                    description: provider.description.to_string(),
                    factory: Box::new(factory),
                },
            );
        }
        registry
    }

    /// Register a provider under a new scheme name
    ///
    /// Fails with [`ConfigError::DuplicateAuth`] if the name is taken.
    pub fn register(
        &mut self,
        name: &str,
        description: &str,
        factory: AuthFactory,
    ) -> ConfigResult<()> {
        if self.providers.contains_key(name) {
            return Err(ConfigError::DuplicateAuth(name.to_string()));
        }
        self.providers.insert(
            name.to_string(),
            ProviderDefinition {
                name: name.to_string(),
                description: description.to_string(),
                factory,
            },
        );
        Ok(())
    }

    /// Create an authenticator for `scheme` from its configuration
    pub fn create(&self, scheme: &str, config: &Value) -> ConfigResult<Arc<dyn Authenticator>> {
        let provider = self
            .providers
            .get(scheme)
            .ok_or_else(|| ConfigError::UnknownAuth(scheme.to_string()))?;
        (provider.factory)(config)
    }

    /// Check if a scheme is registered
    pub fn has(&self, name: &str) -> bool {
        self.providers.contains_key(name)
    }

    /// All registered schemes as `(name, description)`, sorted by name
    pub fn list(&self) -> Vec<(String, String)> {
        let mut providers: Vec<_> = self
            .providers
            .values()
            .map(|p| (p.name.clone(), p.description.clone()))
            .collect();
        providers.sort();
        providers
    }
}
