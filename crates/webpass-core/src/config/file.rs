use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::info;

use super::error::{ConfigError, ConfigResult};
use crate::auth::AuthRegistry;
use crate::backend::{Backend, DEFAULT_PRIVATE_KEY};
use crate::store::{DiskStore, PassStore, StoreOptions};
use crate::types::CancellationToken;

/// The `pgp` section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PgpConfig {
    /// Path of the armored or binary private key handed to clients
    #[serde(rename = "privatekey", default)]
    pub private_key: Option<String>,
}

/// The `store` section; every field is optional
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store root. Defaults to `$PASSWORD_STORE_DIR` or `~/.password-store`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval_secs: Option<u64>,

    /// Program used for `git`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git: Option<String>,

    /// Program used for `gpg`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gpg: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    auth: Option<Value>,
    #[serde(default)]
    pgp: Option<PgpConfig>,
    #[serde(default)]
    store: StoreConfig,
}

/// Parsed configuration, immutable once loaded
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Scheme name from `auth.type`
    pub auth_type: String,
    /// The whole `auth` object, passed verbatim to the scheme's factory
    pub auth: Value,
    pub pgp: Option<PgpConfig>,
    pub store: StoreConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// `none` auth, default key location, default store
    pub fn new() -> Self {
        Self {
            auth_type: "none".to_string(),
            auth: json!({ "type": "none" }),
            pgp: None,
            store: StoreConfig::default(),
        }
    }

    pub fn from_json(contents: &str) -> ConfigResult<Self> {
        Self::from_raw(serde_json::from_str(contents)?)
    }

    pub fn from_yaml(contents: &str) -> ConfigResult<Self> {
        Self::from_raw(serde_yaml::from_str(contents)?)
    }

    fn from_raw(raw: RawConfig) -> ConfigResult<Self> {
        let auth = raw.auth.ok_or(ConfigError::MissingAuthType)?;
        let auth_type = auth
            .get("type")
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .ok_or(ConfigError::MissingAuthType)?
            .to_string();

        Ok(Self {
            auth_type,
            auth,
            pgp: raw.pgp,
            store: raw.store,
        })
    }

    /// Read and parse a configuration file
    ///
    /// The format follows the extension: `.yaml`/`.yml` is YAML, anything
    /// else is JSON.
    pub fn open(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;
        match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml(&contents),
            _ => Self::from_json(&contents),
        }
    }

    /// Like [`Config::open`], but a missing file yields [`Config::new`]
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            info!(path = %path.display(), "no configuration file, using defaults");
            return Ok(Self::new());
        }
        Self::open(path)
    }

    /// Where the PGP private key lives
    ///
    /// Without a `pgp` section this is [`DEFAULT_PRIVATE_KEY`]; a `pgp`
    /// section without `privatekey` means no key is available.
    pub fn private_key_path(&self) -> Option<PathBuf> {
        match &self.pgp {
            None => Some(PathBuf::from(DEFAULT_PRIVATE_KEY)),
            Some(pgp) => pgp
                .private_key
                .as_deref()
                .filter(|p| !p.is_empty())
                .map(PathBuf::from),
        }
    }

    /// Options for the default [`DiskStore`]
    pub fn store_options(&self) -> ConfigResult<StoreOptions> {
        let mut options = match &self.store.path {
            Some(path) => StoreOptions::new(path),
            None => StoreOptions::from_env(),
        };

        if let Some(secs) = self.store.sync_interval_secs {
            if secs == 0 {
                return Err(ConfigError::Invalid(
                    "store.sync_interval_secs must be greater than zero".to_string(),
                ));
            }
            options = options.with_sync_interval(Duration::from_secs(secs));
        }
        if let Some(git) = &self.store.git {
            options = options.with_git_program(git);
        }
        if let Some(gpg) = &self.store.gpg {
            options = options.with_gpg_program(gpg);
        }

        Ok(options)
    }

    /// Build a backend around an existing store
    ///
    /// The store is not initialized.
    pub fn bind(&self, registry: &AuthRegistry, store: Arc<dyn PassStore>) -> ConfigResult<Backend> {
        let authenticator = registry.create(&self.auth_type, &self.auth)?;
        Ok(Backend::new(authenticator, store, self.private_key_path()))
    }

    /// Build the backend with a [`DiskStore`] and start its sync loop
    ///
    /// The loop runs until `lifecycle` is cancelled.
    pub async fn backend(
        &self,
        registry: &AuthRegistry,
        lifecycle: CancellationToken,
    ) -> ConfigResult<Backend> {
        let options = self.store_options()?;
        let store: Arc<dyn PassStore> = Arc::new(DiskStore::with_options(options));
        let backend = self.bind(registry, store.clone())?;

        store.init(lifecycle).await?;
        info!(
            scheme = backend.scheme(),
            root = %store.path().display(),
            "backend ready"
        );
        Ok(backend)
    }
}
