//! Pass-through authentication

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use super::traits::{AuthOutcome, AuthResult, Authenticator};
use crate::config::ConfigResult;

/// Accepts any credentials and grants the default store
///
/// Meant for single-user deployments behind another access control layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoneAuthenticator;

impl NoneAuthenticator {
    pub fn new() -> Self {
        Self
    }
}

pub(super) fn create(_config: &Value) -> ConfigResult<Arc<dyn Authenticator>> {
    Ok(Arc::new(NoneAuthenticator))
}

#[async_trait]
impl Authenticator for NoneAuthenticator {
    fn scheme(&self) -> &str {
        "none"
    }

    async fn authenticate(&self, _username: &str, _password: &str) -> AuthResult<AuthOutcome> {
        Ok(AuthOutcome::DefaultStore)
    }
}
