//! Pluggable authentication
//!
//! An [`Authenticator`] answers "are these credentials valid, and which store
//! do they unlock". Schemes are looked up by name in an [`AuthRegistry`]:
//! - `none`: accepts everyone, uses the default store
//! - `static`: fixed users with SHA-256 password digests

mod traits;
mod registry;
mod none;
mod static_users;

pub use traits::{AuthError, AuthOutcome, AuthResult, Authenticator};
pub use registry::{AuthFactory, AuthRegistry, ProviderDefinition};
pub use none::NoneAuthenticator;
pub use static_users::{password_digest, StaticAuthenticator};
