//! Binding of one authenticator to one store
//!
//! A successful [`Backend::auth`] yields a [`User`]: the store surface plus
//! access to the configured PGP private key.

mod user;

pub use user::{Backend, StoreUser, User, DEFAULT_PRIVATE_KEY};
