//! Startup configuration
//!
//! One file, JSON by default or YAML when the name ends in `.yaml`/`.yml`:
//!
//! ```yaml
//! auth:
//!   type: static
//!   users:
//!     alice: 5e884898da28047151d0e56f8dc6292773603d0d6aabbdd62a11ef721d1542d8
//! pgp:
//!   privatekey: /etc/webpass/private-key.gpg
//! store:
//!   path: /var/lib/webpass/store
//!   sync_interval_secs: 300
//! ```

mod error;
mod file;

pub use error::{ConfigError, ConfigResult};
pub use file::{Config, PgpConfig, StoreConfig};
