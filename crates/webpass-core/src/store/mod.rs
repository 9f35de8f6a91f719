//! Password store abstractions and the git-backed implementation
//!
//! - [`PassStore`] is the capability surface every store exposes
//! - [`DiskStore`] keeps a directory of gpg files in sync with a git remote

mod traits;
mod path;
mod disk_store;

pub use traits::{ItemReader, ItemWriter, PassStore, StoreError, StoreResult, StoreState};
pub use path::resolve_item;
pub use disk_store::{default_store_path, DiskStore, StoreOptions, DEFAULT_SYNC_INTERVAL};
