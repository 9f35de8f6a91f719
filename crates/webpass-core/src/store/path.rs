//! Item path resolution
//!
//! Resolution is purely lexical: symbolic links are not followed.

use std::ffi::OsStr;
use std::path::{Component, Path, PathBuf};

use super::traits::{StoreError, StoreResult};

/// Lexically normalize a store root (`.` dropped, `..` folded where possible)
pub(crate) fn clean_root(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match out.components().next_back() {
                Some(Component::Normal(_)) => {
                    out.pop();
                }
                // `/..` is `/`
                Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                _ => out.push(".."),
            },
            other => out.push(other.as_os_str()),
        }
    }
    if out.as_os_str().is_empty() {
        out.push(".");
    }
    out
}

/// Resolve `item` against `root`, rejecting anything that leaves the root
///
/// Leading separators are ignored, so `/a/b.gpg` names the same item as
/// `a/b.gpg`. A `..` that would climb above the root, or an item that
/// resolves to the root itself, is an [`StoreError::InvalidPath`].
///
/// # Example
///
/// ```
/// use std::path::Path;
/// use webpass_core::store::resolve_item;
///
/// let root = Path::new("/data/store");
/// assert_eq!(resolve_item(root, "a/b.gpg").unwrap(), Path::new("/data/store/a/b.gpg"));
/// assert!(resolve_item(root, "../../etc/passwd").is_err());
/// ```
pub fn resolve_item(root: &Path, item: &str) -> StoreResult<PathBuf> {
    let invalid = || StoreError::InvalidPath(item.to_string());

    let mut parts: Vec<&OsStr> = Vec::new();
    for component in Path::new(item).components() {
        match component {
            Component::Normal(part) => parts.push(part),
            Component::ParentDir => {
                parts.pop().ok_or_else(invalid)?;
            }
            Component::CurDir | Component::RootDir | Component::Prefix(_) => {}
        }
    }
    if parts.is_empty() {
        return Err(invalid());
    }

    let mut resolved = root.to_path_buf();
    resolved.extend(parts);
    if !resolved.starts_with(root) {
        return Err(invalid());
    }
    Ok(resolved)
}
