// src/watch/path_utils.rs

//! Root-relative path strings for glob matching.

use std::path::Path;

/// `path` relative to `root` with forward slashes, as globs expect.
///
/// Falls back to comparing canonical forms when the plain prefix does not
/// match (symlinked roots, `/private/var` on macOS). `None` when `path` is
/// outside `root` either way.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_forward_slashes(rel));
    }

    let root_canon = root.canonicalize().ok()?;
    let path_canon = path.canonicalize().ok()?;
    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(to_forward_slashes)
}

fn to_forward_slashes(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
