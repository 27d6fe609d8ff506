// src/watch/path_utils.rs

//! Path helpers for turning watcher events into rule-relative paths.

use std::path::Path;

/// Convert a path into a string relative to `root`, with forward slashes.
///
/// A direct `strip_prefix` is tried first. Watchers on some platforms report
/// canonical paths (`/private/var/...` on macOS), so both sides are
/// canonicalized before giving up.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(normalize(rel));
    }

    if let (Ok(root_canon), Ok(path_canon)) = (root.canonicalize(), path.canonicalize()) {
        if let Ok(rel) = path_canon.strip_prefix(&root_canon) {
            return Some(normalize(rel));
        }
    }

    // Deleted files can no longer be canonicalized; retry through the parent.
    if let (Ok(root_canon), Some(parent), Some(name)) =
        (root.canonicalize(), path.parent(), path.file_name())
    {
        if let Ok(parent_canon) = parent.canonicalize() {
            if let Ok(rel) = parent_canon.join(name).strip_prefix(&root_canon) {
                return Some(normalize(rel));
            }
        }
    }

    None
}

fn normalize(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}

/// True if `rel` lies inside the directory `dir` (both root-relative).
pub fn is_within(rel: &str, dir: &str) -> bool {
    let dir = dir.trim_start_matches("./").trim_end_matches('/');
    if dir.is_empty() || dir == "." {
        return true;
    }
    rel == dir || rel.strip_prefix(dir).is_some_and(|rest| rest.starts_with('/'))
}
