//! Shared path helpers
//!
//! Archive entry names are untrusted: anything absolute or containing `..`
//! must never be joined onto a scratch directory.

use std::path::{Component, Path, PathBuf};

/// Turn an archive entry name into a relative path that stays inside the
/// extraction root. Returns None if the name is unsafe or empty.
///
/// Backslashes are treated as separators, some Windows zip tools emit them.
pub fn sanitize_entry_name(name: &str) -> Option<PathBuf> {
    let normalized = name.replace('\\', "/");
    sanitize_path(Path::new(&normalized))
}

/// Sanitize a file path to prevent path traversal
/// Returns None if the path is unsafe (contains `..` or is absolute)
pub fn sanitize_path(path: &Path) -> Option<PathBuf> {
    let mut result = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(c) => result.push(c),
            Component::CurDir => {}
            Component::ParentDir => return None,
            Component::Prefix(_) | Component::RootDir => return None,
        }
    }
    if result.as_os_str().is_empty() {
        None
    } else {
        Some(result)
    }
}

/// Relative path for a profile field that is joined onto a folder (data
/// subpath, final name, save folder name).
///
/// Leading separators are dropped, so `"/horr"` and `"horr"` are the same
/// subpath. `..`, drive prefixes and empty values give None.
pub fn profile_relative_path(value: &str) -> Option<PathBuf> {
    sanitize_entry_name(value.trim_start_matches(['/', '\\']))
}

/// True when an archive entry name denotes a directory marker.
pub fn is_directory_marker(name: &str) -> bool {
    name.ends_with('/') || name.ends_with('\\')
}
