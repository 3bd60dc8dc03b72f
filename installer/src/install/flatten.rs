use std::fs;
use std::path::{Path, PathBuf};

/// If `dir` has exactly one child directory, return it as the payload root.
///
/// Top-level files are not considered: one folder plus stray files still
/// flattens to the folder. Anything unreadable is returned unchanged.
pub fn flatten_if_single_root(dir: &Path) -> PathBuf {
    let Ok(entries) = fs::read_dir(dir) else {
        return dir.to_path_buf();
    };

    let mut child_dirs = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .map(|entry| entry.path());

    match (child_dirs.next(), child_dirs.next()) {
        (Some(only), None) => only,
        _ => dir.to_path_buf(),
    }
}
