use std::path::PathBuf;

use crate::core::roots::WellKnownRoots;
use crate::error::{InstallError, InstallResult};

/// Resolves game folders and mod archives against the well-known roots.
pub struct DirectoryLocator<'a> {
    roots: &'a WellKnownRoots,
}

impl<'a> DirectoryLocator<'a> {
    pub fn new(roots: &'a WellKnownRoots) -> Self {
        Self { roots }
    }

    /// Game folders are only ever looked for on the desktop.
    pub fn locate_target_directory(&self, folder_name: &str) -> InstallResult<PathBuf> {
        let candidate = self.roots.desktop.join(folder_name);
        if candidate.is_dir() {
            return Ok(absolute(candidate));
        }
        Err(InstallError::NotFound {
            what: "Game directory",
            name: folder_name.to_string(),
        })
    }

    /// Desktop, then downloads, then the application directory.
    pub fn locate_archive_file(&self, file_name: &str) -> InstallResult<PathBuf> {
        self.roots
            .archive_search_order()
            .iter()
            .map(|root| root.join(file_name))
            .find(|candidate| candidate.is_file())
            .map(absolute)
            .ok_or_else(|| InstallError::NotFound {
                what: "Mod file",
                name: file_name.to_string(),
            })
    }
}

fn absolute(path: PathBuf) -> PathBuf {
    std::path::absolute(&path).unwrap_or(path)
}
