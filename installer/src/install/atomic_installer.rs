use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use uuid::Uuid;

use super::progress::{ProgressSink, Reporter};
use crate::core::roots::WellKnownRoots;
use crate::error::{InstallError, InstallResult};
use crate::logger;
use crate::models::StepKind;

/// Scratch extraction directory for one archive step.
///
/// Named with a UUID so concurrent requests never collide. Removed explicitly
/// through [`ScratchDir::cleanup`]; dropping it removes whatever is left.
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    pub fn new(parent: &Path, kind: StepKind) -> Self {
        Self {
            path: parent.join(format!(
                ".reaio_scratch_{}_{}",
                kind.as_str(),
                Uuid::new_v4()
            )),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn ensure_exists(&self) -> io::Result<()> {
        fs::create_dir_all(&self.path)
    }

    pub(crate) fn cleanup(self, reporter: &Reporter<'_>) {
        if self.path.exists() {
            match fs::remove_dir_all(&self.path) {
                Ok(()) => crate::log_debug!(
                    &format!("Removed scratch directory {:?}", self.path),
                    "atomic_installer"
                ),
                Err(e) => reporter.error(&format!(
                    "Failed to remove scratch directory {:?}: {}",
                    self.path, e
                )),
            }
        }
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if self.path.exists() {
            if let Err(e) = fs::remove_dir_all(&self.path) {
                logger::log_error(
                    &format!("Failed to cleanup scratch directory: {}", e),
                    Some("atomic_installer"),
                );
            }
        }
    }
}

/// Paths the finalize step works on, all resolved before it starts.
#[derive(Debug, Clone)]
pub struct FinalizePlan<'p> {
    /// Merged payload, `<game folder>/<data subpath>`
    pub merge_dest: &'p Path,
    /// Original game folder, deleted once the payload has moved out
    pub target_folder: &'p Path,
    pub final_path: &'p Path,
    /// Archive file names to delete from the cleanup roots
    pub archive_names: Vec<&'p str>,
}

/// Promotes the merged data folder to its permanent desktop name and
/// removes what the install no longer needs.
pub struct Finalizer<'a> {
    roots: &'a WellKnownRoots,
    reporter: Reporter<'a>,
}

impl<'a> Finalizer<'a> {
    pub fn new(roots: &'a WellKnownRoots, sink: &'a dyn ProgressSink) -> Self {
        Self {
            roots,
            reporter: Reporter::new(sink, "atomic_installer"),
        }
    }

    /// Rename `merge_dest` to `final_path` (replacing any previous install),
    /// delete the old game folder and the source archives.
    ///
    /// Returns the archive paths that were actually deleted. Only the rename
    /// can fail the call.
    pub fn finalize(&self, plan: &FinalizePlan<'_>) -> InstallResult<Vec<PathBuf>> {
        // Step 1: last install wins
        if plan.final_path.exists() {
            self.reporter.info(&format!(
                "Removing previous install at {:?}",
                plan.final_path
            ));
            if let Err(e) = fs::remove_dir_all(plan.final_path) {
                self.reporter.error(&format!(
                    "Failed to remove previous install {:?}: {}",
                    plan.final_path, e
                ));
            }
        }

        // Step 2: move and rename the data folder
        fs::rename(plan.merge_dest, plan.final_path).map_err(|source| {
            InstallError::RenameFailed {
                from: plan.merge_dest.to_path_buf(),
                to: plan.final_path.to_path_buf(),
                source,
            }
        })?;
        self.reporter.info(&format!(
            "Moved {:?} to {:?}",
            plan.merge_dest, plan.final_path
        ));

        // Step 3: the original game folder is now only leftovers
        if plan.target_folder.exists() {
            match fs::remove_dir_all(plan.target_folder) {
                Ok(()) => self
                    .reporter
                    .info(&format!("Removed original folder {:?}", plan.target_folder)),
                Err(e) => self.reporter.error(&format!(
                    "Failed to remove original folder {:?}: {}",
                    plan.target_folder, e
                )),
            }
        }

        // Step 4: archives, from every cleanup root regardless of where they were found
        let removed = self.remove_archives(&plan.archive_names);

        self.reporter.info("Cleanup completed successfully");
        Ok(removed)
    }

    fn remove_archives(&self, names: &[&str]) -> Vec<PathBuf> {
        let mut removed = Vec::new();
        for name in names {
            for root in self.roots.archive_cleanup_roots() {
                let path = root.join(name);
                match fs::remove_file(&path) {
                    Ok(()) => {
                        self.reporter.info(&format!("Deleted archive {:?}", path));
                        removed.push(path);
                    }
                    Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                    Err(e) => self
                        .reporter
                        .error(&format!("Failed to delete archive {:?}: {}", path, e)),
                }
            }
        }
        removed
    }
}
