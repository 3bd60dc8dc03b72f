use std::fs;
use std::io;
use std::path::Path;

use super::progress::{ProgressSink, Reporter};
use crate::error::{InstallError, InstallResult};
use crate::models::EntryOutcome;

/// Copies an extracted tree over the live game data.
///
/// Same-named destination files are replaced, everything else already in the
/// destination is left alone. Copy failures are per entry.
pub struct TreeMerger<'a> {
    reporter: Reporter<'a>,
}

impl<'a> TreeMerger<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            reporter: Reporter::new(sink, "merge"),
        }
    }

    /// Merge the contents of `src` into `dest`, creating `dest` if needed.
    ///
    /// Fails only when `dest` cannot be created or `src` cannot be listed;
    /// failures below that level are counted in the outcome.
    pub fn merge_into(&self, src: &Path, dest: &Path) -> InstallResult<EntryOutcome> {
        let mut outcome = EntryOutcome::default();
        self.merge_dir(src, dest, &mut outcome)?;
        Ok(outcome)
    }

    fn merge_dir(&self, src: &Path, dest: &Path, outcome: &mut EntryOutcome) -> InstallResult<()> {
        fs::create_dir_all(dest).map_err(|e| InstallError::entry(dest.display().to_string(), e))?;
        let entries =
            fs::read_dir(src).map_err(|e| InstallError::entry(src.display().to_string(), e))?;

        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to read entry in {:?}: {}", src, e));
                    outcome.record_failure(src.display().to_string(), e);
                    continue;
                }
            };

            let name = entry.file_name();
            let display_name = name.to_string_lossy().to_string();
            let src_path = entry.path();
            let dest_path = dest.join(&name);

            // DirEntry::file_type does not follow symlinks
            let file_type = match entry.file_type() {
                Ok(file_type) => file_type,
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to copy: {} ({})", display_name, e));
                    outcome.record_failure(display_name, e);
                    continue;
                }
            };

            if file_type.is_dir() {
                if let Err(e) = self.merge_dir(&src_path, &dest_path, outcome) {
                    self.reporter.error(&format!("Failed to merge folder: {}", e));
                    outcome.record_failure(display_name, e);
                }
            } else if file_type.is_file() {
                match replace_file(&src_path, &dest_path) {
                    Ok(()) => {
                        self.reporter.info(&format!("Copied: {}", display_name));
                        outcome.record_success();
                    }
                    Err(e) => {
                        self.reporter
                            .error(&format!("Failed to copy: {} ({})", display_name, e));
                        outcome.record_failure(display_name, e);
                    }
                }
            } else {
                self.reporter.info(&format!(
                    "Skipping {} (not a regular file or folder)",
                    display_name
                ));
                outcome.record_skip();
            }
        }

        Ok(())
    }
}

/// Remove whatever file sits at `dest`, then copy `src` there.
fn replace_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::remove_file(dest) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    fs::copy(src, dest).map(|_| ())
}
