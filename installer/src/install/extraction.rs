use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use zip::ZipArchive;

use super::progress::{ProgressSink, Reporter};
use crate::core::path_utils::{is_directory_marker, sanitize_entry_name};
use crate::error::{InstallError, InstallResult};
use crate::models::EntryOutcome;

/// Unpacks zip archives into a scratch directory.
///
/// Entry failures are recorded in the returned [`EntryOutcome`] and reported,
/// never propagated: the caller merges whatever landed on disk.
pub struct ArchiveExtractor<'a> {
    reporter: Reporter<'a>,
}

impl<'a> ArchiveExtractor<'a> {
    pub fn new(sink: &'a dyn ProgressSink) -> Self {
        Self {
            reporter: Reporter::new(sink, "extraction"),
        }
    }

    /// Extract every file entry of `archive_path` under `dest_dir`.
    ///
    /// Only an archive that cannot be opened at all is an error
    /// ([`InstallError::OpenFailed`]).
    pub fn extract(&self, archive_path: &Path, dest_dir: &Path) -> InstallResult<EntryOutcome> {
        let mut archive = open_archive(archive_path)?;
        let mut outcome = EntryOutcome::default();

        crate::log_debug!(
            &format!(
                "Extracting {} entries from {:?} into {:?}",
                archive.len(),
                archive_path,
                dest_dir
            ),
            "extraction"
        );

        for index in 0..archive.len() {
            let mut entry = match archive.by_index(index) {
                Ok(entry) => entry,
                Err(e) => {
                    self.reporter.info(&format!(
                        "Warning: skipping file (open failed): entry #{}: {}",
                        index, e
                    ));
                    outcome.record_skip();
                    continue;
                }
            };

            let name = entry.name().to_string();
            if is_directory_marker(&name) {
                continue;
            }

            let Some(relative) = sanitize_entry_name(&name) else {
                self.reporter
                    .error(&format!("Skipping file (unsafe path): {}", name));
                outcome.record_failure(&name, "entry path escapes the extraction directory");
                continue;
            };
            let file_path = dest_dir.join(relative);

            let written = file_path
                .parent()
                .map_or(Ok(()), fs::create_dir_all)
                .and_then(|()| {
                    let mut output = BufWriter::new(fs::File::create(&file_path)?);
                    std::io::copy(&mut entry, &mut output)?;
                    output.flush()
                });

            match written {
                Ok(()) => {
                    self.reporter.info(&format!("Extracted: {}", name));
                    outcome.record_success();
                }
                Err(e) => {
                    self.reporter
                        .error(&format!("Failed to write: {} ({})", name, e));
                    outcome.record_failure(&name, e);
                }
            }
        }

        Ok(outcome)
    }
}

fn open_archive(archive_path: &Path) -> InstallResult<ZipArchive<BufReader<fs::File>>> {
    let open_failed = |source| InstallError::OpenFailed {
        path: archive_path.to_path_buf(),
        source,
    };

    let file = fs::File::open(archive_path).map_err(|e| open_failed(zip::result::ZipError::Io(e)))?;
    ZipArchive::new(BufReader::new(file)).map_err(open_failed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::install::progress::MemorySink;
    use crate::install::test_support::{read_tree, write_zip};
    use std::collections::BTreeMap;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[test]
    fn test_unreadable_entry_is_skipped_with_a_warning() {
        use zip::write::SimpleFileOptions;
        use zip::{AesMode, ZipWriter};

        let dir = tempdir().unwrap();
        let archive = dir.path().join("locked.zip");
        let mut writer = ZipWriter::new(fs::File::create(&archive).unwrap());
        writer
            .start_file(
                "locked.dat",
                SimpleFileOptions::default().with_aes_encryption(AesMode::Aes256, "pw"),
            )
            .unwrap();
        writer.write_all(b"secret").unwrap();
        writer
            .start_file("open.dat", SimpleFileOptions::default())
            .unwrap();
        writer.write_all(b"open").unwrap();
        writer.finish().unwrap();

        let out = dir.path().join("out");
        fs::create_dir(&out).unwrap();
        let sink = MemorySink::new();
        let outcome = ArchiveExtractor::new(&sink).extract(&archive, &out).unwrap();

        assert_eq!(outcome.skipped, 1);
        assert_eq!(outcome.succeeded, 1);
        assert_eq!(sink.error_count(), 0);
        assert!(sink
            .messages()
            .iter()
            .any(|m| m.starts_with("Warning: skipping file (open failed): entry #0")));
        assert_eq!(fs::read(out.join("open.dat")).unwrap(), b"open");
        assert!(!out.join("locked.dat").exists());
    }

    #[test]
    fn test_extract_preserves_structure_and_skips_dir_markers() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("mod.zip");
        write_zip(
            &archive,
            &[
                ("payload/", None),
                ("payload/a.dat", Some(b"alpha".as_slice())),
                ("payload/sub/", None),
                ("payload/sub/b.dat", Some(b"bravo".as_slice())),
            ],
        );

        let sink = MemorySink::new();
        let dest = dir.path().join("scratch");
        let outcome = ArchiveExtractor::new(&sink).extract(&archive, &dest).unwrap();

        assert_eq!(outcome.succeeded, 2);
        assert!(outcome.is_clean());

        let expected: BTreeMap<PathBuf, Vec<u8>> = [
            (PathBuf::from("payload/a.dat"), b"alpha".to_vec()),
            (PathBuf::from("payload/sub/b.dat"), b"bravo".to_vec()),
        ]
        .into_iter()
        .collect();
        assert_eq!(read_tree(&dest), expected);
        assert!(sink.messages().contains(&"Extracted: payload/a.dat".to_string()));
    }

    #[test]
    fn test_extract_independent_of_entry_order() {
        let dir = tempdir().unwrap();
        let forward = dir.path().join("forward.zip");
        let reverse = dir.path().join("reverse.zip");
        let entries: Vec<(&str, Option<&[u8]>)> = vec![
            ("x/1.bin", Some(b"one".as_slice())),
            ("x/y/2.bin", Some(b"two".as_slice())),
            ("3.bin", Some(b"three".as_slice())),
        ];
        write_zip(&forward, &entries);
        let reversed: Vec<_> = entries.iter().rev().cloned().collect();
        write_zip(&reverse, &reversed);

        let sink = MemorySink::new();
        let extractor = ArchiveExtractor::new(&sink);
        extractor.extract(&forward, &dir.path().join("a")).unwrap();
        extractor.extract(&reverse, &dir.path().join("b")).unwrap();

        assert_eq!(read_tree(&dir.path().join("a")), read_tree(&dir.path().join("b")));
    }

    #[test]
    fn test_extract_overwrites_existing_file() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("mod.zip");
        write_zip(&archive, &[("a.dat", Some(b"new".as_slice()))]);

        let dest = dir.path().join("scratch");
        fs::create_dir_all(&dest).unwrap();
        fs::write(dest.join("a.dat"), b"much older content").unwrap();

        ArchiveExtractor::new(&MemorySink::new())
            .extract(&archive, &dest)
            .unwrap();
        assert_eq!(fs::read(dest.join("a.dat")).unwrap(), b"new");
    }

    #[test]
    fn test_write_failure_does_not_stop_other_entries() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("mod.zip");
        write_zip(
            &archive,
            &[
                ("a.dat", Some(b"alpha".as_slice())),
                ("sub/b.dat", Some(b"bravo".as_slice())),
            ],
        );

        // A directory squatting on the file path makes the write fail.
        let dest = dir.path().join("scratch");
        fs::create_dir_all(dest.join("a.dat")).unwrap();

        let sink = MemorySink::new();
        let outcome = ArchiveExtractor::new(&sink).extract(&archive, &dest).unwrap();

        assert_eq!(outcome.succeeded, 1);
        assert_eq!(outcome.failed, 1);
        assert_eq!(outcome.failures[0].entry, "a.dat");
        assert_eq!(fs::read(dest.join("sub/b.dat")).unwrap(), b"bravo");
        assert_eq!(sink.error_count(), 1);
    }

    #[test]
    fn test_unreadable_archive_is_open_failed() {
        let dir = tempdir().unwrap();
        let archive = dir.path().join("broken.zip");
        fs::write(&archive, b"this is not a zip file").unwrap();

        let err = ArchiveExtractor::new(&MemorySink::new())
            .extract(&archive, &dir.path().join("scratch"))
            .unwrap_err();
        assert!(matches!(err, InstallError::OpenFailed { .. }));
        assert!(!err.is_fatal());
    }

    #[test]
    fn test_missing_archive_is_open_failed() {
        let dir = tempdir().unwrap();
        let err = ArchiveExtractor::new(&MemorySink::new())
            .extract(&dir.path().join("nope.zip"), &dir.path().join("scratch"))
            .unwrap_err();
        assert!(matches!(err, InstallError::OpenFailed { .. }));
    }
}
