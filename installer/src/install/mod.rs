//! Install pipeline
//!
//! One request runs strictly in order: locate the game folder, layer each
//! overlay archive (AMD fix only), layer the primary archive, create the save
//! folder when asked for, then finalize. Only the errors listed as fatal in
//! [`InstallError::is_fatal`] stop a request; everything else is reported and
//! the pipeline moves on.

pub mod atomic_installer;
pub mod extraction;
pub mod flatten;
pub mod locator;
pub mod merge;
pub mod progress;
pub mod worker;

use chrono::Local;
use std::fs;
use std::path::PathBuf;

use crate::core::path_utils::profile_relative_path;
use crate::core::roots::WellKnownRoots;
use crate::error::{InstallError, InstallResult};
use crate::logger;
use crate::models::{
    EntryOutcome, InstallEvent, InstallPhase, InstallReport, InstallRequest, ProcessVariant,
    StepKind, StepReport, TargetProfile,
};
use crate::profiles::ProfileCatalog;

use atomic_installer::{FinalizePlan, Finalizer, ScratchDir};
use extraction::ArchiveExtractor;
use flatten::flatten_if_single_root;
use locator::DirectoryLocator;
use merge::TreeMerger;
use progress::{ProgressSink, Reporter};

/// Paths of one request, fixed once the game folder has been found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPaths {
    pub target_folder: PathBuf,
    /// `<target folder>/<data subpath>`, receives every merge
    pub merge_dest: PathBuf,
    /// `<desktop>/<final name>`
    pub final_path: PathBuf,
    /// Save folder, relative to the merged data
    pub savedata_subpath: PathBuf,
}

impl ResolvedPaths {
    /// Profile path fields are always joined as relative paths, whatever
    /// separators they start with. A field that would leave its folder is an
    /// [`InstallError::InvalidProfile`].
    pub fn new(
        target_folder: PathBuf,
        profile: &TargetProfile,
        roots: &WellKnownRoots,
    ) -> InstallResult<Self> {
        let relative = |field: &'static str, value: &str| {
            profile_relative_path(value).ok_or_else(|| InstallError::InvalidProfile {
                id: profile.id.clone(),
                field,
                value: value.to_string(),
            })
        };

        let data_subpath = relative("data subpath", &profile.data_subpath)?;
        let final_name = relative("final name", &profile.final_name)?;
        let savedata_subpath = relative("save folder name", &profile.savedata_dir_name)?;

        Ok(Self {
            merge_dest: target_folder.join(data_subpath),
            final_path: roots.desktop.join(final_name),
            target_folder,
            savedata_subpath,
        })
    }
}

/// Everything a step needs to know about the request it belongs to.
struct RequestContext<'a> {
    profile: &'a TargetProfile,
    variant: ProcessVariant,
    paths: ResolvedPaths,
}

impl RequestContext<'_> {
    fn applies_overlays(&self) -> bool {
        self.variant.applies_overlays() && !self.profile.overlay_archives.is_empty()
    }

    fn wants_savedata_dir(&self) -> bool {
        self.variant.wants_post_install_extras() && self.profile.requires_savedata_dir
    }
}

/// One archive waiting to be layered onto the game data.
struct ArchiveStep {
    kind: StepKind,
    archive_path: PathBuf,
    scratch: ScratchDir,
}

pub struct InstallPipeline {
    profiles: ProfileCatalog,
    roots: WellKnownRoots,
}

impl InstallPipeline {
    pub fn new(profiles: ProfileCatalog, roots: WellKnownRoots) -> Self {
        Self { profiles, roots }
    }

    pub fn profiles(&self) -> &ProfileCatalog {
        &self.profiles
    }

    pub fn roots(&self) -> &WellKnownRoots {
        &self.roots
    }

    pub fn run(&self, request: &InstallRequest, sink: &dyn ProgressSink) -> InstallResult<InstallReport> {
        self.run_install(&request.target_id, request.variant, sink)
    }

    /// Run one install request to completion.
    ///
    /// The sink sees `Started`, then progress lines, then exactly one of
    /// `Completed` or `Failed`.
    pub fn run_install(
        &self,
        target_id: &str,
        variant: ProcessVariant,
        sink: &dyn ProgressSink,
    ) -> InstallResult<InstallReport> {
        let reporter = Reporter::new(sink, "install");
        reporter.emit(InstallEvent::Started {
            timestamp: Local::now(),
            target_id: target_id.to_string(),
            variant,
        });
        logger::log_info(
            &format!("Starting {} install for {}", variant, target_id),
            Some("install"),
        );

        let mut phase = InstallPhase::Idle;
        match self.execute(target_id, variant, sink, &reporter, &mut phase) {
            Ok(report) => {
                logger::log_info(
                    &format!("Install of {} finished at {:?}", target_id, report.final_path),
                    Some("install"),
                );
                reporter.emit(InstallEvent::Completed {
                    timestamp: Local::now(),
                    final_path: report.final_path.clone(),
                });
                Ok(report)
            }
            Err(e) => {
                logger::log_error(
                    &format!("Install of {} failed while {}: {}", target_id, phase, e),
                    Some("install"),
                );
                reporter.emit(InstallEvent::Failed {
                    timestamp: Local::now(),
                    phase,
                    code: e.code(),
                    reason: e.to_string(),
                });
                enter(&mut phase, InstallPhase::Failed);
                Err(e)
            }
        }
    }

    fn execute(
        &self,
        target_id: &str,
        variant: ProcessVariant,
        sink: &dyn ProgressSink,
        reporter: &Reporter<'_>,
        phase: &mut InstallPhase,
    ) -> InstallResult<InstallReport> {
        let profile = self
            .profiles
            .get(target_id)
            .ok_or_else(|| InstallError::UnknownTarget(target_id.to_string()))?;
        let locator = DirectoryLocator::new(&self.roots);

        enter(phase, InstallPhase::LocatingTarget);
        let target_folder = locator.locate_target_directory(&profile.folder_name)?;
        reporter.info(&format!("Found game directory: {}", target_folder.display()));

        let ctx = RequestContext {
            profile,
            variant,
            paths: ResolvedPaths::new(target_folder, profile, &self.roots)?,
        };
        let mut steps = Vec::new();

        if ctx.applies_overlays() {
            let total = profile.overlay_archives.len();
            for (index, name) in profile.overlay_archives.iter().enumerate() {
                enter(phase, InstallPhase::ExtractingOverlays { index, total });
                let step = ArchiveStep {
                    kind: StepKind::Overlay,
                    archive_path: locator.locate_archive_file(name)?,
                    scratch: ScratchDir::new(&ctx.paths.target_folder, StepKind::Overlay),
                };
                steps.push(self.apply_archive(&ctx, step, sink, reporter, phase));
            }
        }

        enter(phase, InstallPhase::ExtractingPrimary);
        let step = ArchiveStep {
            kind: StepKind::Primary,
            archive_path: locator.locate_archive_file(&profile.archive_name)?,
            scratch: ScratchDir::new(&ctx.paths.target_folder, StepKind::Primary),
        };
        steps.push(self.apply_archive(&ctx, step, sink, reporter, phase));

        let created_savedata = self.create_savedata_dir(&ctx, reporter);

        enter(phase, InstallPhase::Finalizing);
        let mut archive_names = vec![profile.archive_name.as_str()];
        if ctx.applies_overlays() {
            archive_names.extend(profile.overlay_archives.iter().map(String::as_str));
        }
        let removed_archives = Finalizer::new(&self.roots, sink).finalize(&FinalizePlan {
            merge_dest: &ctx.paths.merge_dest,
            target_folder: &ctx.paths.target_folder,
            final_path: &ctx.paths.final_path,
            archive_names,
        })?;

        enter(phase, InstallPhase::Done);
        Ok(InstallReport {
            target_id: profile.id.clone(),
            variant,
            savedata_dir: created_savedata
                .then(|| ctx.paths.final_path.join(&ctx.paths.savedata_subpath)),
            final_path: ctx.paths.final_path,
            steps,
            removed_archives,
        })
    }

    /// Extract, flatten and merge one archive. Never fails the request: a bad
    /// archive or a failed merge is reported and counted.
    fn apply_archive(
        &self,
        ctx: &RequestContext<'_>,
        step: ArchiveStep,
        sink: &dyn ProgressSink,
        reporter: &Reporter<'_>,
        phase: &mut InstallPhase,
    ) -> StepReport {
        let ArchiveStep {
            kind,
            archive_path,
            scratch,
        } = step;

        reporter.info(&format!("Extracting {}", archive_path.display()));
        if let Err(e) = scratch.ensure_exists() {
            reporter.error(&format!(
                "Failed to create scratch directory {:?}: {}",
                scratch.path(),
                e
            ));
        }

        let extraction = match ArchiveExtractor::new(sink).extract(&archive_path, scratch.path()) {
            Ok(outcome) => outcome,
            Err(e) => {
                reporter.error(&e.to_string());
                EntryOutcome::default()
            }
        };

        let payload_root = flatten_if_single_root(scratch.path());
        let flattened_root = if payload_root != scratch.path() {
            let name = payload_root
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();
            reporter.info(&format!("Using subdirectory: {}", name));
            Some(name)
        } else {
            None
        };

        if kind == StepKind::Primary {
            enter(phase, InstallPhase::Merging);
        }
        reporter.info(&format!("Merging into {}", ctx.paths.merge_dest.display()));
        let merge = match TreeMerger::new(sink).merge_into(&payload_root, &ctx.paths.merge_dest) {
            Ok(outcome) => outcome,
            Err(e) => {
                reporter.error(&format!("Merge failed: {}", e));
                let mut outcome = EntryOutcome::default();
                outcome.record_failure(ctx.paths.merge_dest.display().to_string(), e);
                outcome
            }
        };

        scratch.cleanup(reporter);

        StepReport {
            kind,
            archive_path,
            flattened_root,
            extraction,
            merge,
        }
    }

    /// Returns whether the save folder now exists.
    fn create_savedata_dir(&self, ctx: &RequestContext<'_>, reporter: &Reporter<'_>) -> bool {
        if !ctx.wants_savedata_dir() {
            return false;
        }

        let path = ctx.paths.merge_dest.join(&ctx.paths.savedata_subpath);
        match fs::create_dir_all(&path) {
            Ok(()) => {
                reporter.info(&format!("Created {} folder", ctx.profile.savedata_dir_name));
                true
            }
            Err(source) => {
                reporter.error(&InstallError::CreateDirFailed { path, source }.to_string());
                false
            }
        }
    }
}

fn enter(phase: &mut InstallPhase, next: InstallPhase) {
    debug_assert!(!phase.is_terminal(), "no transition out of {}", phase);
    crate::log_debug!(&format!("{} -> {}", phase, next), "install");
    *phase = next;
}


#[cfg(test)]
mod tests {
    use super::progress::MemorySink;
    use super::test_support::write_zip;
    use super::*;
    use crate::error::ErrorCode;
    use tempfile::TempDir;

    struct Fixture {
        _root: TempDir,
        pipeline: InstallPipeline,
    }

    impl Fixture {
        fn new() -> Self {
            let root = TempDir::new().unwrap();
            let roots = WellKnownRoots::new(
                root.path().join("Desktop"),
                root.path().join("Downloads"),
                root.path().join("app"),
            );
            for dir in [&roots.desktop, &roots.downloads, &roots.app_dir] {
                fs::create_dir_all(dir).unwrap();
            }
            Self {
                _root: root,
                pipeline: InstallPipeline::new(ProfileCatalog::builtin(), roots),
            }
        }

        fn roots(&self) -> &WellKnownRoots {
            self.pipeline.roots()
        }
    }

    #[test]
    fn test_unknown_target_touches_nothing() {
        let fx = Fixture::new();
        let sink = MemorySink::new();
        let err = fx
            .pipeline
            .run_install("RE4", ProcessVariant::Auto, &sink)
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::UnknownTarget);
        let events = sink.events();
        assert_eq!(events.len(), 2);
        assert!(matches!(
            events[1],
            InstallEvent::Failed {
                phase: InstallPhase::Idle,
                ..
            }
        ));
    }

    #[test]
    fn test_missing_primary_archive_fails_after_locating() {
        let fx = Fixture::new();
        fs::create_dir(fx.roots().desktop.join("Bio Hazard 3 (SOURCENEXT)")).unwrap();

        let sink = MemorySink::new();
        let err = fx
            .pipeline
            .run_install("RE3", ProcessVariant::Auto, &sink)
            .unwrap_err();

        assert_eq!(err.to_string(), "Mod file not found: Bio3_mod.zip");
        assert_eq!(sink.error_count(), 1);
        let last = sink.events().pop().unwrap();
        assert!(matches!(
            last,
            InstallEvent::Failed {
                phase: InstallPhase::ExtractingPrimary,
                code: ErrorCode::NotFound,
                ..
            }
        ));
        // Game folder untouched
        assert!(fx.roots().desktop.join("Bio Hazard 3 (SOURCENEXT)").is_dir());
    }

    #[test]
    fn test_missing_overlay_is_fatal_for_amd_only() {
        let fx = Fixture::new();
        let game = fx.roots().desktop.join("BIOHAZARD Mediakite");
        fs::create_dir(&game).unwrap();
        write_zip(
            &fx.roots().downloads.join("Biohazard_mod.zip"),
            &[("a.dat", Some(b"a".as_slice()))],
        );

        let sink = MemorySink::new();
        let err = fx
            .pipeline
            .run_install("RE1", ProcessVariant::Amd, &sink)
            .unwrap_err();
        assert_eq!(err.to_string(), "Mod file not found: dgVoodoo_AMD_fix.zip");
        assert!(game.is_dir());

        // Nvidia never looks for the overlay
        let report = fx
            .pipeline
            .run_install("RE1", ProcessVariant::Nvidia, &MemorySink::new())
            .unwrap();
        assert_eq!(report.steps.len(), 1);
        assert!(report.final_path.join("a.dat").is_file());
        assert!(report.final_path.join("Savedata").is_dir());
    }

    #[test]
    fn test_corrupt_archive_is_logged_and_install_completes() {
        let fx = Fixture::new();
        fs::create_dir(fx.roots().desktop.join("biohazard-2-apan-source-next")).unwrap();
        fs::write(fx.roots().desktop.join("Bio2_mod.zip"), b"not a zip").unwrap();

        let sink = MemorySink::new();
        let report = fx
            .pipeline
            .run_install("RE2", ProcessVariant::Auto, &sink)
            .unwrap();

        assert!(report.final_path.is_dir());
        assert_eq!(sink.error_count(), 1);
        assert!(matches!(
            sink.events().last(),
            Some(InstallEvent::Completed { .. })
        ));
    }

    #[test]
    fn test_desktop_holds_only_the_final_folder_afterwards() {
        let fx = Fixture::new();
        let game = fx.roots().desktop.join("biohazard-2-apan-source-next");
        fs::create_dir_all(game.join("data")).unwrap();
        write_zip(
            &fx.roots().desktop.join("Bio2_mod.zip"),
            &[("mod/x.bin", Some(b"x".as_slice()))],
        );

        let report = fx
            .pipeline
            .run_install("RE2", ProcessVariant::Auto, &MemorySink::new())
            .unwrap();

        assert_eq!(report.steps[0].flattened_root.as_deref(), Some("mod"));
        let desktop: Vec<String> = fs::read_dir(&fx.roots().desktop)
            .unwrap()
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        assert_eq!(desktop, vec!["RE2SHDP - RE Seamless HD Project"]);
        assert_eq!(fs::read(report.final_path.join("x.bin")).unwrap(), b"x");
    }

    fn re1_profile() -> TargetProfile {
        ProfileCatalog::builtin().get("RE1").unwrap().clone()
    }

    #[test]
    fn test_resolved_paths() {
        let roots = WellKnownRoots::new("/d", "/dl", "/app");
        let paths =
            ResolvedPaths::new(PathBuf::from("/d/BIOHAZARD Mediakite"), &re1_profile(), &roots)
                .unwrap();
        assert_eq!(paths.merge_dest, PathBuf::from("/d/BIOHAZARD Mediakite/horr"));
        assert_eq!(
            paths.final_path,
            PathBuf::from("/d/RE1SHDP - RE Seamless HD Project")
        );
        assert_eq!(paths.savedata_subpath, PathBuf::from("Savedata"));
    }

    #[test]
    fn test_leading_separator_stays_inside_game_folder() {
        let roots = WellKnownRoots::new("/d", "/dl", "/app");
        let mut profile = re1_profile();
        profile.data_subpath = "/horr".to_string();
        profile.final_name = "\\RE1SHDP - RE Seamless HD Project".to_string();

        let paths =
            ResolvedPaths::new(PathBuf::from("/d/BIOHAZARD Mediakite"), &profile, &roots).unwrap();
        assert_eq!(paths.merge_dest, PathBuf::from("/d/BIOHAZARD Mediakite/horr"));
        assert!(paths.merge_dest.starts_with(&paths.target_folder));
        assert_eq!(
            paths.final_path,
            PathBuf::from("/d/RE1SHDP - RE Seamless HD Project")
        );
    }

    #[test]
    fn test_escaping_subpath_is_invalid_profile() {
        let roots = WellKnownRoots::new("/d", "/dl", "/app");
        let mut profile = re1_profile();
        profile.data_subpath = "../horr".to_string();

        let err = ResolvedPaths::new(PathBuf::from("/d/BIOHAZARD Mediakite"), &profile, &roots)
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidProfile);
        assert!(err.is_fatal());
        assert!(err.to_string().contains("data subpath"));
    }

    #[test]
    fn test_profile_with_rooted_subpath_installs_into_game_folder() {
        let root = TempDir::new().unwrap();
        let roots = WellKnownRoots::new(
            root.path().join("Desktop"),
            root.path().join("Downloads"),
            root.path().join("app"),
        );
        for dir in [&roots.desktop, &roots.downloads, &roots.app_dir] {
            fs::create_dir_all(dir).unwrap();
        }
        let mut profile = re1_profile();
        profile.data_subpath = "/horr".to_string();
        profile.final_name = "/RE1 HD".to_string();
        let game = roots.desktop.join(&profile.folder_name);
        fs::create_dir_all(game.join("horr")).unwrap();
        fs::write(game.join("horr/keep.dat"), b"keep").unwrap();
        write_zip(
            &roots.desktop.join(&profile.archive_name),
            &[("a.dat", Some(b"a".as_slice()))],
        );

        let pipeline = InstallPipeline::new(ProfileCatalog::new([profile]), roots);
        let report = pipeline
            .run_install("RE1", ProcessVariant::Auto, &MemorySink::new())
            .unwrap();

        assert_eq!(report.final_path, pipeline.roots().desktop.join("RE1 HD"));
        assert_eq!(fs::read(report.final_path.join("a.dat")).unwrap(), b"a");
        assert_eq!(fs::read(report.final_path.join("keep.dat")).unwrap(), b"keep");
    }

    #[test]
    fn test_invalid_profile_fails_before_touching_the_game_folder() {
        let fx = Fixture::new();
        let mut profile = re1_profile();
        profile.final_name = "../escape".to_string();
        let game = fx.roots().desktop.join(&profile.folder_name);
        fs::create_dir(&game).unwrap();
        write_zip(
            &fx.roots().desktop.join(&profile.archive_name),
            &[("a.dat", Some(b"a".as_slice()))],
        );

        let pipeline = InstallPipeline::new(ProfileCatalog::new([profile]), fx.roots().clone());
        let sink = MemorySink::new();
        let err = pipeline
            .run_install("RE1", ProcessVariant::Auto, &sink)
            .unwrap_err();

        assert_eq!(err.code(), ErrorCode::InvalidProfile);
        assert_eq!(sink.error_count(), 1);
        assert_eq!(fs::read_dir(&game).unwrap().count(), 0);
        assert!(fx.roots().desktop.join("Biohazard_mod.zip").exists());
    }
}
