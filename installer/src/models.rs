use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use crate::error::ErrorCode;

/// Static description of one supported game.
///
/// Supplied by the profile catalog; the pipeline uses the fields as names and
/// relative paths without validating them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetProfile {
    pub id: String,
    /// Game folder expected on the desktop
    pub folder_name: String,
    /// Primary mod archive file name
    pub archive_name: String,
    /// Path inside the game folder that receives the merged payload
    pub data_subpath: String,
    /// Permanent folder name on the desktop after finalize
    pub final_name: String,
    /// Archives layered before the primary one for the overlay variant
    #[serde(default)]
    pub overlay_archives: Vec<String>,
    /// Create an empty save folder for the post-install-extras variants
    #[serde(default)]
    pub requires_savedata_dir: bool,
    #[serde(default = "default_savedata_dir_name")]
    pub savedata_dir_name: String,
}

fn default_savedata_dir_name() -> String {
    "Savedata".to_string()
}

impl TargetProfile {
    /// Variants a front end should offer for this game.
    pub fn available_variants(&self) -> Vec<ProcessVariant> {
        if self.overlay_archives.is_empty() && !self.requires_savedata_dir {
            vec![ProcessVariant::Auto]
        } else {
            vec![ProcessVariant::Amd, ProcessVariant::Nvidia]
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessVariant {
    Auto,
    Amd,
    Nvidia,
}

impl ProcessVariant {
    /// Overlay archives are layered only for the AMD fix.
    pub fn applies_overlays(self) -> bool {
        matches!(self, ProcessVariant::Amd)
    }

    pub fn wants_post_install_extras(self) -> bool {
        matches!(self, ProcessVariant::Amd | ProcessVariant::Nvidia)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProcessVariant::Auto => "auto",
            ProcessVariant::Amd => "amd",
            ProcessVariant::Nvidia => "nvidia",
        }
    }
}

impl fmt::Display for ProcessVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProcessVariant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(ProcessVariant::Auto),
            "amd" => Ok(ProcessVariant::Amd),
            "nvidia" => Ok(ProcessVariant::Nvidia),
            other => Err(format!(
                "unknown variant '{}', expected auto, amd or nvidia",
                other
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallRequest {
    pub target_id: String,
    pub variant: ProcessVariant,
}

impl InstallRequest {
    pub fn new(target_id: impl Into<String>, variant: ProcessVariant) -> Self {
        Self {
            target_id: target_id.into(),
            variant,
        }
    }
}

/// Pipeline state. `Failed` is reachable from every non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum InstallPhase {
    Idle,
    LocatingTarget,
    ExtractingOverlays { index: usize, total: usize },
    ExtractingPrimary,
    Merging,
    Finalizing,
    Done,
    Failed,
}

impl InstallPhase {
    pub fn is_terminal(self) -> bool {
        matches!(self, InstallPhase::Done | InstallPhase::Failed)
    }
}

impl fmt::Display for InstallPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstallPhase::Idle => write!(f, "idle"),
            InstallPhase::LocatingTarget => write!(f, "locating target"),
            InstallPhase::ExtractingOverlays { index, total } => {
                write!(f, "extracting overlay {}/{}", index + 1, total)
            }
            InstallPhase::ExtractingPrimary => write!(f, "extracting primary archive"),
            InstallPhase::Merging => write!(f, "merging"),
            InstallPhase::Finalizing => write!(f, "finalizing"),
            InstallPhase::Done => write!(f, "done"),
            InstallPhase::Failed => write!(f, "failed"),
        }
    }
}

/// Typed events delivered from the worker to whatever front end listens.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    Started {
        timestamp: DateTime<Local>,
        target_id: String,
        variant: ProcessVariant,
    },
    Progress {
        timestamp: DateTime<Local>,
        message: String,
        is_error: bool,
    },
    Failed {
        timestamp: DateTime<Local>,
        phase: InstallPhase,
        code: ErrorCode,
        reason: String,
    },
    Completed {
        timestamp: DateTime<Local>,
        final_path: PathBuf,
    },
}

impl InstallEvent {
    pub fn timestamp(&self) -> DateTime<Local> {
        match self {
            InstallEvent::Started { timestamp, .. }
            | InstallEvent::Progress { timestamp, .. }
            | InstallEvent::Failed { timestamp, .. }
            | InstallEvent::Completed { timestamp, .. } => *timestamp,
        }
    }

    pub fn is_error(&self) -> bool {
        match self {
            InstallEvent::Progress { is_error, .. } => *is_error,
            InstallEvent::Failed { .. } => true,
            _ => false,
        }
    }

    /// Human readable text without the timestamp prefix
    pub fn message(&self) -> String {
        match self {
            InstallEvent::Started {
                target_id, variant, ..
            } => format!("Starting {} install for {}", variant, target_id),
            InstallEvent::Progress { message, .. } => message.clone(),
            InstallEvent::Failed { reason, .. } => format!("Error: {}", reason),
            InstallEvent::Completed { .. } => "Process completed successfully".to_string(),
        }
    }

    /// `[hh:mm:ss] message`, the log line format shown to users
    pub fn log_line(&self) -> String {
        format!("{} {}", self.timestamp().format("[%H:%M:%S]"), self.message())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryFailure {
    pub entry: String,
    pub reason: String,
}

/// Per-call tally for extraction and merge, which never fail as a whole on a
/// single bad entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct EntryOutcome {
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub failures: Vec<EntryFailure>,
}

impl EntryOutcome {
    pub fn record_success(&mut self) {
        self.succeeded += 1;
    }

    pub fn record_skip(&mut self) {
        self.skipped += 1;
    }

    pub fn record_failure(&mut self, entry: impl Into<String>, reason: impl fmt::Display) {
        self.failed += 1;
        self.failures.push(EntryFailure {
            entry: entry.into(),
            reason: reason.to_string(),
        });
    }

    pub fn absorb(&mut self, other: EntryOutcome) {
        self.succeeded += other.succeeded;
        self.failed += other.failed;
        self.skipped += other.skipped;
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failed == 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StepKind {
    Overlay,
    Primary,
}

impl StepKind {
    pub fn as_str(self) -> &'static str {
        match self {
            StepKind::Overlay => "overlay",
            StepKind::Primary => "primary",
        }
    }
}

/// Result of one archive's extract → flatten → merge pass
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepReport {
    pub kind: StepKind,
    pub archive_path: PathBuf,
    /// Name of the single folder the archive wrapped its content in, if any
    pub flattened_root: Option<String>,
    pub extraction: EntryOutcome,
    pub merge: EntryOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InstallReport {
    pub target_id: String,
    pub variant: ProcessVariant,
    pub final_path: PathBuf,
    pub steps: Vec<StepReport>,
    pub savedata_dir: Option<PathBuf>,
    pub removed_archives: Vec<PathBuf>,
}

impl InstallReport {
    /// Extraction and merge tallies of every step added together
    pub fn entry_totals(&self) -> EntryOutcome {
        let mut totals = EntryOutcome::default();
        for step in &self.steps {
            totals.absorb(step.extraction.clone());
            totals.absorb(step.merge.clone());
        }
        totals
    }

    pub fn total_entry_failures(&self) -> usize {
        self.entry_totals().failed
    }
}
