use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Structured error codes carried on failure events
/// These let a front end distinguish failure kinds without parsing messages
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Request names a target with no profile
    UnknownTarget,
    /// Profile path field cannot be used inside its folder
    InvalidProfile,
    /// Target folder or required archive absent
    NotFound,
    /// Archive could not be opened for reading
    OpenFailed,
    /// A single archive entry or merge copy failed
    EntryFailed,
    /// Finalize rename failed
    RenameFailed,
    /// Extra directory creation failed
    CreateDirFailed,
    /// Another request is already running for this trigger
    Busy,
    /// Anything else (worker panic, config I/O)
    Internal,
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCode::UnknownTarget => write!(f, "unknown_target"),
            ErrorCode::InvalidProfile => write!(f, "invalid_profile"),
            ErrorCode::NotFound => write!(f, "not_found"),
            ErrorCode::OpenFailed => write!(f, "open_failed"),
            ErrorCode::EntryFailed => write!(f, "entry_failed"),
            ErrorCode::RenameFailed => write!(f, "rename_failed"),
            ErrorCode::CreateDirFailed => write!(f, "create_dir_failed"),
            ErrorCode::Busy => write!(f, "busy"),
            ErrorCode::Internal => write!(f, "internal"),
        }
    }
}

/// Errors raised by the install pipeline.
///
/// `NotFound`, `UnknownTarget`, `InvalidProfile` and `RenameFailed` end a
/// request; the rest are absorbed at the step that produced them and only
/// reported.
#[derive(Debug, Error)]
pub enum InstallError {
    #[error("Unknown target: {0}")]
    UnknownTarget(String),

    #[error("Profile {id} has an invalid {field}: {value:?}")]
    InvalidProfile {
        id: String,
        field: &'static str,
        value: String,
    },

    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("Failed to open archive {path:?}: {source}")]
    OpenFailed {
        path: PathBuf,
        #[source]
        source: zip::result::ZipError,
    },

    #[error("Failed to process {entry}: {reason}")]
    EntryFailed { entry: String, reason: String },

    #[error("Failed to move {from:?} to {to:?}: {source}")]
    RenameFailed {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create folder {path:?}: {source}")]
    CreateDirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("An install is already running for this action")]
    Busy,

    #[error("Install worker failed: {0}")]
    Internal(String),
}

impl InstallError {
    pub fn code(&self) -> ErrorCode {
        match self {
            InstallError::UnknownTarget(_) => ErrorCode::UnknownTarget,
            InstallError::InvalidProfile { .. } => ErrorCode::InvalidProfile,
            InstallError::NotFound { .. } => ErrorCode::NotFound,
            InstallError::OpenFailed { .. } => ErrorCode::OpenFailed,
            InstallError::EntryFailed { .. } => ErrorCode::EntryFailed,
            InstallError::RenameFailed { .. } => ErrorCode::RenameFailed,
            InstallError::CreateDirFailed { .. } => ErrorCode::CreateDirFailed,
            InstallError::Busy => ErrorCode::Busy,
            InstallError::Internal(_) => ErrorCode::Internal,
        }
    }

    /// Whether this error ends the enclosing request.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            InstallError::UnknownTarget(_)
                | InstallError::InvalidProfile { .. }
                | InstallError::NotFound { .. }
                | InstallError::RenameFailed { .. }
                | InstallError::Busy
                | InstallError::Internal(_)
        )
    }

    pub fn entry(entry: impl Into<String>, reason: impl fmt::Display) -> Self {
        InstallError::EntryFailed {
            entry: entry.into(),
            reason: reason.to_string(),
        }
    }
}

pub type InstallResult<T> = std::result::Result<T, InstallError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_code_display() {
        assert_eq!(ErrorCode::NotFound.to_string(), "not_found");
        assert_eq!(ErrorCode::RenameFailed.to_string(), "rename_failed");
        assert_eq!(ErrorCode::CreateDirFailed.to_string(), "create_dir_failed");
    }

    #[test]
    fn test_code_serialization_matches_display() {
        for code in [
            ErrorCode::UnknownTarget,
            ErrorCode::InvalidProfile,
            ErrorCode::NotFound,
            ErrorCode::OpenFailed,
            ErrorCode::EntryFailed,
            ErrorCode::RenameFailed,
            ErrorCode::CreateDirFailed,
            ErrorCode::Busy,
            ErrorCode::Internal,
        ] {
            let json = serde_json::to_string(&code).unwrap();
            assert_eq!(json, format!("\"{}\"", code));
        }
    }

    #[test]
    fn test_not_found_message_names_the_file() {
        let err = InstallError::NotFound {
            what: "Mod file",
            name: "Biohazard_mod.zip".to_string(),
        };
        assert_eq!(err.to_string(), "Mod file not found: Biohazard_mod.zip");
        assert_eq!(err.code(), ErrorCode::NotFound);
        assert!(err.is_fatal());
    }

    #[test]
    fn test_entry_level_errors_are_not_fatal() {
        let err = InstallError::entry("a.dat", "locked");
        assert_eq!(err.to_string(), "Failed to process a.dat: locked");
        assert!(!err.is_fatal());

        let err = InstallError::CreateDirFailed {
            path: PathBuf::from("/x/Savedata"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(!err.is_fatal());
        assert_eq!(err.code(), ErrorCode::CreateDirFailed);
    }

    #[test]
    fn test_rename_failed_is_fatal() {
        let err = InstallError::RenameFailed {
            from: PathBuf::from("/a"),
            to: PathBuf::from("/b"),
            source: std::io::Error::new(std::io::ErrorKind::Other, "busy"),
        };
        assert!(err.is_fatal());
        assert!(err.to_string().contains("busy"));
    }
}
