//! Well-known filesystem roots
//!
//! The installer only ever looks in three places: the desktop (game folders,
//! final install location), the downloads folder and the directory the
//! executable lives in.

use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

use crate::config::InstallerConfig;

pub const DESKTOP_ENV: &str = "REAIO_DESKTOP_DIR";
pub const DOWNLOADS_ENV: &str = "REAIO_DOWNLOADS_DIR";
pub const APP_DIR_ENV: &str = "REAIO_APP_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellKnownRoots {
    pub desktop: PathBuf,
    pub downloads: PathBuf,
    pub app_dir: PathBuf,
}

impl WellKnownRoots {
    pub fn new(
        desktop: impl Into<PathBuf>,
        downloads: impl Into<PathBuf>,
        app_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            desktop: desktop.into(),
            downloads: downloads.into(),
            app_dir: app_dir.into(),
        }
    }

    /// Resolve each root with precedence: config file, environment, host default.
    pub fn resolve(config: &InstallerConfig) -> Result<Self> {
        let desktop = pick(config.desktop_dir.as_deref(), DESKTOP_ENV, dirs::desktop_dir)
            .context("Could not determine the desktop directory")?;
        let downloads = pick(
            config.downloads_dir.as_deref(),
            DOWNLOADS_ENV,
            dirs::download_dir,
        )
        .context("Could not determine the downloads directory")?;
        let app_dir = pick(config.app_dir.as_deref(), APP_DIR_ENV, executable_dir)
            .context("Could not determine the application directory")?;

        Ok(Self {
            desktop,
            downloads,
            app_dir,
        })
    }

    /// Search order for mod archives. Earlier roots shadow later ones.
    pub fn archive_search_order(&self) -> [&Path; 3] {
        [&self.desktop, &self.downloads, &self.app_dir]
    }

    /// Roots archives are deleted from after a successful install.
    pub fn archive_cleanup_roots(&self) -> [&Path; 2] {
        [&self.desktop, &self.downloads]
    }
}

fn pick(
    configured: Option<&Path>,
    env_key: &str,
    host_default: fn() -> Option<PathBuf>,
) -> Option<PathBuf> {
    configured
        .map(Path::to_path_buf)
        .or_else(|| std::env::var_os(env_key).map(PathBuf::from))
        .or_else(host_default)
}

fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}
