//! Installer configuration
//!
//! Stored as JSON in the app data directory. Every field is optional: a
//! missing file or field falls back to environment variables and then to the
//! host's standard folders.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::core::app_dirs;
use crate::logger;
use crate::profiles::ProfileCatalog;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InstallerConfig {
    /// JSON file replacing the built-in game profiles
    pub profiles_path: Option<PathBuf>,
    pub desktop_dir: Option<PathBuf>,
    pub downloads_dir: Option<PathBuf>,
    pub app_dir: Option<PathBuf>,
}

impl InstallerConfig {
    /// Load from the default location in the app data directory, writing a
    /// default file there on first run so users have something to edit.
    pub fn load_default() -> Result<Self> {
        let path = app_dirs::get_config_path();
        let config = Self::load(&path)?;
        if !path.exists() {
            if let Err(e) = config.save(&path) {
                logger::log_error(
                    &format!("Failed to write default config: {:#}", e),
                    Some("config"),
                );
            }
        }
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            logger::log_info(
                &format!("No config file at {:?}, using defaults", path),
                Some("config"),
            );
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).context(format!("Failed to read config {:?}", path))?;
        let config = serde_json::from_str(&content)
            .context(format!("Failed to parse config {:?}", path))?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .context(format!("Failed to create config directory {:?}", parent))?;
        }
        let json = serde_json::to_string_pretty(self).context("Failed to serialize config")?;
        fs::write(path, json).context(format!("Failed to write config {:?}", path))?;
        Ok(())
    }

    /// Built-in profiles unless a profiles file is configured.
    pub fn load_catalog(&self) -> Result<ProfileCatalog> {
        match &self.profiles_path {
            Some(path) => ProfileCatalog::from_json_file(path),
            None => Ok(ProfileCatalog::builtin()),
        }
    }
}
