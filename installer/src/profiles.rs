//! Game profile catalog
//!
//! Built-in profiles cover the three SOURCENEXT Japanese PC releases. A JSON
//! file (array of profiles) can replace them without rebuilding.

use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::models::TargetProfile;

/// A mod archive the user downloads manually before installing
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ModDownload {
    pub file_name: &'static str,
    pub url: String,
}

const RELEASE_BASE: &str =
    "https://github.com/TheOtherGuy66-source/Resident_Evil_Python_Builder_kit/releases/download/amd";

/// Archives the installer expects to find on the desktop or in downloads.
pub fn known_downloads() -> Vec<ModDownload> {
    [
        "Biohazard_mod.zip",
        "Bio2_mod.zip",
        "Bio3_mod.zip",
        "dgVoodoo_AMD_fix.zip",
    ]
    .into_iter()
    .map(|file_name| ModDownload {
        file_name,
        url: format!("{}/{}", RELEASE_BASE, file_name),
    })
    .collect()
}

/// Lookup from target identifier to profile. Ordered so listings are stable.
#[derive(Debug, Clone, Default)]
pub struct ProfileCatalog {
    profiles: BTreeMap<String, TargetProfile>,
}

impl ProfileCatalog {
    pub fn new(profiles: impl IntoIterator<Item = TargetProfile>) -> Self {
        Self {
            profiles: profiles
                .into_iter()
                .map(|p| (p.id.clone(), p))
                .collect(),
        }
    }

    pub fn builtin() -> Self {
        Self::new([
            TargetProfile {
                id: "RE1".to_string(),
                folder_name: "BIOHAZARD Mediakite".to_string(),
                archive_name: "Biohazard_mod.zip".to_string(),
                data_subpath: "horr".to_string(),
                final_name: "RE1SHDP - RE Seamless HD Project".to_string(),
                overlay_archives: vec!["dgVoodoo_AMD_fix.zip".to_string()],
                requires_savedata_dir: true,
                savedata_dir_name: "Savedata".to_string(),
            },
            TargetProfile {
                id: "RE2".to_string(),
                folder_name: "biohazard-2-apan-source-next".to_string(),
                archive_name: "Bio2_mod.zip".to_string(),
                data_subpath: "data".to_string(),
                final_name: "RE2SHDP - RE Seamless HD Project".to_string(),
                overlay_archives: Vec::new(),
                requires_savedata_dir: false,
                savedata_dir_name: "Savedata".to_string(),
            },
            TargetProfile {
                id: "RE3".to_string(),
                folder_name: "Bio Hazard 3 (SOURCENEXT)".to_string(),
                archive_name: "Bio3_mod.zip".to_string(),
                data_subpath: "data".to_string(),
                final_name: "RE3SHDP - RE Seamless HD Project".to_string(),
                overlay_archives: Vec::new(),
                requires_savedata_dir: false,
                savedata_dir_name: "Savedata".to_string(),
            },
        ])
    }

    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read profiles file {:?}", path))?;
        let profiles: Vec<TargetProfile> = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse profiles file {:?}", path))?;
        Ok(Self::new(profiles))
    }

    /// Case-insensitive on the identifier so `re1` works from the CLI.
    pub fn get(&self, id: &str) -> Option<&TargetProfile> {
        self.profiles.get(id).or_else(|| {
            self.profiles
                .values()
                .find(|p| p.id.eq_ignore_ascii_case(id))
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &TargetProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Requirements text shown by `reaio help-requirements`.
pub fn requirements_text(catalog: &ProfileCatalog) -> String {
    let mut text = String::from(
        "Game Requirements:\n\n\
         - Japanese versions required\n\
         - Folders must be on Desktop\n\
         - Correct folder names:\n",
    );
    for profile in catalog.iter() {
        text.push_str(&format!("  • {}: {}\n", profile.id, profile.folder_name));
    }
    text.push_str("\nMod ZIPs should be in Downloads or Desktop");
    text
}
