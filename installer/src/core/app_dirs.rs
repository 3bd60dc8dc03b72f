//! Centralized app data directory management
//!
//! Logs and the JSON configuration live under the paths returned here so the
//! CLI and any embedding front end agree on one storage location.

use std::path::PathBuf;

/// App identifier used as the data folder name
const APP_IDENTIFIER: &str = "com.remodteam.reaio";

/// Get the app data directory for persistent storage
///
/// Returns platform-specific paths:
/// - Windows: %LOCALAPPDATA%\com.remodteam.reaio
/// - macOS: ~/Library/Application Support/com.remodteam.reaio
/// - Linux: ~/.local/share/com.remodteam.reaio (or $XDG_DATA_HOME)
pub fn get_app_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os("REAIO_DATA_DIR") {
        return PathBuf::from(dir);
    }

    dirs::data_local_dir()
        .map(|dir| dir.join(APP_IDENTIFIER))
        // Fallback to current directory
        .unwrap_or_else(|| PathBuf::from(".").join(APP_IDENTIFIER))
}

/// Get the logs directory
pub fn get_logs_dir() -> PathBuf {
    get_app_data_dir().join("logs")
}

/// Get the installer configuration file path
pub fn get_config_path() -> PathBuf {
    get_app_data_dir().join("config.json")
}
