//! Configuration and artifact paths

use std::io;
use std::path::{Path, PathBuf};

/// Name used for the per-user configuration directory
const APP_NAME: &str = "ui-walkthrough";

/// Default screenshot directory, relative to the working directory
pub const DEFAULT_SCREENSHOT_DIR: &str = "test_screenshots";

/// Get the configuration directory path
///
/// Uses the directories crate for platform-appropriate locations:
/// - Linux: `~/.config/ui-walkthrough/`
/// - macOS: `~/Library/Application Support/ui-walkthrough/`
/// - Windows: `%APPDATA%\ui-walkthrough\`
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", APP_NAME).map(|dirs| dirs.config_dir().to_path_buf())
}

/// Get the path to the configuration file
pub fn config_path() -> Option<PathBuf> {
    config_dir().map(|dir| dir.join("config.toml"))
}

/// Ensure the screenshot directory exists, creating parents as needed
pub fn ensure_screenshot_dir(dir: &Path) -> io::Result<PathBuf> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
    }
    Ok(dir.to_path_buf())
}

/// File path for a screenshot label
///
/// Labels without an extension get `.png` appended. Path separators in the
/// label are replaced so every screenshot lands directly in `dir`.
pub fn screenshot_path(dir: &Path, label: &str) -> PathBuf {
    let file = label.replace(['/', '\\'], "_");
    if file.to_ascii_lowercase().ends_with(".png") {
        dir.join(file)
    } else {
        dir.join(format!("{}.png", file))
    }
}
