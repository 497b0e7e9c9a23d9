//! Configuration file handling
//!
//! Settings are layered: built-in defaults, then the TOML config file, then
//! command-line flags (which clap also fills from `WALKTHROUGH_*` variables).

use serde::Deserialize;
use std::path::{Path, PathBuf};

use super::paths::{config_path, DEFAULT_SCREENSHOT_DIR};
use super::Result;
use crate::walkthrough::RunnerConfig;

/// Main configuration structure
#[derive(Debug, Deserialize, Default)]
pub struct Config {
    /// The application under test
    #[serde(default)]
    pub target: TargetConfig,

    /// Browser and WebDriver settings
    #[serde(default)]
    pub browser: BrowserConfig,

    /// Timeout settings in milliseconds
    #[serde(default)]
    pub timeouts: Timeouts,

    /// Artifact output settings
    #[serde(default)]
    pub output: OutputConfig,
}

/// The application under test
#[derive(Debug, Deserialize)]
pub struct TargetConfig {
    /// Base URL relative navigation targets are resolved against
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Fail element steps whose selector matches more than one element
    #[serde(default = "default_strict")]
    pub strict: bool,
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            strict: default_strict(),
        }
    }
}

fn default_base_url() -> String {
    "http://localhost:5174/".to_string()
}

fn default_strict() -> bool {
    true
}

/// Browser and WebDriver settings
#[derive(Debug, Deserialize, Clone)]
pub struct BrowserConfig {
    /// Run the browser without a visible window
    #[serde(default)]
    pub headless: bool,

    /// Connect to an already running WebDriver server instead of spawning one
    #[serde(default)]
    pub webdriver_url: Option<String>,

    /// WebDriver binary to spawn (looked up on PATH when not absolute)
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Additional arguments passed to the spawned WebDriver binary
    #[serde(default)]
    pub driver_args: Vec<String>,

    /// `browserName` capability requested from the driver
    #[serde(default = "default_browser_name")]
    pub browser_name: String,

    /// Initial window size
    #[serde(default = "default_window_width")]
    pub window_width: u32,

    #[serde(default = "default_window_height")]
    pub window_height: u32,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            headless: false,
            webdriver_url: None,
            driver: default_driver(),
            driver_args: Vec::new(),
            browser_name: default_browser_name(),
            window_width: default_window_width(),
            window_height: default_window_height(),
        }
    }
}

fn default_driver() -> String {
    "chromedriver".to_string()
}
fn default_browser_name() -> String {
    "chrome".to_string()
}
fn default_window_width() -> u32 {
    1280
}
fn default_window_height() -> u32 {
    720
}

/// Timeout settings in milliseconds
#[derive(Debug, Deserialize)]
pub struct Timeouts {
    /// Ceiling for navigation settle and element resolution
    #[serde(default = "default_step")]
    pub default_ms: u64,

    /// Ceiling for the WebDriver server to report ready
    #[serde(default = "default_launch")]
    pub launch_ms: u64,

    /// Quiet window with no new network activity that counts as idle
    #[serde(default = "default_idle_quiet")]
    pub idle_quiet_ms: u64,

    /// Interval between presence and idle polls
    #[serde(default = "default_poll_interval")]
    pub poll_interval_ms: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            default_ms: default_step(),
            launch_ms: default_launch(),
            idle_quiet_ms: default_idle_quiet(),
            poll_interval_ms: default_poll_interval(),
        }
    }
}

fn default_step() -> u64 {
    10_000
}
fn default_launch() -> u64 {
    10_000
}
fn default_idle_quiet() -> u64 {
    500
}
fn default_poll_interval() -> u64 {
    100
}

/// Artifact output settings
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Directory screenshots are written to
    #[serde(default = "default_screenshot_dir")]
    pub screenshot_dir: PathBuf,

    /// Write a JSON run report to this path
    #[serde(default)]
    pub report: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            screenshot_dir: default_screenshot_dir(),
            report: None,
        }
    }
}

fn default_screenshot_dir() -> PathBuf {
    PathBuf::from(".").join(DEFAULT_SCREENSHOT_DIR)
}

/// Values supplied on the command line or through the environment
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub headless: Option<bool>,
    pub screenshot_dir: Option<PathBuf>,
    pub timeout_ms: Option<u64>,
    pub webdriver_url: Option<String>,
    pub report: Option<PathBuf>,
}

impl Config {
    /// Load configuration from the default config file
    ///
    /// Returns default configuration if file doesn't exist
    pub fn load() -> Result<Self> {
        match config_path() {
            Some(path) if path.exists() => Self::load_from(&path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an explicit file
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| super::Error::FileRead {
            path: path.display().to_string(),
            error: e.to_string(),
        })?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| super::Error::ConfigParse(e.to_string()))
    }

    /// Apply command-line and environment overrides on top of file values
    pub fn apply(&mut self, overrides: Overrides) {
        if let Some(base_url) = overrides.base_url {
            self.target.base_url = base_url;
        }
        if let Some(headless) = overrides.headless {
            self.browser.headless = headless;
        }
        if let Some(dir) = overrides.screenshot_dir {
            self.output.screenshot_dir = dir;
        }
        if let Some(ms) = overrides.timeout_ms {
            self.timeouts.default_ms = ms;
        }
        if let Some(url) = overrides.webdriver_url {
            self.browser.webdriver_url = Some(url);
        }
        if let Some(report) = overrides.report {
            self.output.report = Some(report);
        }
    }

    /// Settings the runner needs for one walkthrough
    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            headless: self.browser.headless,
            base_url: self.target.base_url.clone(),
            screenshot_dir: self.output.screenshot_dir.clone(),
            default_timeout_ms: self.timeouts.default_ms,
            idle_quiet_ms: self.timeouts.idle_quiet_ms,
            poll_interval_ms: self.timeouts.poll_interval_ms,
            strict: self.target.strict,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_documented_values() {
        let config = Config::default();
        assert_eq!(config.target.base_url, "http://localhost:5174/");
        assert!(!config.browser.headless);
        assert_eq!(
            config.output.screenshot_dir,
            PathBuf::from("./test_screenshots")
        );
        assert!(config.target.strict);
    }

    #[test]
    fn test_partial_file_keeps_defaults() {
        let config = Config::parse(
            r#"
[browser]
headless = true
webdriver_url = "http://127.0.0.1:4444"

[timeouts]
default_ms = 2500
"#,
        )
        .unwrap();

        assert!(config.browser.headless);
        assert_eq!(config.browser.webdriver_url.as_deref(), Some("http://127.0.0.1:4444"));
        assert_eq!(config.browser.driver, "chromedriver");
        assert_eq!(config.timeouts.default_ms, 2500);
        assert_eq!(config.timeouts.idle_quiet_ms, 500);
    }

    #[test]
    fn test_overrides_win_over_file() {
        let mut config = Config::parse("[target]\nbase_url = \"http://a/\"\n").unwrap();
        config.apply(Overrides {
            base_url: Some("http://b/".to_string()),
            headless: Some(true),
            timeout_ms: Some(42),
            ..Default::default()
        });

        let runner = config.runner_config();
        assert_eq!(runner.base_url, "http://b/");
        assert!(runner.headless);
        assert_eq!(runner.default_timeout_ms, 42);
    }

    #[test]
    fn test_invalid_toml_is_config_parse_error() {
        let err = Config::parse("[timeouts\n").unwrap_err();
        assert!(matches!(err, crate::Error::ConfigParse(_)));
    }
}
