//! Error types for the walkthrough runner
//!
//! Messages name the step, selector or condition involved so a failing run
//! can be diagnosed from the console line alone.

use std::io;
use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the walkthrough runner
#[derive(Error, Debug)]
pub enum Error {
    // === Browser Launch Errors ===
    #[error("Browser failed to start: {0}")]
    Launch(String),

    #[error("WebDriver '{name}' not found. Install it or set webdriver_url. Searched: {searched}")]
    DriverNotFound { name: String, searched: String },

    // === Wait Errors ===
    #[error("Timed out after {elapsed_ms}ms waiting for {condition}")]
    Timeout { condition: String, elapsed_ms: u64 },

    // === Selector Errors ===
    #[error("No element matches '{selector}' after {elapsed_ms}ms")]
    ElementNotFound { selector: String, elapsed_ms: u64 },

    #[error("Selector '{selector}' matches {count} elements, expected exactly one")]
    AmbiguousMatch { selector: String, count: usize },

    #[error("Invalid selector '{selector}': {reason}")]
    InvalidSelector { selector: String, reason: String },

    // === Assertion Errors ===
    #[error("Assertion on {subject} failed: expected {expected:?}, got {actual:?}")]
    AssertionMismatch {
        subject: String,
        expected: String,
        actual: String,
    },

    // === Artifact Errors ===
    #[error("Failed to write screenshot '{path}': {error}")]
    ScreenshotWrite { path: String, error: String },

    // === WebDriver Protocol Errors ===
    #[error("WebDriver command '{command}' failed: {message}")]
    WebDriver { command: String, message: String },

    #[error("WebDriver protocol error: {0}")]
    WebDriverProtocol(String),

    #[error("No browser session is open")]
    SessionClosed,

    // === Configuration Errors ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid configuration file: {0}")]
    ConfigParse(String),

    #[error("Invalid walkthrough file '{path}': {error}")]
    WalkthroughParse { path: String, error: String },

    // === IO Errors ===
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to read file '{path}': {error}")]
    FileRead { path: String, error: String },

    // === Serialization Errors ===
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    // === Transport Errors ===
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl Error {
    /// Create a driver not found error with search paths
    pub fn driver_not_found<S: AsRef<str>>(name: &str, paths: &[S]) -> Self {
        Self::DriverNotFound {
            name: name.to_string(),
            searched: paths.iter().map(|s| s.as_ref()).collect::<Vec<_>>().join(", "),
        }
    }

    /// Create a WebDriver command failed error
    pub fn webdriver(command: &str, message: &str) -> Self {
        Self::WebDriver {
            command: command.to_string(),
            message: message.to_string(),
        }
    }

    /// Create a timeout error for a named condition
    pub fn timeout(condition: impl Into<String>, elapsed_ms: u64) -> Self {
        Self::Timeout {
            condition: condition.into(),
            elapsed_ms,
        }
    }

    /// Create an assertion mismatch error
    pub fn mismatch(subject: &str, expected: &str, actual: &str) -> Self {
        Self::AssertionMismatch {
            subject: subject.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether this error aborts the run when raised by a step
    ///
    /// Screenshot write failures are recorded as warnings instead.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::ScreenshotWrite { .. })
    }
}
