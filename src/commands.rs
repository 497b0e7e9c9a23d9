//! CLI command definitions
//!
//! Defines the clap commands for the walkthrough CLI.

use clap::{Args, Subcommand};
use std::path::PathBuf;

use crate::common::config::Overrides;

#[derive(Subcommand)]
pub enum Commands {
    /// Run a walkthrough (the built-in onboarding flow when no file is given)
    Run {
        /// Path to a YAML walkthrough
        file: Option<PathBuf>,
    },

    /// Parse a walkthrough and list its steps without starting a browser
    Validate {
        /// Path to a YAML walkthrough
        file: PathBuf,
    },

    /// Print the built-in walkthrough as YAML
    Show,
}

/// Options accepted before or after any subcommand
#[derive(Args, Debug, Default)]
pub struct GlobalOpts {
    /// Base URL of the application under test
    #[arg(long, global = true, env = "WALKTHROUGH_BASE_URL")]
    pub base_url: Option<String>,

    /// Hide the browser window (`--headless`, `--headless=false`)
    #[arg(
        long,
        global = true,
        env = "WALKTHROUGH_HEADLESS",
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true",
        value_parser = clap::builder::BoolishValueParser::new()
    )]
    pub headless: Option<bool>,

    /// Directory screenshots are written to
    #[arg(long, global = true, env = "WALKTHROUGH_SCREENSHOT_DIR")]
    pub screenshot_dir: Option<PathBuf>,

    /// Default timeout for settle waits and element lookup, in milliseconds
    #[arg(long, global = true, env = "WALKTHROUGH_TIMEOUT_MS")]
    pub timeout_ms: Option<u64>,

    /// Use a running WebDriver server instead of spawning one
    #[arg(long, global = true, env = "WALKTHROUGH_WEBDRIVER_URL")]
    pub webdriver_url: Option<String>,

    /// Write a JSON run report to this file
    #[arg(long, global = true, env = "WALKTHROUGH_REPORT")]
    pub report: Option<PathBuf>,

    /// Configuration file (default: platform config dir)
    #[arg(long, global = true, env = "WALKTHROUGH_CONFIG")]
    pub config: Option<PathBuf>,

    /// Print step starts, saved files and debug logs
    #[arg(long, short, global = true)]
    pub verbose: bool,
}

impl GlobalOpts {
    pub fn overrides(&self) -> Overrides {
        Overrides {
            base_url: self.base_url.clone(),
            headless: self.headless,
            screenshot_dir: self.screenshot_dir.clone(),
            timeout_ms: self.timeout_ms,
            webdriver_url: self.webdriver_url.clone(),
            report: self.report.clone(),
        }
    }
}
