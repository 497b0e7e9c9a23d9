//! UI walkthrough runner
//!
//! This library executes declarative UI walkthroughs against a browser
//! driven through the W3C WebDriver protocol.

pub mod browser;
pub mod cli;
pub mod commands;
pub mod common;
pub mod walkthrough;
pub mod webdriver;

// Re-export commonly used types for tests
pub use browser::{Browser, ElementRef, LoadState, Selector};
pub use common::{Error, Result};
pub use walkthrough::{RunReport, RunState, Runner, RunnerConfig, Step, StepResult, Walkthrough};
