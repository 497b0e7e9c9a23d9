//! Scripted UI walkthroughs
//!
//! Reads declarative step lists (YAML) and executes them against a
//! [`Browser`](crate::browser::Browser), tolerating dialogs that only
//! appear some of the time.

mod config;
pub mod report;
mod runner;

pub use config::*;
pub use runner::{
    run, FailureKind, RunContext, RunReport, RunState, Runner, RunnerConfig, StepRecord,
    StepResult, NOT_PRESENT,
};
