//! CLI command handling
//!
//! Loads configuration and walkthroughs, starts the browser and reports
//! the outcome. Returns the process exit code.

use std::path::Path;
use std::time::Duration;

use colored::Colorize;

use crate::commands::{Commands, GlobalOpts};
use crate::common::config::Config;
use crate::common::{paths, Result};
use crate::walkthrough::{report, Runner, Step, Walkthrough, BUILTIN_YAML};
use crate::webdriver::WebDriverClient;

/// Dispatch a CLI command
pub async fn dispatch(command: Option<Commands>, opts: &GlobalOpts) -> Result<i32> {
    match command.unwrap_or(Commands::Run { file: None }) {
        Commands::Run { file } => run(file.as_deref(), opts).await,

        Commands::Validate { file } => {
            let walkthrough = Walkthrough::from_file(&file)?;
            walkthrough.validate()?;
            println!(
                "{} {} ({} steps)",
                "✓".green(),
                walkthrough.name.bold(),
                walkthrough.step_count()
            );
            print_steps(&walkthrough.steps, 1);
            Ok(0)
        }

        Commands::Show => {
            print!("{}", BUILTIN_YAML);
            Ok(0)
        }
    }
}

async fn run(file: Option<&Path>, opts: &GlobalOpts) -> Result<i32> {
    let walkthrough = match file {
        Some(path) => Walkthrough::from_file(path)?,
        None => Walkthrough::builtin()?,
    };
    walkthrough.validate()?;

    let mut config = match &opts.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    config.apply(opts.overrides());
    let runner_config = config.runner_config();

    println!(
        "\n{} {}",
        "Running Walkthrough:".blue().bold(),
        walkthrough.name.white().bold()
    );
    if let Some(desc) = &walkthrough.description {
        println!("  {}", desc.dimmed());
    }
    println!("  Opening {}", runner_config.base_url);

    if let Err(e) = paths::ensure_screenshot_dir(&runner_config.screenshot_dir) {
        tracing::warn!(
            "Could not create screenshot directory {}: {}",
            runner_config.screenshot_dir.display(),
            e
        );
    }

    let browser = WebDriverClient::launch(
        &config.browser,
        config.timeouts.default_ms,
        Duration::from_millis(config.timeouts.launch_ms),
    )
    .await?;

    println!("\n{}", "Steps:".cyan());
    let report = Runner::new(browser, runner_config)
        .with_progress(report::Console::stdout(opts.verbose))
        .run(&walkthrough.steps)
        .await;

    report::print_summary(&walkthrough.name, &report);

    if let Some(path) = &config.output.report {
        match report::write_json(&report, path) {
            Ok(()) => println!("Report written to {}", path.display()),
            Err(e) => tracing::warn!("Failed to write report {}: {}", path.display(), e),
        }
    }

    Ok(report.exit_code())
}

fn print_steps(steps: &[Step], depth: usize) {
    for (i, step) in steps.iter().enumerate() {
        println!("{}{}. {}", "  ".repeat(depth), i + 1, step.describe());
        if let Step::WaitForOptional { steps, .. } = step {
            print_steps(steps, depth + 1);
        }
    }
}
