//! Progress output and run reports

use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;

use crate::common::Result;

use super::runner::{RunReport, RunState, StepRecord, StepResult};

/// Receives step transitions as the runner executes them
pub trait Progress: Send {
    fn started(&mut self, _depth: usize, _index: usize, _step: &str) {}

    fn finished(&mut self, _depth: usize, _record: &StepRecord) {}
}

/// Discards all progress
pub struct Silent;

impl Progress for Silent {}

/// Writes one line per step transition, to stdout unless told otherwise
pub struct Console<W: Write + Send = io::Stdout> {
    verbose: bool,
    out: W,
}

impl Console {
    pub fn stdout(verbose: bool) -> Self {
        Self::new(verbose, io::stdout())
    }
}

impl<W: Write + Send> Console<W> {
    pub fn new(verbose: bool, out: W) -> Self {
        Self { verbose, out }
    }

    fn indent(depth: usize) -> String {
        "  ".repeat(depth + 1)
    }
}

// Write errors are ignored
impl<W: Write + Send> Progress for Console<W> {
    fn started(&mut self, depth: usize, index: usize, step: &str) {
        let _ = writeln!(
            self.out,
            "{}{} Step {}: {}",
            Self::indent(depth),
            "→".blue(),
            index,
            step.dimmed()
        );
    }

    fn finished(&mut self, depth: usize, record: &StepRecord) {
        let indent = Self::indent(depth);
        let elapsed = format!("({}ms)", record.elapsed_ms);
        let _ = match &record.result {
            StepResult::Ok => writeln!(
                self.out,
                "{}{} Step {}: {} {}",
                indent,
                "✓".green(),
                record.index,
                record.step,
                elapsed.dimmed()
            ),
            StepResult::Skipped { reason } => writeln!(
                self.out,
                "{}{} Step {}: {} {}",
                indent,
                "↷".yellow(),
                record.index,
                record.step,
                format!("skipped: {}", reason).dimmed()
            ),
            StepResult::Failed { message, .. } => writeln!(
                self.out,
                "{}{} Step {}: {} {}\n{}  {}",
                indent,
                "✗".red(),
                record.index,
                record.step,
                elapsed.dimmed(),
                indent,
                message.red()
            ),
        };
        if let Some(path) = &record.artifact {
            if self.verbose {
                let _ = writeln!(
                    self.out,
                    "{}  saved {}",
                    indent,
                    path.display().to_string().dimmed()
                );
            }
        }
        if let Some(warning) = &record.warning {
            let _ = writeln!(self.out, "{}  {} {}", indent, "warning:".yellow(), warning);
        }
    }
}

/// Print the closing summary of a run
pub fn print_summary(name: &str, report: &RunReport) {
    println!();
    if let Some(url) = &report.final_url {
        println!("Current URL: {}", url);
    }
    if let Some(title) = &report.title {
        println!("Page title: {}", title);
    }

    let skipped = report.results.iter().filter(|r| r.result.is_skipped()).count();
    let shots = report.artifacts().len();

    match report.state {
        RunState::Completed => println!(
            "\n{} {} ({} steps, {} skipped, {}ms)",
            "✓".green().bold(),
            format!("Walkthrough '{}' completed", name).green().bold(),
            report.results.len(),
            skipped,
            report.elapsed_ms
        ),
        _ => {
            let at = report
                .failure()
                .map(|r| format!("step {} of {}", r.index, report.steps_total))
                .unwrap_or_else(|| "unknown step".to_string());
            println!(
                "\n{} {}",
                "✗".red().bold(),
                format!("Walkthrough '{}' aborted at {}", name, at).red().bold()
            );
        }
    }

    println!(
        "{} screenshot(s) in: {}",
        shots,
        report.screenshot_dir.display()
    );
    if let Some(err) = &report.close_error {
        println!("{} browser did not close cleanly: {}", "warning:".yellow(), err);
    }
}

/// Write the report as pretty JSON
pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(report)?;
    std::fs::write(path, json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::walkthrough::runner::FailureKind;
    use std::path::PathBuf;

    fn report() -> RunReport {
        RunReport {
            state: RunState::Aborted,
            steps_total: 3,
            results: vec![
                StepRecord {
                    index: 1,
                    step: "navigate /".to_string(),
                    result: StepResult::Ok,
                    elapsed_ms: 12,
                    artifact: None,
                    warning: None,
                    children: Vec::new(),
                },
                StepRecord {
                    index: 2,
                    step: "click text=开始探索".to_string(),
                    result: StepResult::Failed {
                        kind: FailureKind::ElementNotFound,
                        message: "No element matches 'text=开始探索' after 50ms".to_string(),
                    },
                    elapsed_ms: 50,
                    artifact: None,
                    warning: None,
                    children: Vec::new(),
                },
            ],
            final_url: Some("http://localhost:5174/".to_string()),
            title: None,
            screenshot_dir: PathBuf::from("shots"),
            elapsed_ms: 70,
            close_error: None,
        }
    }

    #[test]
    fn test_json_report_shape() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("out").join("report.json");
        write_json(&report(), &path).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["state"], "aborted");
        assert_eq!(value["steps_total"], 3);
        assert_eq!(value["results"][0]["result"]["outcome"], "ok");
        assert_eq!(value["results"][1]["result"]["kind"], "element_not_found");
        assert!(value["results"][0].get("children").is_none());
    }

    fn console_output(console: Console<Vec<u8>>) -> String {
        String::from_utf8(console.out).unwrap()
    }

    #[test]
    fn test_console_reports_every_transition() {
        let records = report().results;
        let mut console = Console::new(false, Vec::new());
        console.started(0, 1, "navigate /");
        console.finished(0, &records[0]);
        console.started(0, 2, "click text=开始探索");
        console.finished(0, &records[1]);

        let out = console_output(console);
        let lines: Vec<_> = out.lines().collect();
        assert_eq!(lines.len(), 5, "{}", out);
        assert!(lines[0].contains("Step 1") && lines[0].contains("navigate /"));
        assert!(lines[1].contains("12ms"));
        assert!(lines[2].contains("Step 2"));
        assert!(lines[4].contains("No element matches"));
    }

    #[test]
    fn test_console_shows_skip_reason_and_saved_path_when_verbose() {
        let skipped = StepRecord {
            index: 2,
            step: "optional #disclaimer (50ms)".to_string(),
            result: StepResult::Skipped {
                reason: "not present".to_string(),
            },
            elapsed_ms: 50,
            artifact: None,
            warning: None,
            children: Vec::new(),
        };
        let shot = StepRecord {
            index: 3,
            step: "screenshot 01_homepage".to_string(),
            artifact: Some(PathBuf::from("shots/01_homepage.png")),
            ..skipped.clone()
        };

        let mut quiet = Console::new(false, Vec::new());
        quiet.finished(0, &skipped);
        quiet.finished(0, &shot);
        let out = console_output(quiet);
        assert!(out.contains("skipped: not present"), "{}", out);
        assert!(!out.contains("saved"), "{}", out);

        let mut verbose = Console::new(true, Vec::new());
        verbose.finished(1, &shot);
        let out = console_output(verbose);
        assert!(out.contains("saved") && out.contains("shots/01_homepage.png"), "{}", out);
        assert!(out.starts_with("    "), "{:?}", out);
    }

    #[test]
    fn test_failure_lookup_and_exit_code() {
        let report = report();
        assert_eq!(report.failure().map(|r| r.index), Some(2));
        assert_ne!(report.exit_code(), 0);
    }
}
