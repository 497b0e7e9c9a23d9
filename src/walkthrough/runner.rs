//! Walkthrough runner implementation
//!
//! Executes steps strictly in sequence against one browser page. An absent
//! optional element skips its branch; any other failure aborts the run.
//! The browser is closed exactly once whichever way the run ends.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::browser::{Browser, ElementRef, LoadState, Selector};
use crate::common::{normalize_text, paths, Error, Result};

use super::config::{MatchMode, Step, Subject};
use super::report::{Progress, Silent};

/// Reason recorded when an optional element never appears
pub const NOT_PRESENT: &str = "not present";

/// Settings for one run
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Whether the browser window is hidden; applied by the backend, logged here
    pub headless: bool,
    /// Base URL relative navigation targets are resolved against
    pub base_url: String,
    /// Directory screenshots are written to
    pub screenshot_dir: PathBuf,
    /// Ceiling for settle waits, element resolution and browser calls
    pub default_timeout_ms: u64,
    /// Network quiet window that counts as idle
    pub idle_quiet_ms: u64,
    /// Interval between polls
    pub poll_interval_ms: u64,
    /// Fail when a selector matches more than one element
    pub strict: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            headless: false,
            base_url: "http://localhost:5174/".to_string(),
            screenshot_dir: PathBuf::from(".").join(paths::DEFAULT_SCREENSHOT_DIR),
            default_timeout_ms: 10_000,
            idle_quiet_ms: 500,
            poll_interval_ms: 100,
            strict: true,
        }
    }
}

/// Lifecycle of a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunState {
    NotStarted,
    Running,
    Completed,
    Aborted,
}

/// Classification of a failed step
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Timeout,
    ElementNotFound,
    AmbiguousMatch,
    AssertionMismatch,
    /// Browser or protocol failure outside the categories above
    Driver,
}

impl FailureKind {
    pub fn of(error: &Error) -> Self {
        match error {
            Error::Timeout { .. } => FailureKind::Timeout,
            Error::ElementNotFound { .. } => FailureKind::ElementNotFound,
            Error::AmbiguousMatch { .. } => FailureKind::AmbiguousMatch,
            Error::AssertionMismatch { .. } => FailureKind::AssertionMismatch,
            _ => FailureKind::Driver,
        }
    }
}

/// Outcome of one step
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum StepResult {
    Ok,
    Skipped { reason: String },
    Failed { kind: FailureKind, message: String },
}

impl StepResult {
    pub fn failed(error: &Error) -> Self {
        StepResult::Failed {
            kind: FailureKind::of(error),
            message: error.to_string(),
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, StepResult::Failed { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, StepResult::Skipped { .. })
    }
}

/// Log entry for one executed step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// 1-based position within its sequence
    pub index: usize,
    pub step: String,
    pub result: StepResult,
    pub elapsed_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub artifact: Option<PathBuf>,
    /// Non-fatal problem, e.g. a screenshot that could not be written
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
    /// Records of steps nested under an optional branch
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StepRecord>,
}

impl StepRecord {
    fn new(index: usize, step: &Step) -> Self {
        Self {
            index,
            step: step.describe(),
            result: StepResult::Ok,
            elapsed_ms: 0,
            artifact: None,
            warning: None,
            children: Vec::new(),
        }
    }
}

/// Result of a whole run
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub state: RunState,
    /// Number of top-level steps in the walkthrough
    pub steps_total: usize,
    /// One record per executed top-level step, in order
    pub results: Vec<StepRecord>,
    pub final_url: Option<String>,
    pub title: Option<String>,
    pub screenshot_dir: PathBuf,
    pub elapsed_ms: u64,
    /// Error raised while closing the browser, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub close_error: Option<String>,
}

impl RunReport {
    pub fn passed(&self) -> bool {
        self.state == RunState::Completed
    }

    /// Process exit code for this run
    pub fn exit_code(&self) -> i32 {
        if self.passed() {
            0
        } else {
            2
        }
    }

    /// The first failed top-level record
    pub fn failure(&self) -> Option<&StepRecord> {
        self.results.iter().find(|r| r.result.is_failed())
    }

    /// Top-level outcomes in step order
    pub fn outcomes(&self) -> Vec<&StepResult> {
        self.results.iter().map(|r| &r.result).collect()
    }

    /// Every screenshot written during the run, including nested steps
    pub fn artifacts(&self) -> Vec<&PathBuf> {
        fn collect<'a>(records: &'a [StepRecord], out: &mut Vec<&'a PathBuf>) {
            for r in records {
                if let Some(path) = &r.artifact {
                    out.push(path);
                }
                collect(&r.children, out);
            }
        }
        let mut out = Vec::new();
        collect(&self.results, &mut out);
        out
    }
}

/// Run a step sequence against a browser with console output disabled
pub async fn run<B: Browser>(browser: B, steps: &[Step], config: RunnerConfig) -> RunReport {
    Runner::new(browser, config).run(steps).await
}

/// Exclusive owner of the browser page for the duration of a run
pub struct RunContext<B: Browser> {
    browser: B,
    config: RunnerConfig,
    state: RunState,
}

/// Walkthrough runner
pub struct Runner<B: Browser> {
    ctx: RunContext<B>,
    progress: Box<dyn Progress>,
}

impl<B: Browser> Runner<B> {
    pub fn new(browser: B, config: RunnerConfig) -> Self {
        Self {
            ctx: RunContext {
                browser,
                config,
                state: RunState::NotStarted,
            },
            progress: Box::new(Silent),
        }
    }

    /// Report step transitions to the given sink
    pub fn with_progress(mut self, progress: impl Progress + 'static) -> Self {
        self.progress = Box::new(progress);
        self
    }

    /// Execute the steps, then close the browser
    pub async fn run(mut self, steps: &[Step]) -> RunReport {
        let start = Instant::now();
        self.ctx.state = RunState::Running;
        tracing::info!(
            steps = steps.len(),
            base_url = %self.ctx.config.base_url,
            headless = self.ctx.config.headless,
            "Walkthrough started"
        );

        let results = self.execute_steps(steps, 0).await;
        let aborted = results.last().is_some_and(|r| r.result.is_failed());
        self.ctx.state = if aborted {
            RunState::Aborted
        } else {
            RunState::Completed
        };

        let final_url = self.ctx.bounded("current url", |b| b.current_url()).await.ok();
        let title = self.ctx.bounded("page title", |b| b.title()).await.ok();

        let close_error = match self.ctx.bounded("browser close", |b| b.close()).await {
            Ok(()) => None,
            Err(e) => {
                tracing::warn!("Failed to close browser: {}", e);
                Some(e.to_string())
            }
        };

        tracing::info!(state = ?self.ctx.state, executed = results.len(), "Walkthrough finished");

        RunReport {
            state: self.ctx.state,
            steps_total: steps.len(),
            results,
            final_url,
            title,
            screenshot_dir: self.ctx.config.screenshot_dir.clone(),
            elapsed_ms: start.elapsed().as_millis() as u64,
            close_error,
        }
    }

    /// Execute a sequence, stopping after the first failure
    fn execute_steps<'a>(
        &'a mut self,
        steps: &'a [Step],
        depth: usize,
    ) -> Pin<Box<dyn Future<Output = Vec<StepRecord>> + Send + 'a>> {
        Box::pin(async move {
            let mut records = Vec::with_capacity(steps.len());

            for (i, step) in steps.iter().enumerate() {
                let mut record = StepRecord::new(i + 1, step);
                self.progress.started(depth, record.index, &record.step);

                let start = Instant::now();
                record.result = match self.execute_step(step, depth, &mut record).await {
                    Ok(result) => result,
                    Err(e) => StepResult::failed(&e),
                };
                record.elapsed_ms = start.elapsed().as_millis() as u64;

                self.progress.finished(depth, &record);
                let failed = record.result.is_failed();
                records.push(record);
                if failed {
                    break;
                }
            }

            records
        })
    }

    async fn execute_step(
        &mut self,
        step: &Step,
        depth: usize,
        record: &mut StepRecord,
    ) -> Result<StepResult> {
        let default_timeout = self.ctx.config.default_timeout_ms;

        match step {
            Step::Navigate { url } => {
                let target = self.ctx.resolve_url(url)?;
                let deadline = Instant::now() + Duration::from_millis(default_timeout);
                tracing::debug!("Navigating to {}", target);
                self.ctx.bounded_until(deadline, "navigation", |b| b.goto(&target)).await?;
                self.ctx.wait_for_idle(deadline).await?;
                Ok(StepResult::Ok)
            }

            Step::WaitForIdle => {
                let deadline = Instant::now() + Duration::from_millis(default_timeout);
                self.ctx.wait_for_idle(deadline).await?;
                Ok(StepResult::Ok)
            }

            Step::WaitForOptional {
                selector,
                timeout_ms,
                steps,
            } => {
                let sel = Selector::parse(selector)?;
                if self.ctx.poll_presence(&sel, *timeout_ms).await?.is_none() {
                    tracing::debug!("Optional element {} not present", sel);
                    return Ok(StepResult::Skipped {
                        reason: NOT_PRESENT.to_string(),
                    });
                }

                record.children = self.execute_steps(steps, depth + 1).await;
                let failed = record.children.last().and_then(|child| match &child.result {
                    StepResult::Failed { kind, message } => Some(StepResult::Failed {
                        kind: *kind,
                        message: format!("step {}.{}: {}", record.index, child.index, message),
                    }),
                    _ => None,
                });
                Ok(failed.unwrap_or(StepResult::Ok))
            }

            Step::Check {
                selector,
                timeout_ms,
            } => {
                let el = self.ctx.resolve_one(selector, *timeout_ms).await?;
                if !self.ctx.bounded("checked state", |b| b.is_checked(&el)).await? {
                    self.ctx.bounded("click", |b| b.click(&el)).await?;
                    if !self.ctx.bounded("checked state", |b| b.is_checked(&el)).await? {
                        return Err(Error::mismatch(
                            &format!("checked state of {}", selector),
                            "true",
                            "false",
                        ));
                    }
                }
                Ok(StepResult::Ok)
            }

            Step::Click {
                selector,
                timeout_ms,
            } => {
                let el = self.ctx.resolve_one(selector, *timeout_ms).await?;
                self.ctx.bounded("click", |b| b.click(&el)).await?;
                Ok(StepResult::Ok)
            }

            Step::Fill {
                selector,
                value,
                timeout_ms,
            } => {
                let el = self.ctx.resolve_one(selector, *timeout_ms).await?;
                self.ctx.bounded("fill", |b| b.fill(&el, value)).await?;
                Ok(StepResult::Ok)
            }

            Step::SelectOption {
                selector,
                value,
                timeout_ms,
            } => {
                let el = self.ctx.resolve_one(selector, *timeout_ms).await?;
                self.ctx
                    .bounded("select option", |b| b.select_option(&el, value))
                    .await?;
                Ok(StepResult::Ok)
            }

            Step::Screenshot { label } => {
                match self.ctx.capture(label).await {
                    Ok(path) => record.artifact = Some(path),
                    Err(e) if e.is_fatal() => return Err(e),
                    Err(e) => {
                        tracing::warn!("Screenshot '{}' not saved: {}", label, e);
                        record.warning = Some(e.to_string());
                    }
                }
                Ok(StepResult::Ok)
            }

            Step::Assert {
                subject,
                expected,
                mode,
            } => {
                let actual = self.ctx.observe(subject).await?;
                let expected = match (subject, mode) {
                    (Subject::Url, MatchMode::Exact) => self.ctx.resolve_url(expected)?,
                    _ => expected.clone(),
                };
                let (a, e) = (normalize_text(&actual), normalize_text(&expected));
                let ok = match mode {
                    MatchMode::Exact => a == e,
                    MatchMode::Contains => a.contains(&e),
                };
                if !ok {
                    return Err(Error::mismatch(&subject.describe(), &expected, &actual));
                }
                Ok(StepResult::Ok)
            }
        }
    }
}

impl<B: Browser> RunContext<B> {
    fn resolve_url(&self, url: &str) -> Result<String> {
        let base = reqwest::Url::parse(&self.config.base_url).map_err(|e| {
            Error::Config(format!("Invalid base URL '{}': {}", self.config.base_url, e))
        })?;
        let resolved = base
            .join(url)
            .map_err(|e| Error::Config(format!("Invalid URL '{}': {}", url, e)))?;
        Ok(resolved.to_string())
    }

    /// Run one browser call under the default timeout
    async fn bounded<'b, T, F, Fut>(&'b mut self, what: &str, f: F) -> Result<T>
    where
        F: FnOnce(&'b mut B) -> Fut,
        Fut: Future<Output = Result<T>> + 'b,
    {
        let deadline = Instant::now() + Duration::from_millis(self.config.default_timeout_ms);
        self.bounded_until(deadline, what, f).await
    }

    /// Run one browser call that must finish before `deadline`
    async fn bounded_until<'b, T, F, Fut>(
        &'b mut self,
        deadline: Instant,
        what: &str,
        f: F,
    ) -> Result<T>
    where
        F: FnOnce(&'b mut B) -> Fut,
        Fut: Future<Output = Result<T>> + 'b,
    {
        let start = Instant::now();
        let remaining = deadline.saturating_duration_since(start);
        match tokio::time::timeout(remaining, f(&mut self.browser)).await {
            Ok(result) => result,
            Err(_) => Err(Error::timeout(what, start.elapsed().as_millis() as u64)),
        }
    }

    /// Block until the document is complete and no new resources start
    /// for the quiet window
    async fn wait_for_idle(&mut self, deadline: Instant) -> Result<()> {
        let start = Instant::now();
        let quiet = Duration::from_millis(self.config.idle_quiet_ms);
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));
        let mut last: Option<LoadState> = None;
        let mut quiet_since = Instant::now();

        loop {
            let state = self
                .bounded_until(deadline, "network idle", |b| b.load_state())
                .await?;

            match last {
                Some(prev) if state.complete && prev.resources == state.resources => {
                    if quiet_since.elapsed() >= quiet {
                        tracing::debug!(
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            resources = state.resources,
                            "Network idle"
                        );
                        return Ok(());
                    }
                }
                _ => quiet_since = Instant::now(),
            }
            last = Some(state);

            let now = Instant::now();
            if now >= deadline {
                return Err(Error::timeout(
                    "network idle",
                    start.elapsed().as_millis() as u64,
                ));
            }
            tokio::time::sleep(poll.min(deadline - now)).await;
        }
    }

    /// Poll for matches until any appear or the timeout elapses
    ///
    /// Returns `None` when nothing matched in time. A lookup still pending
    /// at the deadline counts as nothing matched.
    async fn poll_presence(
        &mut self,
        selector: &Selector,
        timeout_ms: u64,
    ) -> Result<Option<Vec<ElementRef>>> {
        let start = Instant::now();
        let timeout = Duration::from_millis(timeout_ms);
        let deadline = start + timeout;
        let poll = Duration::from_millis(self.config.poll_interval_ms.max(1));

        loop {
            let found = match self
                .bounded_until(deadline, "element lookup", |b| b.find_all(selector))
                .await
            {
                Ok(found) => found,
                Err(Error::Timeout { .. }) => {
                    tracing::debug!("Lookup of {} still pending at deadline", selector);
                    return Ok(None);
                }
                Err(e) => return Err(e),
            };
            if !found.is_empty() {
                return Ok(Some(found));
            }

            let elapsed = start.elapsed();
            if elapsed >= timeout {
                return Ok(None);
            }
            tokio::time::sleep(poll.min(timeout - elapsed)).await;
        }
    }

    /// Locate exactly one element for an action step
    async fn resolve_one(&mut self, raw: &str, timeout_ms: Option<u64>) -> Result<ElementRef> {
        let selector = Selector::parse(raw)?;
        let timeout_ms = timeout_ms.unwrap_or(self.config.default_timeout_ms);
        let start = Instant::now();

        let mut found = self
            .poll_presence(&selector, timeout_ms)
            .await?
            .ok_or_else(|| Error::ElementNotFound {
                selector: raw.to_string(),
                elapsed_ms: start.elapsed().as_millis() as u64,
            })?;

        if self.config.strict && found.len() > 1 {
            return Err(Error::AmbiguousMatch {
                selector: raw.to_string(),
                count: found.len(),
            });
        }
        Ok(found.swap_remove(0))
    }

    /// Capture the viewport and write it under the screenshot directory
    async fn capture(&mut self, label: &str) -> Result<PathBuf> {
        let path = paths::screenshot_path(&self.config.screenshot_dir, label);
        let write_error = |e: &dyn std::fmt::Display| Error::ScreenshotWrite {
            path: path.display().to_string(),
            error: e.to_string(),
        };

        let png = self
            .bounded("screenshot", |b| b.screenshot())
            .await
            .map_err(|e| write_error(&e))?;
        paths::ensure_screenshot_dir(&self.config.screenshot_dir).map_err(|e| write_error(&e))?;
        std::fs::write(&path, png).map_err(|e| write_error(&e))?;

        tracing::debug!("Screenshot saved: {}", path.display());
        Ok(path)
    }

    async fn observe(&mut self, subject: &Subject) -> Result<String> {
        match subject {
            Subject::Url => self.bounded("current url", |b| b.current_url()).await,
            Subject::Title => self.bounded("page title", |b| b.title()).await,
            Subject::Text(selector) => {
                let el = self.resolve_one(selector, None).await?;
                self.bounded("element text", |b| b.text(&el)).await
            }
        }
    }
}
