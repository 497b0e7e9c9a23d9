//! WebDriver server process management
//!
//! When no `webdriver_url` is configured, the driver binary is started on a
//! free local port and polled until it reports ready.

use std::net::TcpListener;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::{Child, Command};

use crate::common::config::BrowserConfig;
use crate::common::{Error, Result};

use super::types::{Response, Status};

/// Interval between readiness probes
const READY_POLL_MS: u64 = 50;

/// A spawned WebDriver server, killed when dropped
pub struct DriverProcess {
    child: Child,
    url: String,
}

impl DriverProcess {
    /// Start the configured driver and wait until it accepts sessions
    pub async fn spawn(config: &BrowserConfig, launch_timeout: Duration) -> Result<Self> {
        let path = resolve_driver(&config.driver)?;
        let port = free_port()?;

        tracing::debug!(driver = %path.display(), port, "Spawning WebDriver server");

        let child = Command::new(&path)
            .arg(format!("--port={}", port))
            .args(&config.driver_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::Launch(format!("Failed to start {}: {}", path.display(), e)))?;

        let mut process = Self {
            child,
            url: format!("http://127.0.0.1:{}/", port),
        };
        process.wait_ready(launch_timeout).await?;
        Ok(process)
    }

    /// Base URL of the server, with a trailing slash
    pub fn url(&self) -> &str {
        &self.url
    }

    async fn wait_ready(&mut self, launch_timeout: Duration) -> Result<()> {
        let http = reqwest::Client::new();
        let status_url = format!("{}status", self.url);
        let start = Instant::now();

        loop {
            if let Some(status) = self.child.try_wait()? {
                return Err(Error::Launch(format!(
                    "WebDriver exited during startup with {}",
                    status
                )));
            }

            if let Ok(resp) = http.get(&status_url).send().await {
                if let Ok(body) = resp.json::<Response<Status>>().await {
                    if body.value.ready {
                        tracing::debug!(
                            elapsed_ms = start.elapsed().as_millis() as u64,
                            "WebDriver ready"
                        );
                        return Ok(());
                    }
                    tracing::trace!("WebDriver not ready: {}", body.value.message);
                }
            }

            if start.elapsed() >= launch_timeout {
                return Err(Error::Launch(format!(
                    "WebDriver did not become ready within {}ms",
                    launch_timeout.as_millis()
                )));
            }
            tokio::time::sleep(Duration::from_millis(READY_POLL_MS)).await;
        }
    }

    /// Stop the server
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.child.kill().await {
            tracing::debug!("WebDriver already stopped: {}", e);
        }
    }
}

/// Find the driver binary, either as a path or on PATH
fn resolve_driver(name: &str) -> Result<PathBuf> {
    let candidate = Path::new(name);
    if candidate.components().count() > 1 {
        if candidate.exists() {
            return Ok(candidate.to_path_buf());
        }
        return Err(Error::driver_not_found(name, &[name]));
    }

    which::which(name).map_err(|_| {
        let searched: Vec<String> = std::env::var_os("PATH")
            .map(|p| {
                std::env::split_paths(&p)
                    .map(|d| d.display().to_string())
                    .collect()
            })
            .unwrap_or_default();
        Error::driver_not_found(name, &searched)
    })
}

/// Ask the OS for an unused local port
fn free_port() -> Result<u16> {
    let listener = TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
