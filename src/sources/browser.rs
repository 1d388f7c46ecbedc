//! Headless browser timing source
//!
//! Some timing pages build their table with JavaScript, so a plain HTTP
//! fetch only sees an empty shell. This source asks a headless Chromium to
//! load the page, let scripts run, and dump the rendered DOM to stdout.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use tempfile::TempDir;
use tokio::process::Command;
use tracing::{debug, info, trace, warn};

use super::table::TableParser;
use crate::source::SnapshotSource;
use crate::types::{Series, Snapshot};
use crate::{Result, TrackerError};

/// Upper bound on script time granted to the page before the DOM is dumped.
const MAX_RENDER_BUDGET: Duration = Duration::from_secs(5);

/// Source that renders the timing page in a headless browser.
pub struct BrowserTimingSource {
    /// Timing page URL
    endpoint: String,

    /// Row and cell extraction for the rendered page
    parser: TableParser,

    /// Bound on one render
    timeout: Duration,

    /// User-Agent the browser announces
    user_agent: String,

    /// Browser executable
    binary: String,

    /// Arguments placed before the browser flags (wrappers, sandbox launchers)
    launcher_args: Vec<String>,

    /// Isolated browser profile, present while open
    profile: Option<TempDir>,
}

impl BrowserTimingSource {
    pub fn new(
        endpoint: impl Into<String>,
        parser: TableParser,
        timeout: Duration,
        user_agent: impl Into<String>,
        binary: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            parser,
            timeout,
            user_agent: user_agent.into(),
            binary: binary.into(),
            launcher_args: Vec::new(),
            profile: None,
        }
    }

    /// Arguments passed to the executable ahead of the browser flags.
    pub fn with_launcher_args(mut self, args: Vec<String>) -> Self {
        self.launcher_args = args;
        self
    }

    pub fn is_open(&self) -> bool {
        self.profile.is_some()
    }

    fn render_budget(&self) -> Duration {
        (self.timeout / 2).min(MAX_RENDER_BUDGET)
    }

    /// Browser flags for one render of the timing page.
    fn render_args(&self, profile: &Path) -> Vec<String> {
        vec![
            "--headless=new".to_string(),
            "--disable-gpu".to_string(),
            "--no-sandbox".to_string(),
            "--disable-dev-shm-usage".to_string(),
            format!("--user-data-dir={}", profile.display()),
            format!("--user-agent={}", self.user_agent),
            format!("--virtual-time-budget={}", self.render_budget().as_millis()),
            "--dump-dom".to_string(),
            self.endpoint.clone(),
        ]
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.binary);
        cmd.args(&self.launcher_args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    /// Check the executable starts at all.
    async fn probe(&self) -> Result<()> {
        let mut cmd = self.command();
        cmd.arg("--version");

        let output = tokio::time::timeout(self.timeout, cmd.output())
            .await
            .map_err(|_| TrackerError::Timeout { duration: self.timeout })?
            .map_err(|e| {
                TrackerError::browser(format!("cannot start {}", self.binary), Some(Box::new(e)))
            })?;

        if !output.status.success() {
            return Err(TrackerError::browser(
                format!("{} --version exited with {}", self.binary, output.status),
                None,
            ));
        }

        let version = String::from_utf8_lossy(&output.stdout);
        info!(binary = %self.binary, version = %version.trim(), "Headless browser available");
        Ok(())
    }
}

#[async_trait::async_trait]
impl SnapshotSource for BrowserTimingSource {
    async fn open(&mut self) -> Result<()> {
        if self.profile.is_some() {
            return Ok(());
        }

        self.probe().await?;

        let profile = tempfile::Builder::new().prefix("stintwatch-browser-").tempdir()?;
        debug!(profile = %profile.path().display(), "Created browser profile");
        self.profile = Some(profile);
        Ok(())
    }

    async fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        let profile = self
            .profile
            .as_ref()
            .ok_or_else(|| TrackerError::SourceNotOpen { kind: self.kind().to_string() })?;

        let mut cmd = self.command();
        cmd.args(self.render_args(profile.path()));

        let child = cmd.spawn().map_err(|e| {
            TrackerError::browser(format!("cannot start {}", self.binary), Some(Box::new(e)))
        })?;

        // Dropping the child on timeout kills the browser.
        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| TrackerError::Timeout { duration: self.timeout })??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(TrackerError::browser(
                format!("render exited with {}: {}", output.status, stderr.trim()),
                None,
            ));
        }

        let html = String::from_utf8_lossy(&output.stdout);
        trace!(bytes = html.len(), "Rendered timing page");

        let snapshot = self.parser.parse(&html)?;
        debug!(series = %snapshot.series, cars = snapshot.cars.len(), "Parsed rendered snapshot");
        Ok(snapshot)
    }

    async fn close(&mut self) {
        match self.profile.take() {
            Some(profile) => {
                if let Err(e) = profile.close() {
                    warn!(error = %e, "Failed to remove browser profile");
                }
                info!(series = %self.parser.series(), "Closed headless browser source");
            }
            None => debug!("Headless browser source already closed"),
        }
    }

    fn series(&self) -> Series {
        self.parser.series()
    }

    fn kind(&self) -> &'static str {
        "browser"
    }
}
