//! Service configuration
//!
//! ```yaml
//! ingest_interval_secs: 10
//! monitor_poll_interval_secs: 300
//! monitor_retry_interval_secs: 60
//! pre_roll_minutes: 30
//! max_duration_minutes: 720
//! fetch_timeout_secs: 10
//! export_dir: race_exports
//! schedule_file: schedule.yaml
//! browser_binary: chromium
//! ```
//!
//! Every key is optional. The binary layers CLI flags and environment
//! variables on top of the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::export::DEFAULT_EXPORT_DIR;
use crate::monitor::MonitorSettings;
use crate::sources::{DEFAULT_BROWSER_BINARY, DEFAULT_USER_AGENT, SourceSettings};
use crate::types::LivenessWindow;
use crate::{Result, TrackerError};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrackerConfig {
    /// Seconds between snapshot fetches
    pub ingest_interval_secs: u64,
    /// Seconds between schedule polls
    pub monitor_poll_interval_secs: u64,
    /// Seconds before retrying a failed schedule poll
    pub monitor_retry_interval_secs: u64,
    /// Minutes before the scheduled start a race counts as live
    pub pre_roll_minutes: i64,
    /// Minutes after the scheduled start a race is assumed over
    pub max_duration_minutes: i64,
    /// Seconds one fetch may take
    pub fetch_timeout_secs: u64,
    pub export_dir: PathBuf,
    /// YAML schedule; the built-in calendar is used when absent
    pub schedule_file: Option<PathBuf>,
    pub user_agent: String,
    pub browser_binary: String,
    pub browser_args: Vec<String>,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            ingest_interval_secs: 10,
            monitor_poll_interval_secs: 300,
            monitor_retry_interval_secs: 60,
            pre_roll_minutes: LivenessWindow::DEFAULT_PRE_ROLL_MINUTES,
            max_duration_minutes: LivenessWindow::DEFAULT_MAX_DURATION_MINUTES,
            fetch_timeout_secs: 10,
            export_dir: PathBuf::from(DEFAULT_EXPORT_DIR),
            schedule_file: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_binary: DEFAULT_BROWSER_BINARY.to_string(),
            browser_args: Vec::new(),
        }
    }
}

impl TrackerConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml_ng::from_str(yaml)?;
        Ok(config)
    }

    /// Read a YAML config file.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let yaml = tokio::fs::read_to_string(path).await.map_err(|e| {
            TrackerError::config(format!("cannot read config {}: {e}", path.display()))
        })?;
        debug!(path = %path.display(), "Loaded configuration file");
        Self::from_yaml_str(&yaml)
    }

    /// Reject values the service cannot run with.
    pub fn validate(&self) -> Result<()> {
        let positive = [
            ("ingest_interval_secs", self.ingest_interval_secs),
            ("monitor_poll_interval_secs", self.monitor_poll_interval_secs),
            ("monitor_retry_interval_secs", self.monitor_retry_interval_secs),
            ("fetch_timeout_secs", self.fetch_timeout_secs),
        ];
        for (name, value) in positive {
            if value == 0 {
                return Err(TrackerError::config(format!("{name} must be greater than zero")));
            }
        }
        if self.browser_binary.trim().is_empty() {
            return Err(TrackerError::config("browser_binary must not be empty"));
        }
        self.liveness_window().map(|_| ())
    }

    pub fn liveness_window(&self) -> Result<LivenessWindow> {
        LivenessWindow::from_minutes(self.pre_roll_minutes, self.max_duration_minutes)
    }

    pub fn monitor_settings(&self) -> Result<MonitorSettings> {
        Ok(MonitorSettings {
            poll_interval: Duration::from_secs(self.monitor_poll_interval_secs),
            retry_interval: Duration::from_secs(self.monitor_retry_interval_secs),
            ingest_interval: Duration::from_secs(self.ingest_interval_secs),
            window: self.liveness_window()?,
        })
    }

    pub fn source_settings(&self) -> SourceSettings {
        SourceSettings {
            fetch_timeout: Duration::from_secs(self.fetch_timeout_secs),
            user_agent: self.user_agent.clone(),
            browser_binary: self.browser_binary.clone(),
            browser_args: self.browser_args.clone(),
        }
    }
}
