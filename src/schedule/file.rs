//! YAML schedule files
//!
//! ```yaml
//! events:
//!   - name: 24 Hours of Le Mans
//!     series: WEC
//!     track: Circuit de la Sarthe
//!     scheduled_start: 2025-06-14T15:00:00Z
//!     source_endpoint: https://timing.71wytham.org.uk/   # optional
//! ```

use chrono::{DateTime, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::{Schedule, ScheduleSource};
use crate::types::{ScheduledEvent, Series};
use crate::{Result, TrackerError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct ScheduleDocument {
    #[serde(default)]
    events: Vec<EventEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct EventEntry {
    name: String,
    series: Series,
    track: String,
    scheduled_start: DateTime<Utc>,
    #[serde(default, alias = "timing_url")]
    source_endpoint: Option<String>,
}

impl From<EventEntry> for ScheduledEvent {
    fn from(entry: EventEntry) -> Self {
        let event = ScheduledEvent::new(entry.name, entry.series, entry.track, entry.scheduled_start);
        match entry.source_endpoint {
            Some(endpoint) => event.with_endpoint(endpoint),
            None => event,
        }
    }
}

/// Parse a schedule document from YAML text.
pub fn parse_schedule_yaml(yaml: &str) -> Result<Schedule> {
    let document: ScheduleDocument = serde_yaml_ng::from_str(yaml).map_err(|e| {
        TrackerError::schedule("schedule YAML is malformed", Some(Box::new(e)))
    })?;
    Ok(Schedule::new(document.events.into_iter().map(ScheduledEvent::from).collect()))
}

/// A schedule read from a YAML file on every load.
#[derive(Debug, Clone)]
pub struct YamlScheduleFile {
    path: PathBuf,
}

impl YamlScheduleFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait::async_trait]
impl ScheduleSource for YamlScheduleFile {
    async fn load(&self) -> Result<Schedule> {
        let yaml = tokio::fs::read_to_string(&self.path).await.map_err(|e| {
            TrackerError::schedule(
                format!("cannot read schedule file {}", self.path.display()),
                Some(Box::new(e)),
            )
        })?;
        let schedule = parse_schedule_yaml(&yaml)?;
        debug!(path = %self.path.display(), events = schedule.events().len(), "Loaded schedule file");
        Ok(schedule)
    }
}
