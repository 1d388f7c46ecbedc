//! Scheduled race events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::Series;

/// Identity of a scheduled event: its name plus its scheduled start.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EventId {
    pub name: String,
    pub scheduled_start: DateTime<Utc>,
}

impl fmt::Display for EventId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} @ {}", self.name, self.scheduled_start.to_rfc3339())
    }
}

/// A known race on the calendar.
///
/// Produced once when the schedule is loaded and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledEvent {
    /// Event name, e.g. "24 Hours of Le Mans"
    pub name: String,
    /// Championship the event belongs to
    pub series: Series,
    /// Circuit name
    pub track: String,
    /// Scheduled green flag
    pub scheduled_start: DateTime<Utc>,
    /// Live timing page for this event
    pub source_endpoint: String,
}

impl ScheduledEvent {
    /// Create an event using the series' default timing endpoint.
    pub fn new(
        name: impl Into<String>,
        series: Series,
        track: impl Into<String>,
        scheduled_start: DateTime<Utc>,
    ) -> Self {
        Self {
            name: name.into(),
            series,
            track: track.into(),
            scheduled_start,
            source_endpoint: series.default_endpoint().to_string(),
        }
    }

    /// Override the timing endpoint.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.source_endpoint = endpoint.into();
        self
    }

    /// Identity of this event.
    pub fn id(&self) -> EventId {
        EventId { name: self.name.clone(), scheduled_start: self.scheduled_start }
    }

    /// Whether this event has the given identity.
    pub fn is(&self, id: &EventId) -> bool {
        self.name == id.name && self.scheduled_start == id.scheduled_start
    }
}
