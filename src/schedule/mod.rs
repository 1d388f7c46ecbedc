//! Race schedule
//!
//! [`Schedule`] answers the pure questions ("what is next after T", "what is
//! live at T"). [`ScheduleSource`] produces a `Schedule` and is the only part
//! that can fail: a file may be missing or malformed. The monitor reloads the
//! schedule from its source on every poll.

mod calendar;
mod file;

pub use calendar::{StaticSchedule, builtin_calendar};
pub use file::{YamlScheduleFile, parse_schedule_yaml};

use chrono::{DateTime, TimeDelta, Utc};

use crate::Result;
use crate::types::{EventId, LivenessWindow, ScheduledEvent};

/// An immutable, chronologically ordered list of events.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schedule {
    events: Vec<ScheduledEvent>,
}

impl Schedule {
    /// Build a schedule, ordering events by scheduled start.
    pub fn new(mut events: Vec<ScheduledEvent>) -> Self {
        events.sort_by(|a, b| {
            a.scheduled_start.cmp(&b.scheduled_start).then_with(|| a.name.cmp(&b.name))
        });
        Self { events }
    }

    /// All events in start order.
    pub fn events(&self) -> &[ScheduledEvent] {
        &self.events
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Nearest event with `scheduled_start > now`.
    pub fn next_event(&self, now: DateTime<Utc>) -> Option<&ScheduledEvent> {
        self.events.iter().find(|e| e.scheduled_start > now)
    }

    /// Up to `limit` events with `scheduled_start > now`, ascending.
    pub fn upcoming(&self, now: DateTime<Utc>, limit: usize) -> Vec<&ScheduledEvent> {
        self.events.iter().filter(|e| e.scheduled_start > now).take(limit).collect()
    }

    /// Events whose liveness window contains `now`, ascending by start.
    pub fn live_at(
        &self,
        now: DateTime<Utc>,
        window: &LivenessWindow,
    ) -> impl Iterator<Item = &ScheduledEvent> {
        self.events.iter().filter(move |e| window.is_live(now, e.scheduled_start))
    }

    /// The live event that should own ingestion at `now`.
    ///
    /// When windows overlap the most recently scheduled live event wins, so a
    /// race entering its pre-roll takes over from one still inside its
    /// maximum duration.
    pub fn current(&self, now: DateTime<Utc>, window: &LivenessWindow) -> Option<&ScheduledEvent> {
        self.live_at(now, window).last()
    }

    /// Look up an event by identity.
    pub fn find(&self, id: &EventId) -> Option<&ScheduledEvent> {
        self.events.iter().find(|e| e.is(id))
    }
}

/// Anything that can produce the current race schedule.
#[async_trait::async_trait]
pub trait ScheduleSource: Send + Sync + 'static {
    /// Load the schedule.
    ///
    /// An empty schedule is a valid result. Errors mean the schedule could not
    /// be read at all.
    async fn load(&self) -> Result<Schedule>;
}

/// Human readable time until an event: `"2d 5h"`, `"3h 12m"` or `"45m"`.
///
/// Negative deltas (the event already started) render as `"0m"`.
pub fn format_countdown(delta: TimeDelta) -> String {
    let total_minutes = delta.num_minutes().max(0);
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes / 60) % 24;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{days}d {hours}h")
    } else if hours > 0 {
        format!("{hours}h {minutes}m")
    } else {
        format!("{minutes}m")
    }
}
