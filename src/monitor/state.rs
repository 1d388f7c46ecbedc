//! Monitor decision logic
//!
//! Pure functions from (bound event, schedule, now) to what the monitor
//! should do on this poll. No I/O, so every branch is testable with plain
//! values.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::schedule::Schedule;
use crate::types::{EventId, Liveness, LivenessWindow, ScheduledEvent};

/// Lifecycle state of the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    /// Constructed, not yet polling
    Idle,
    /// Polling the schedule with no session bound
    Watching,
    /// A session is bound and its ingestion loop is running
    Live,
}

impl fmt::Display for MonitorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MonitorState::Idle => f.write_str("idle"),
            MonitorState::Watching => f.write_str("watching"),
            MonitorState::Live => f.write_str("live"),
        }
    }
}

/// Why a bound session was stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The event's liveness window closed
    Ended,
    /// The event disappeared from the schedule
    Removed,
    /// A later event went live
    Superseded,
    /// The monitor itself is stopping
    Shutdown,
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StopReason::Ended => f.write_str("ended"),
            StopReason::Removed => f.write_str("removed from schedule"),
            StopReason::Superseded => f.write_str("superseded"),
            StopReason::Shutdown => f.write_str("shutdown"),
        }
    }
}

/// Action for one poll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Nothing to do
    Stay,
    /// Bind a session to this event
    Start(ScheduledEvent),
    /// End the bound session
    Stop(StopReason),
    /// End the bound session, then bind another event
    Switch { reason: StopReason, to: ScheduledEvent },
}

/// Decide what to do given the currently bound event, if any.
///
/// The candidate is the live event with the latest scheduled start. A bound
/// event stays bound while it is live, still scheduled and not superseded by
/// a later live event.
pub fn decide(
    bound: Option<&EventId>,
    schedule: &Schedule,
    now: DateTime<Utc>,
    window: &LivenessWindow,
) -> Decision {
    let candidate = schedule.current(now, window);

    let Some(bound) = bound else {
        return match candidate {
            Some(event) => Decision::Start(event.clone()),
            None => Decision::Stay,
        };
    };

    let stop_reason = match schedule.find(bound) {
        None => Some(StopReason::Removed),
        Some(event) => match window.classify(now, event.scheduled_start) {
            Liveness::Live => None,
            Liveness::Ended | Liveness::NotYetLive => Some(StopReason::Ended),
        },
    };

    match (stop_reason, candidate) {
        (None, Some(event)) if !event.is(bound) => {
            Decision::Switch { reason: StopReason::Superseded, to: event.clone() }
        }
        (None, _) => Decision::Stay,
        (Some(reason), Some(event)) => Decision::Switch { reason, to: event.clone() },
        (Some(reason), None) => Decision::Stop(reason),
    }
}
