//! Liveness window around a scheduled start

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use crate::{Result, TrackerError};

/// Where an event sits relative to its liveness window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Liveness {
    /// Earlier than `scheduled_start - pre_roll`
    NotYetLive,
    /// Inside the closed window
    Live,
    /// Later than `scheduled_start + max_duration`
    Ended,
}

/// Interval around a scheduled start during which ingestion runs.
///
/// An event is live iff `-pre_roll <= now - scheduled_start <= max_duration`.
/// Both bounds are inclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LivenessWindow {
    pre_roll: TimeDelta,
    max_duration: TimeDelta,
}

impl LivenessWindow {
    /// Default broadcast pre-roll before the green flag.
    pub const DEFAULT_PRE_ROLL_MINUTES: i64 = 30;

    /// Default upper bound on race length.
    pub const DEFAULT_MAX_DURATION_MINUTES: i64 = 720;

    /// Create a window, rejecting a negative pre-roll or a non-positive duration.
    pub fn new(pre_roll: TimeDelta, max_duration: TimeDelta) -> Result<Self> {
        if pre_roll < TimeDelta::zero() {
            return Err(TrackerError::config("liveness pre_roll must not be negative"));
        }
        if max_duration <= TimeDelta::zero() {
            return Err(TrackerError::config("liveness max_duration must be positive"));
        }
        Ok(Self { pre_roll, max_duration })
    }

    /// Create a window from minute counts.
    pub fn from_minutes(pre_roll: i64, max_duration: i64) -> Result<Self> {
        let minutes = |value: i64| {
            TimeDelta::try_minutes(value)
                .ok_or_else(|| TrackerError::config(format!("{value} minutes is out of range")))
        };
        Self::new(minutes(pre_roll)?, minutes(max_duration)?)
    }

    pub fn pre_roll(&self) -> TimeDelta {
        self.pre_roll
    }

    pub fn max_duration(&self) -> TimeDelta {
        self.max_duration
    }

    /// Classify `now` against an event starting at `scheduled_start`.
    pub fn classify(&self, now: DateTime<Utc>, scheduled_start: DateTime<Utc>) -> Liveness {
        let elapsed = now - scheduled_start;
        if elapsed < -self.pre_roll {
            Liveness::NotYetLive
        } else if elapsed > self.max_duration {
            Liveness::Ended
        } else {
            Liveness::Live
        }
    }

    /// Whether an event starting at `scheduled_start` is live at `now`.
    pub fn is_live(&self, now: DateTime<Utc>, scheduled_start: DateTime<Utc>) -> bool {
        self.classify(now, scheduled_start) == Liveness::Live
    }

    /// First instant at which an event starting at `scheduled_start` is live.
    pub fn opens_at(&self, scheduled_start: DateTime<Utc>) -> DateTime<Utc> {
        scheduled_start - self.pre_roll
    }
}

impl Default for LivenessWindow {
    fn default() -> Self {
        Self {
            pre_roll: TimeDelta::minutes(Self::DEFAULT_PRE_ROLL_MINUTES),
            max_duration: TimeDelta::minutes(Self::DEFAULT_MAX_DURATION_MINUTES),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 14, 0, 0).unwrap()
    }

    #[test]
    fn boundaries_are_live() {
        let window = LivenessWindow::default();
        let start = start();

        assert!(window.is_live(start - TimeDelta::minutes(30), start));
        assert!(window.is_live(start + TimeDelta::minutes(720), start));
        assert_eq!(
            window.classify(start - TimeDelta::minutes(30) - TimeDelta::seconds(1), start),
            Liveness::NotYetLive
        );
        assert_eq!(
            window.classify(start + TimeDelta::minutes(720) + TimeDelta::seconds(1), start),
            Liveness::Ended
        );
    }

    #[test]
    fn rejects_invalid_parameters() {
        assert!(LivenessWindow::from_minutes(-1, 720).is_err());
        assert!(LivenessWindow::from_minutes(30, 0).is_err());
        assert!(LivenessWindow::from_minutes(0, 1).is_ok());
    }

    proptest! {
        #[test]
        fn live_iff_inside_closed_interval(
            pre_roll in 0i64..600,
            max_duration in 1i64..2000,
            offset_secs in -100_000i64..200_000,
        ) {
            let window = LivenessWindow::from_minutes(pre_roll, max_duration).unwrap();
            let start = start();
            let now = start + TimeDelta::seconds(offset_secs);

            let expected = -pre_roll * 60 <= offset_secs && offset_secs <= max_duration * 60;
            prop_assert_eq!(window.is_live(now, start), expected);

            let liveness = window.classify(now, start);
            if offset_secs < -pre_roll * 60 {
                prop_assert_eq!(liveness, Liveness::NotYetLive);
            } else if offset_secs > max_duration * 60 {
                prop_assert_eq!(liveness, Liveness::Ended);
            }
        }
    }
}
