//! Racing series served by the tracker

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::TrackerError;

/// Championship a scheduled event belongs to.
///
/// The series decides which snapshot source variant is used for its timing
/// page, so the set is closed: adding a series means adding its timing
/// layout and source mapping in [`crate::sources`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Series {
    /// FIA World Endurance Championship
    #[serde(rename = "WEC", alias = "wec")]
    Wec,
    /// IMSA WeatherTech SportsCar Championship
    #[serde(rename = "IMSA", alias = "imsa")]
    Imsa,
}

impl Series {
    /// All series known to the tracker.
    pub const ALL: [Series; 2] = [Series::Wec, Series::Imsa];

    /// Short tag used in logs, snapshots and exports.
    pub fn tag(self) -> &'static str {
        match self {
            Series::Wec => "WEC",
            Series::Imsa => "IMSA",
        }
    }

    /// Public live timing page used when an event does not name its own.
    pub fn default_endpoint(self) -> &'static str {
        match self {
            Series::Wec => "https://timing.71wytham.org.uk/",
            Series::Imsa => "https://www.imsa.com/scoring/",
        }
    }
}

impl fmt::Display for Series {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Series {
    type Err = TrackerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "WEC" => Ok(Series::Wec),
            "IMSA" => Ok(Series::Imsa),
            other => Err(TrackerError::config(format!("unknown series '{other}'"))),
        }
    }
}
