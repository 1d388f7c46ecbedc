//! Race export
//!
//! When a session ends the monitor hands its id to a [`SessionExporter`].
//! [`JsonExporter`] writes everything the [`RaceStore`] recorded to one
//! pretty-printed JSON file per session.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::store::{LapRecord, PitStopRecord, RaceStore, SessionData};
use crate::types::{CarRecord, Series, SessionId};
use crate::{Result, TrackerError};

/// Directory exports go to when none is configured.
pub const DEFAULT_EXPORT_DIR: &str = "race_exports";

/// Writes a durable artifact for a finished session.
#[async_trait::async_trait]
pub trait SessionExporter: Send + Sync + 'static {
    /// Export session `id`, returning where the artifact was written.
    async fn export_session(&self, id: SessionId) -> Result<PathBuf>;
}

/// `race_info` block of an export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceInfo {
    pub id: SessionId,
    pub series: Series,
    pub name: String,
    pub track: String,
    pub scheduled_start: DateTime<Utc>,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub is_active: bool,
    pub exported_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FastestLap {
    pub car_number: String,
    pub lap_number: u32,
    pub time: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PitStopLeader {
    pub car_number: String,
    pub count: usize,
}

/// Summary figures computed at export time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceStatistics {
    pub total_cars: usize,
    pub total_laps: usize,
    pub total_pit_stops: usize,
    /// Quickest timed lap that was not a pit lap
    pub fastest_lap: Option<FastestLap>,
    pub most_pit_stops: Option<PitStopLeader>,
}

impl RaceStatistics {
    pub fn compute(cars: &[CarRecord], laps: &[LapRecord], pit_stops: &[PitStopRecord]) -> Self {
        let fastest_lap = laps
            .iter()
            .filter(|lap| !lap.is_pit_lap)
            .filter_map(|lap| lap.lap_time.map(|time| (lap, time)))
            .min_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(lap, time)| FastestLap {
                car_number: lap.car_number.clone(),
                lap_number: lap.lap_number,
                time,
            });

        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for stop in pit_stops {
            *counts.entry(stop.car_number.as_str()).or_default() += 1;
        }
        // Ties go to the lowest car number.
        let most_pit_stops = counts
            .into_iter()
            .fold(None::<(&str, usize)>, |best, (car, count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((car, count)),
            })
            .map(|(car, count)| PitStopLeader { car_number: car.to_string(), count });

        Self {
            total_cars: cars.len(),
            total_laps: laps.len(),
            total_pit_stops: pit_stops.len(),
            fastest_lap,
            most_pit_stops,
        }
    }
}

/// Full export document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceExport {
    pub race_info: RaceInfo,
    pub cars: Vec<CarRecord>,
    pub laps: Vec<LapRecord>,
    pub pit_stops: Vec<PitStopRecord>,
    pub statistics: RaceStatistics,
}

impl RaceExport {
    pub fn new(data: SessionData, exported_at: DateTime<Utc>) -> Self {
        let statistics = RaceStatistics::compute(&data.cars, &data.laps, &data.pit_stops);
        let race = data.race;
        Self {
            race_info: RaceInfo {
                id: race.id,
                series: race.event.series,
                name: race.event.name,
                track: race.event.track,
                scheduled_start: race.event.scheduled_start,
                start_time: race.started_at,
                end_time: race.ended_at,
                is_active: race.is_active,
                exported_at,
            },
            cars: data.cars,
            laps: data.laps,
            pit_stops: data.pit_stops,
            statistics,
        }
    }
}

/// File name for an export: spaces become `_`, slashes become `-`.
pub fn export_file_name(race_name: &str, exported_at: DateTime<Utc>) -> String {
    let safe = race_name.replace(' ', "_").replace('/', "-");
    format!("{}_{}.json", safe, exported_at.format("%Y%m%d_%H%M%S"))
}

/// Exporter writing JSON files under one directory.
#[derive(Debug, Clone)]
pub struct JsonExporter {
    store: RaceStore,
    export_dir: PathBuf,
}

impl JsonExporter {
    pub fn new(store: RaceStore, export_dir: impl Into<PathBuf>) -> Self {
        Self { store, export_dir: export_dir.into() }
    }

    pub fn export_dir(&self) -> &Path {
        &self.export_dir
    }
}

#[async_trait::async_trait]
impl SessionExporter for JsonExporter {
    async fn export_session(&self, id: SessionId) -> Result<PathBuf> {
        let data = self.store.session(id)?;
        let exported_at = Utc::now();
        let path = self.export_dir.join(export_file_name(&data.race.event.name, exported_at));

        let document = RaceExport::new(data, exported_at);
        let json = serde_json::to_vec_pretty(&document)?;

        tokio::fs::create_dir_all(&self.export_dir)
            .await
            .map_err(|e| TrackerError::export(&self.export_dir, e))?;
        tokio::fs::write(&path, json).await.map_err(|e| TrackerError::export(&path, e))?;

        info!(
            session = %id,
            path = %path.display(),
            laps = document.statistics.total_laps,
            "Race data exported"
        );
        Ok(path)
    }
}
