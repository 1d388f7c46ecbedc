//! Race session recording
//!
//! The monitor talks to storage through [`SessionStore`]: it deactivates stale
//! sessions, begins one per live event, gets a [`SnapshotSink`] that records
//! into it, and ends it when the race is over.
//!
//! [`RaceStore`] is the in-memory recorder. From the stream of snapshots it
//! derives:
//! - the latest state of every car seen
//! - a lap history, one entry each time a car's completed-lap count rises
//! - pit stops, opened when a car enters the pit lane and closed when it leaves

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::ingest::SnapshotSink;
use crate::types::{CarRecord, ScheduledEvent, SessionId, Snapshot};
use crate::{Result, TrackerError};

/// Storage of race sessions, as seen by the monitor.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync + 'static {
    /// Mark every active session inactive. Returns how many were touched.
    async fn deactivate_all(&self) -> Result<usize>;

    /// Create an active session for `event`.
    async fn begin(&self, event: &ScheduledEvent, started_at: DateTime<Utc>) -> Result<SessionId>;

    /// Mark a session inactive with its end time.
    async fn end(&self, id: SessionId, ended_at: DateTime<Utc>) -> Result<()>;

    /// Sink that records snapshots into session `id`.
    fn sink(&self, id: SessionId) -> Arc<dyn SnapshotSink>;
}

/// Backing record of one race session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceRecord {
    pub id: SessionId,
    pub event: ScheduledEvent,
    pub started_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

/// One completed lap of one car.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LapRecord {
    pub car_number: String,
    pub lap_number: u32,
    /// Seconds, from the car's last-lap column
    pub lap_time: Option<f64>,
    pub position: Option<u32>,
    pub gap_to_leader: Option<f64>,
    pub is_pit_lap: bool,
    pub recorded_at: DateTime<Utc>,
}

/// One visit to the pit lane.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PitStopRecord {
    pub car_number: String,
    /// Completed laps when the car entered
    pub lap_number: Option<u32>,
    pub entered_at: DateTime<Utc>,
    pub exited_at: Option<DateTime<Utc>>,
    /// Seconds from entry to exit, once the car has left
    pub duration: Option<f64>,
}

/// Everything recorded for a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionData {
    pub race: RaceRecord,
    /// Latest state per car, by position then car number
    pub cars: Vec<CarRecord>,
    pub laps: Vec<LapRecord>,
    pub pit_stops: Vec<PitStopRecord>,
    pub snapshots_recorded: u64,
}

#[derive(Debug)]
struct SessionState {
    race: RaceRecord,
    cars: HashMap<String, CarRecord>,
    laps: Vec<LapRecord>,
    pit_stops: Vec<PitStopRecord>,
    snapshots_recorded: u64,
}

impl SessionState {
    fn record(&mut self, snapshot: &Snapshot) {
        let at = snapshot.captured_at;

        for car in &snapshot.cars {
            let previous = self.cars.get(&car.car_number);
            let previous_laps = previous.and_then(|p| p.laps_completed);
            let was_in_pit = previous.and_then(|p| p.in_pit).unwrap_or(false);
            let merged = match previous {
                Some(previous) => merge_known(car, previous),
                None => car.clone(),
            };

            if let Some(laps) = car.laps_completed
                && laps > 0
                && previous_laps.is_none_or(|p| laps > p)
            {
                self.laps.push(LapRecord {
                    car_number: car.car_number.clone(),
                    lap_number: laps,
                    lap_time: car.last_lap_time,
                    position: car.position,
                    gap_to_leader: car.gap_to_leader,
                    is_pit_lap: car.in_pit == Some(true),
                    recorded_at: at,
                });
            }

            match car.in_pit {
                Some(true) if !was_in_pit => {
                    trace!(car = %car.car_number, "Pit entry");
                    self.pit_stops.push(PitStopRecord {
                        car_number: car.car_number.clone(),
                        lap_number: car.laps_completed,
                        entered_at: at,
                        exited_at: None,
                        duration: None,
                    });
                }
                Some(false) if was_in_pit => {
                    let open = self
                        .pit_stops
                        .iter_mut()
                        .rev()
                        .find(|stop| stop.car_number == car.car_number && stop.exited_at.is_none());
                    if let Some(stop) = open {
                        let duration = (at - stop.entered_at).num_milliseconds() as f64 / 1000.0;
                        trace!(car = %car.car_number, duration, "Pit exit");
                        stop.exited_at = Some(at);
                        stop.duration = Some(duration);
                    }
                }
                _ => {}
            }

            self.cars.insert(car.car_number.clone(), merged);
        }

        self.snapshots_recorded += 1;
    }

    fn data(&self) -> SessionData {
        let mut cars: Vec<CarRecord> = self.cars.values().cloned().collect();
        cars.sort_by(|a, b| {
            let a_pos = a.position.unwrap_or(u32::MAX);
            let b_pos = b.position.unwrap_or(u32::MAX);
            a_pos.cmp(&b_pos).then_with(|| a.car_number.cmp(&b.car_number))
        });

        SessionData {
            race: self.race.clone(),
            cars,
            laps: self.laps.clone(),
            pit_stops: self.pit_stops.clone(),
            snapshots_recorded: self.snapshots_recorded,
        }
    }
}

/// Overlay `latest` on `previous`, keeping last known values for absent fields.
fn merge_known(latest: &CarRecord, previous: &CarRecord) -> CarRecord {
    CarRecord {
        car_number: latest.car_number.clone(),
        team: latest.team.clone().or_else(|| previous.team.clone()),
        class: latest.class.clone().or_else(|| previous.class.clone()),
        position: latest.position.or(previous.position),
        laps_completed: latest.laps_completed.or(previous.laps_completed),
        last_lap_time: latest.last_lap_time.or(previous.last_lap_time),
        best_lap_time: latest.best_lap_time.or(previous.best_lap_time),
        gap_to_leader: latest.gap_to_leader.or(previous.gap_to_leader),
        in_pit: latest.in_pit.or(previous.in_pit),
    }
}

#[derive(Debug, Default)]
struct StoreInner {
    next_id: u64,
    sessions: BTreeMap<SessionId, SessionState>,
}

/// In-memory race recorder.
///
/// Cloning gives another handle to the same store.
#[derive(Debug, Clone, Default)]
pub struct RaceStore {
    inner: Arc<Mutex<StoreInner>>,
}

impl RaceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one snapshot into session `id`.
    ///
    /// Snapshots for unknown or ended sessions are dropped.
    pub fn record(&self, id: SessionId, snapshot: &Snapshot) {
        let mut inner = self.inner.lock();
        match inner.sessions.get_mut(&id) {
            Some(session) if session.race.is_active => {
                session.record(snapshot);
                debug!(session = %id, cars = snapshot.cars.len(), "Recorded snapshot");
            }
            Some(_) => warn!(session = %id, "Dropping snapshot for ended session"),
            None => warn!(session = %id, "Dropping snapshot for unknown session"),
        }
    }

    /// Copy of everything recorded for session `id`.
    pub fn session(&self, id: SessionId) -> Result<SessionData> {
        self.inner
            .lock()
            .sessions
            .get(&id)
            .map(SessionState::data)
            .ok_or(TrackerError::UnknownSession { id })
    }

    /// All race records, oldest first.
    pub fn races(&self) -> Vec<RaceRecord> {
        self.inner.lock().sessions.values().map(|s| s.race.clone()).collect()
    }

    /// Ids of sessions currently marked active.
    pub fn active_sessions(&self) -> Vec<SessionId> {
        self.inner
            .lock()
            .sessions
            .values()
            .filter(|s| s.race.is_active)
            .map(|s| s.race.id)
            .collect()
    }
}

#[async_trait::async_trait]
impl SessionStore for RaceStore {
    async fn deactivate_all(&self) -> Result<usize> {
        let mut inner = self.inner.lock();
        let mut count = 0;
        for session in inner.sessions.values_mut().filter(|s| s.race.is_active) {
            session.race.is_active = false;
            count += 1;
        }
        if count > 0 {
            info!(count, "Deactivated stale race sessions");
        }
        Ok(count)
    }

    async fn begin(&self, event: &ScheduledEvent, started_at: DateTime<Utc>) -> Result<SessionId> {
        let mut inner = self.inner.lock();
        inner.next_id += 1;
        let id = SessionId(inner.next_id);

        let race = RaceRecord {
            id,
            event: event.clone(),
            started_at,
            ended_at: None,
            is_active: true,
        };
        inner.sessions.insert(
            id,
            SessionState {
                race,
                cars: HashMap::new(),
                laps: Vec::new(),
                pit_stops: Vec::new(),
                snapshots_recorded: 0,
            },
        );

        info!(session = %id, event = %event.name, "Race session created");
        Ok(id)
    }

    async fn end(&self, id: SessionId, ended_at: DateTime<Utc>) -> Result<()> {
        let mut inner = self.inner.lock();
        let session = inner.sessions.get_mut(&id).ok_or(TrackerError::UnknownSession { id })?;
        session.race.is_active = false;
        session.race.ended_at = Some(ended_at);
        info!(
            session = %id,
            laps = session.laps.len(),
            pit_stops = session.pit_stops.len(),
            "Race session ended"
        );
        Ok(())
    }

    fn sink(&self, id: SessionId) -> Arc<dyn SnapshotSink> {
        Arc::new(RaceSink { store: self.clone(), id })
    }
}

/// [`SnapshotSink`] recording into one session of a [`RaceStore`].
#[derive(Debug, Clone)]
pub struct RaceSink {
    store: RaceStore,
    id: SessionId,
}

#[async_trait::async_trait]
impl SnapshotSink for RaceSink {
    async fn on_snapshot(&self, snapshot: Snapshot) {
        self.store.record(self.id, &snapshot);
    }
}
