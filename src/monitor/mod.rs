//! Race lifecycle monitor
//!
//! [`RaceMonitor`] polls the schedule on a coarse interval and is the only
//! component allowed to start or stop ingestion. Each poll runs the pure
//! [`decide`] function and applies its decision:
//!
//! - `WATCHING → LIVE`: deactivate stale records, begin a session, build the
//!   source for the event's series, start the ingestion loop
//! - `LIVE → WATCHING`: stop the loop, end the session, export it
//! - `LIVE → LIVE`: nothing, the running loop is left alone
//!
//! A failed poll is logged and retried after the shorter retry interval; the
//! monitor itself never stops on an error.
//!
//! [`RaceMonitor::spawn`] moves the monitor onto a task and returns a
//! [`MonitorHandle`], the read-only window other components use.

mod state;

pub use state::{Decision, MonitorState, StopReason, decide};

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::Stream;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::WatchStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::Result;
use crate::export::SessionExporter;
use crate::ingest::{IngestCounters, IngestStats, IngestionLoop};
use crate::schedule::ScheduleSource;
use crate::sources::SourceFactory;
use crate::store::SessionStore;
use crate::types::{EventId, LivenessWindow, ScheduledEvent, SessionId};

/// Timing knobs of the monitor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonitorSettings {
    /// Normal schedule poll cadence
    pub poll_interval: Duration,
    /// Delay before the next poll after a failed one
    pub retry_interval: Duration,
    /// Fetch cadence handed to the ingestion loop
    pub ingest_interval: Duration,
    pub window: LivenessWindow,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(300),
            retry_interval: Duration::from_secs(60),
            ingest_interval: Duration::from_secs(10),
            window: LivenessWindow::default(),
        }
    }
}

/// Read-only view of the monitor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitorStatus {
    /// The poll loop is running
    pub monitoring: bool,
    /// An ingestion loop is running
    pub scraping: bool,
    /// Name of the bound event
    pub current_event: Option<String>,
    pub state: MonitorState,
    pub session_id: Option<SessionId>,
    pub session_started_at: Option<DateTime<Utc>>,
    pub poll_interval_secs: u64,
    /// Counters of the current (or last) ingestion run
    pub ingestion: IngestCounters,
}

/// Outcome of one poll.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// No state change
    Unchanged(MonitorState),
    /// `WATCHING → LIVE`
    Started { event: EventId, session: SessionId },
    /// `LIVE → WATCHING`
    Stopped { event: EventId, session: SessionId, reason: StopReason, export: Option<PathBuf> },
    /// `LIVE → WATCHING → LIVE` within one poll
    Switched { from: EventId, to: EventId, session: SessionId, reason: StopReason },
}

#[derive(Debug)]
struct ActiveSession {
    event: ScheduledEvent,
    id: SessionId,
    started_at: DateTime<Utc>,
}

/// The race lifecycle state machine.
pub struct RaceMonitor {
    schedule: Arc<dyn ScheduleSource>,
    sources: Arc<dyn SourceFactory>,
    store: Arc<dyn SessionStore>,
    exporter: Arc<dyn SessionExporter>,
    settings: MonitorSettings,
    state: MonitorState,
    monitoring: bool,
    active: Option<ActiveSession>,
    ingestion: IngestionLoop,
    status_tx: watch::Sender<MonitorStatus>,
}

impl RaceMonitor {
    pub fn new(
        schedule: Arc<dyn ScheduleSource>,
        sources: Arc<dyn SourceFactory>,
        store: Arc<dyn SessionStore>,
        exporter: Arc<dyn SessionExporter>,
        settings: MonitorSettings,
    ) -> Self {
        let ingestion = IngestionLoop::new();
        let initial = MonitorStatus {
            monitoring: false,
            scraping: false,
            current_event: None,
            state: MonitorState::Idle,
            session_id: None,
            session_started_at: None,
            poll_interval_secs: settings.poll_interval.as_secs(),
            ingestion: IngestCounters::default(),
        };
        let (status_tx, _) = watch::channel(initial);

        Self {
            schedule,
            sources,
            store,
            exporter,
            settings,
            state: MonitorState::Idle,
            monitoring: false,
            active: None,
            ingestion,
            status_tx,
        }
    }

    pub fn state(&self) -> MonitorState {
        self.state
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    /// Current status, built from the monitor's own fields.
    pub fn status(&self) -> MonitorStatus {
        MonitorStatus {
            monitoring: self.monitoring,
            scraping: self.ingestion.is_running(),
            current_event: self.active.as_ref().map(|a| a.event.name.clone()),
            state: self.state,
            session_id: self.active.as_ref().map(|a| a.id),
            session_started_at: self.active.as_ref().map(|a| a.started_at),
            poll_interval_secs: self.settings.poll_interval.as_secs(),
            ingestion: self.ingestion.counters(),
        }
    }

    /// Receiver of status updates, published after every poll.
    pub fn subscribe(&self) -> watch::Receiver<MonitorStatus> {
        self.status_tx.subscribe()
    }

    fn publish(&self) {
        self.status_tx.send_replace(self.status());
    }

    /// Run one poll against the schedule as of `now`.
    ///
    /// An error means the poll failed (schedule unavailable, or a session
    /// could not be started) and should be retried on the shorter interval.
    pub async fn poll_once(&mut self, now: DateTime<Utc>) -> Result<Transition> {
        if self.state == MonitorState::Idle {
            self.state = MonitorState::Watching;
        }

        let result = self.apply_poll(now).await;
        self.publish();
        result
    }

    async fn apply_poll(&mut self, now: DateTime<Utc>) -> Result<Transition> {
        let schedule = self.schedule.load().await?;
        let bound = self.active.as_ref().map(|a| a.event.id());
        let decision = decide(bound.as_ref(), &schedule, now, &self.settings.window);
        debug!(state = %self.state, events = schedule.events().len(), ?decision, "Schedule polled");

        match decision {
            Decision::Stay => {
                if self.active.is_none()
                    && let Some(next) = schedule.next_event(now)
                {
                    debug!(event = %next.name, starts = %next.scheduled_start, "Next race");
                }
                Ok(Transition::Unchanged(self.state))
            }
            Decision::Start(event) => {
                let id = event.id();
                let session = self.begin_session(event, now).await?;
                Ok(Transition::Started { event: id, session })
            }
            Decision::Stop(reason) => match self.end_session(reason, now).await {
                Some((event, session, export)) => {
                    Ok(Transition::Stopped { event, session, reason, export })
                }
                None => Ok(Transition::Unchanged(self.state)),
            },
            Decision::Switch { reason, to } => {
                let from = self.end_session(reason, now).await.map(|(event, ..)| event);
                let id = to.id();
                let session = self.begin_session(to, now).await?;
                Ok(match from {
                    Some(from) => Transition::Switched { from, to: id, session, reason },
                    None => Transition::Started { event: id, session },
                })
            }
        }
    }

    async fn begin_session(&mut self, event: ScheduledEvent, now: DateTime<Utc>) -> Result<SessionId> {
        let source = self.sources.create(&event)?;
        self.store.deactivate_all().await?;
        let id = self.store.begin(&event, now).await?;

        let sink = self.store.sink(id);
        self.ingestion.start(source, self.settings.ingest_interval, sink);

        info!(
            event = %event.name,
            series = %event.series,
            track = %event.track,
            session = %id,
            "Race is live, ingestion started"
        );
        self.active = Some(ActiveSession { event, id, started_at: now });
        self.state = MonitorState::Live;
        Ok(id)
    }

    /// Stop ingestion, end and export the bound session.
    async fn end_session(
        &mut self,
        reason: StopReason,
        ended_at: DateTime<Utc>,
    ) -> Option<(EventId, SessionId, Option<PathBuf>)> {
        let active = self.active.take()?;
        self.state = MonitorState::Watching;
        info!(event = %active.event.name, session = %active.id, %reason, "Race no longer live, stopping ingestion");

        self.ingestion.stop().await;

        if let Err(e) = self.store.end(active.id, ended_at).await {
            error!(session = %active.id, error = %e, "Failed to mark session ended");
        }

        let export = match self.exporter.export_session(active.id).await {
            Ok(path) => {
                info!(session = %active.id, path = %path.display(), "Race exported");
                Some(path)
            }
            Err(e) => {
                error!(session = %active.id, error = %e, "Race export failed");
                None
            }
        };

        Some((active.event.id(), active.id, export))
    }

    /// End any bound session and mark the monitor stopped.
    pub async fn shutdown(&mut self) {
        self.end_session(StopReason::Shutdown, Utc::now()).await;
        self.monitoring = false;
        self.publish();
        info!("Race monitor stopped");
    }

    /// Poll until `cancel` fires, then shut down.
    pub async fn run(mut self, cancel: CancellationToken) {
        self.monitoring = true;
        self.state = MonitorState::Watching;
        self.publish();
        info!(
            poll_secs = self.settings.poll_interval.as_secs(),
            retry_secs = self.settings.retry_interval.as_secs(),
            "Race monitor started"
        );

        loop {
            // Polls are not interrupted, a half-applied transition would leak a session.
            let delay = match self.poll_once(Utc::now()).await {
                Ok(transition) => {
                    debug!(?transition, "Poll complete");
                    self.settings.poll_interval
                }
                Err(e) => {
                    warn!(
                        error = %e,
                        retry_secs = self.settings.retry_interval.as_secs(),
                        "Monitor poll failed"
                    );
                    self.settings.retry_interval
                }
            };

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = tokio::time::sleep(delay) => {}
            }
        }

        self.shutdown().await;
    }

    /// Run the monitor on its own task.
    pub fn spawn(self) -> MonitorHandle {
        let cancel = CancellationToken::new();
        let status = self.subscribe();
        let stats = self.ingestion.stats();
        let task = tokio::spawn(self.run(cancel.clone()));
        MonitorHandle { status, stats, cancel, task: Some(task) }
    }
}

/// Handle to a spawned [`RaceMonitor`].
///
/// Dropping the handle cancels the monitor, which still ends and exports
/// its session on the way out.
pub struct MonitorHandle {
    status: watch::Receiver<MonitorStatus>,
    stats: Arc<IngestStats>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl MonitorHandle {
    /// Latest status with live ingestion counters.
    pub fn status(&self) -> MonitorStatus {
        let mut status = self.status.borrow().clone();
        status.ingestion = self.stats.counters();
        status
    }

    /// Stream of status updates, starting with the current one.
    pub fn status_updates(&self) -> impl Stream<Item = MonitorStatus> + 'static {
        WatchStream::new(self.status.clone())
    }

    /// Stop polling, stop ingestion and export any bound session.
    ///
    /// Returns once the session record is ended. Returns `false` when the
    /// monitor was already stopped.
    pub async fn stop_monitoring(&mut self) -> bool {
        self.cancel.cancel();
        let Some(task) = self.task.take() else {
            return false;
        };
        if let Err(e) = task.await {
            error!(error = %e, "Monitor task ended abnormally");
        }
        true
    }

    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(|t| t.is_finished())
    }
}

impl Drop for MonitorHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Result;
    use crate::TrackerError;
    use crate::schedule::{Schedule, StaticSchedule};
    use crate::source::SnapshotSource;
    use crate::store::RaceStore;
    use crate::test_utils::ScriptedSource;
    use crate::types::Series;
    use chrono::{TimeDelta, TimeZone};
    use parking_lot::Mutex;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 14, 12, 0, 0).unwrap()
    }

    fn at(minutes: i64) -> DateTime<Utc> {
        t0() + TimeDelta::minutes(minutes)
    }

    fn event(name: &str, start_minutes: i64) -> ScheduledEvent {
        ScheduledEvent::new(name, Series::Wec, "Circuit", at(start_minutes))
    }

    struct ScriptedFactory {
        created: Mutex<Vec<String>>,
        fail: bool,
    }

    impl ScriptedFactory {
        fn new() -> Self {
            Self { created: Mutex::new(Vec::new()), fail: false }
        }
    }

    impl SourceFactory for ScriptedFactory {
        fn create(&self, event: &ScheduledEvent) -> Result<Box<dyn SnapshotSource>> {
            if self.fail {
                return Err(TrackerError::browser("no browser", None));
            }
            self.created.lock().push(event.name.clone());
            Ok(Box::new(ScriptedSource::new(event.series)))
        }
    }

    #[derive(Default)]
    struct CountingExporter {
        exported: Mutex<Vec<SessionId>>,
    }

    #[async_trait::async_trait]
    impl SessionExporter for CountingExporter {
        async fn export_session(&self, id: SessionId) -> Result<PathBuf> {
            self.exported.lock().push(id);
            Ok(PathBuf::from(format!("/exports/{}.json", id.0)))
        }
    }

    /// Schedule whose contents and availability can change between polls.
    #[derive(Default)]
    struct SwitchableSchedule {
        events: Mutex<Vec<ScheduledEvent>>,
        failing: Mutex<bool>,
    }

    #[async_trait::async_trait]
    impl ScheduleSource for SwitchableSchedule {
        async fn load(&self) -> Result<Schedule> {
            if *self.failing.lock() {
                return Err(TrackerError::schedule("unreachable", None));
            }
            Ok(Schedule::new(self.events.lock().clone()))
        }
    }

    struct Fixture {
        monitor: RaceMonitor,
        store: RaceStore,
        factory: Arc<ScriptedFactory>,
        exporter: Arc<CountingExporter>,
    }

    fn fixture(schedule: Arc<dyn ScheduleSource>, factory: ScriptedFactory) -> Fixture {
        let store = RaceStore::new();
        let factory = Arc::new(factory);
        let exporter = Arc::new(CountingExporter::default());
        let monitor = RaceMonitor::new(
            schedule,
            factory.clone(),
            Arc::new(store.clone()),
            exporter.clone(),
            MonitorSettings::default(),
        );
        Fixture { monitor, store, factory, exporter }
    }

    fn static_schedule(events: Vec<ScheduledEvent>) -> Arc<dyn ScheduleSource> {
        Arc::new(StaticSchedule::new(events))
    }

    #[tokio::test]
    async fn goes_live_when_next_event_enters_window() {
        let mut f = fixture(
            static_schedule(vec![event("Event A", 30), event("Event B", 120)]),
            ScriptedFactory::new(),
        );
        assert_eq!(f.monitor.state(), MonitorState::Idle);

        let transition = f.monitor.poll_once(at(-5)).await.unwrap();
        assert_eq!(transition, Transition::Unchanged(MonitorState::Watching));
        assert!(!f.monitor.status().scraping);

        let transition = f.monitor.poll_once(at(1)).await.unwrap();
        assert!(matches!(transition, Transition::Started { ref event, .. } if event.name == "Event A"));

        let status = f.monitor.status();
        assert_eq!(status.state, MonitorState::Live);
        assert!(status.scraping);
        assert_eq!(status.current_event.as_deref(), Some("Event A"));
        assert_eq!(f.store.active_sessions().len(), 1);

        f.monitor.shutdown().await;
    }

    #[tokio::test]
    async fn live_self_transition_does_not_restart() {
        let mut f = fixture(static_schedule(vec![event("Event A", 0)]), ScriptedFactory::new());

        f.monitor.poll_once(at(0)).await.unwrap();
        let first = f.monitor.status().session_id;
        for minutes in [5, 60, 300, 719] {
            let transition = f.monitor.poll_once(at(minutes)).await.unwrap();
            assert_eq!(transition, Transition::Unchanged(MonitorState::Live));
        }

        assert_eq!(f.monitor.status().session_id, first);
        assert_eq!(f.factory.created.lock().len(), 1);
        assert_eq!(f.store.races().len(), 1);
        f.monitor.shutdown().await;
    }

    #[tokio::test]
    async fn ended_race_is_stopped_and_exported() {
        let mut f = fixture(static_schedule(vec![event("Event A", 0)]), ScriptedFactory::new());

        f.monitor.poll_once(at(0)).await.unwrap();
        let transition = f.monitor.poll_once(at(721)).await.unwrap();

        let Transition::Stopped { session, reason, export, .. } = transition else {
            panic!("expected Stopped, got {transition:?}");
        };
        assert_eq!(reason, StopReason::Ended);
        assert!(export.is_some());
        assert_eq!(*f.exporter.exported.lock(), vec![session]);

        let race = &f.store.races()[0];
        assert!(!race.is_active);
        assert_eq!(race.ended_at, Some(at(721)));

        let status = f.monitor.status();
        assert_eq!(status.state, MonitorState::Watching);
        assert!(!status.scraping);
        assert_eq!(status.current_event, None);
    }

    #[tokio::test]
    async fn newer_live_event_takes_over_in_one_poll() {
        let mut f = fixture(
            static_schedule(vec![event("Event A", 0), event("Event B", 240)]),
            ScriptedFactory::new(),
        );

        f.monitor.poll_once(at(0)).await.unwrap();
        let transition = f.monitor.poll_once(at(215)).await.unwrap();
        assert!(matches!(
            transition,
            Transition::Switched { ref from, ref to, reason: StopReason::Superseded, .. }
                if from.name == "Event A" && to.name == "Event B"
        ));

        assert_eq!(f.store.active_sessions().len(), 1);
        assert_eq!(f.exporter.exported.lock().len(), 1);
        assert_eq!(f.monitor.status().current_event.as_deref(), Some("Event B"));
        f.monitor.shutdown().await;
    }

    #[tokio::test]
    async fn schedule_failure_keeps_session_running() {
        let schedule = Arc::new(SwitchableSchedule::default());
        schedule.events.lock().push(event("Event A", 0));
        let mut f = fixture(schedule.clone(), ScriptedFactory::new());

        f.monitor.poll_once(at(0)).await.unwrap();
        *schedule.failing.lock() = true;

        let err = f.monitor.poll_once(at(10)).await.unwrap_err();
        assert!(matches!(err, TrackerError::Schedule { .. }));
        assert_eq!(f.monitor.state(), MonitorState::Live);
        assert!(f.monitor.status().scraping);

        *schedule.failing.lock() = false;
        assert_eq!(
            f.monitor.poll_once(at(20)).await.unwrap(),
            Transition::Unchanged(MonitorState::Live)
        );
        f.monitor.shutdown().await;
    }

    #[tokio::test]
    async fn removed_event_is_stopped() {
        let schedule = Arc::new(SwitchableSchedule::default());
        schedule.events.lock().push(event("Event A", 0));
        let mut f = fixture(schedule.clone(), ScriptedFactory::new());

        f.monitor.poll_once(at(0)).await.unwrap();
        schedule.events.lock().clear();

        let transition = f.monitor.poll_once(at(30)).await.unwrap();
        assert!(matches!(transition, Transition::Stopped { reason: StopReason::Removed, .. }));
        assert!(f.store.active_sessions().is_empty());
    }

    #[tokio::test]
    async fn source_construction_failure_is_a_poll_failure() {
        let mut factory = ScriptedFactory::new();
        factory.fail = true;
        let mut f = fixture(static_schedule(vec![event("Event A", 0)]), factory);

        assert!(f.monitor.poll_once(at(0)).await.is_err());
        assert_eq!(f.monitor.state(), MonitorState::Watching);
        assert!(f.store.races().is_empty());
        assert!(!f.monitor.status().scraping);
    }

    #[tokio::test]
    async fn start_deactivates_stale_records() {
        let mut f = fixture(static_schedule(vec![event("Event A", 0)]), ScriptedFactory::new());
        let stale = f.store.begin(&event("Old Race", -2000), at(-2000)).await.unwrap();

        f.monitor.poll_once(at(0)).await.unwrap();
        let active = f.store.active_sessions();
        assert_eq!(active.len(), 1);
        assert_ne!(active[0], stale);
        f.monitor.shutdown().await;
    }

    #[tokio::test]
    async fn shutdown_ends_and_exports_once() {
        let mut f = fixture(static_schedule(vec![event("Event A", 0)]), ScriptedFactory::new());
        f.monitor.poll_once(at(0)).await.unwrap();

        f.monitor.shutdown().await;
        f.monitor.shutdown().await;

        assert_eq!(f.exporter.exported.lock().len(), 1);
        assert!(f.store.active_sessions().is_empty());
        let status = f.monitor.status();
        assert!(!status.monitoring);
        assert!(!status.scraping);
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_monitor_stops_with_export() {
        let now = Utc::now();
        let live = ScheduledEvent::new("Live Race", Series::Wec, "Circuit", now - TimeDelta::minutes(10));
        let Fixture { monitor, store, exporter, .. } =
            fixture(static_schedule(vec![live]), ScriptedFactory::new());
        let mut handle = monitor.spawn();

        tokio::time::sleep(Duration::from_secs(1)).await;
        let status = handle.status();
        assert!(status.monitoring);
        assert!(status.scraping);
        assert_eq!(status.current_event.as_deref(), Some("Live Race"));

        assert!(handle.stop_monitoring().await);
        assert!(!handle.stop_monitoring().await);

        assert_eq!(exporter.exported.lock().len(), 1);
        assert!(store.active_sessions().is_empty());
        let status = handle.status();
        assert!(!status.monitoring);
        assert!(!status.scraping);
    }

    /// Exporter whose artifact can never be written.
    #[derive(Default)]
    struct FailingExporter {
        attempts: Mutex<Vec<SessionId>>,
    }

    #[async_trait::async_trait]
    impl SessionExporter for FailingExporter {
        async fn export_session(&self, id: SessionId) -> Result<PathBuf> {
            self.attempts.lock().push(id);
            Err(TrackerError::export("/readonly/race.json", std::io::Error::other("read-only file system")))
        }
    }

    #[tokio::test]
    async fn export_failure_still_ends_the_session() {
        let store = RaceStore::new();
        let exporter = Arc::new(FailingExporter::default());
        let mut monitor = RaceMonitor::new(
            static_schedule(vec![event("Event A", 0), event("Event B", 1000)]),
            Arc::new(ScriptedFactory::new()),
            Arc::new(store.clone()),
            exporter.clone(),
            MonitorSettings::default(),
        );

        monitor.poll_once(at(0)).await.unwrap();
        let transition = monitor.poll_once(at(721)).await.unwrap();
        let Transition::Stopped { session, export, .. } = transition else {
            panic!("expected Stopped, got {transition:?}");
        };
        assert_eq!(export, None);
        assert_eq!(*exporter.attempts.lock(), vec![session]);

        let race = &store.races()[0];
        assert!(!race.is_active);
        assert!(race.ended_at.is_some());
        assert_eq!(monitor.state(), MonitorState::Watching);

        let transition = monitor.poll_once(at(1000)).await.unwrap();
        assert!(matches!(transition, Transition::Started { ref event, .. } if event.name == "Event B"));
        assert_eq!(store.active_sessions().len(), 1);
        monitor.shutdown().await;
    }

    /// Schedule that fails its first loads and records when each load ran.
    struct FlakySchedule {
        failures_left: Mutex<u32>,
        loads: Mutex<Vec<tokio::time::Instant>>,
    }

    #[async_trait::async_trait]
    impl ScheduleSource for FlakySchedule {
        async fn load(&self) -> Result<Schedule> {
            self.loads.lock().push(tokio::time::Instant::now());
            let mut failures_left = self.failures_left.lock();
            if *failures_left > 0 {
                *failures_left -= 1;
                return Err(TrackerError::schedule("unreachable", None));
            }
            Ok(Schedule::new(Vec::new()))
        }
    }

    #[tokio::test(start_paused = true)]
    async fn failed_poll_retries_on_shorter_interval() {
        let schedule = Arc::new(FlakySchedule { failures_left: Mutex::new(1), loads: Mutex::new(Vec::new()) });
        let settings = MonitorSettings::default();
        let Fixture { monitor, .. } = fixture(schedule.clone(), ScriptedFactory::new());
        let started = tokio::time::Instant::now();
        let mut handle = monitor.spawn();

        tokio::time::sleep(settings.retry_interval + settings.poll_interval + Duration::from_secs(30)).await;
        assert!(handle.stop_monitoring().await);

        let offsets: Vec<Duration> = schedule.loads.lock().iter().map(|t| *t - started).collect();
        assert_eq!(offsets.len(), 3, "unexpected load times {offsets:?}");
        let tolerance = Duration::from_secs(1);
        assert!(offsets[0] < tolerance);
        assert!(offsets[1].abs_diff(settings.retry_interval) < tolerance);
        assert!(offsets[2].abs_diff(settings.retry_interval + settings.poll_interval) < tolerance);
    }
}
