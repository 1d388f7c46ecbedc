//! Autonomous live-timing monitor for endurance races.
//!
//! stintwatch watches a race calendar, notices when an event goes live,
//! runs a fixed-interval ingestion loop against that event's timing page
//! for as long as the race lasts, and exports the recorded race when it
//! ends. It runs unattended for weeks: fetch failures are retried forever,
//! schedule failures are retried on a short backoff, and at most one race
//! is ever being ingested.
//!
//! # Features
//!
//! - **Lifecycle monitor**: `WATCHING ⇄ LIVE` state machine driven by a liveness window
//! - **Ingestion loop**: fixed-interval fetch, retry-forever, prompt cancellation
//! - **Two source variants**: plain HTTP and headless-browser rendering, chosen by series
//! - **Race recorder**: lap history and pit stops derived from snapshots, exported as JSON
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use stintwatch::{
//!     JsonExporter, MonitorSettings, RaceMonitor, RaceStore, SeriesSourceFactory, StaticSchedule,
//! };
//!
//! #[tokio::main]
//! async fn main() {
//!     let store = RaceStore::new();
//!     let monitor = RaceMonitor::new(
//!         Arc::new(StaticSchedule::builtin()),
//!         Arc::new(SeriesSourceFactory::default()),
//!         Arc::new(store.clone()),
//!         Arc::new(JsonExporter::new(store, "race_exports")),
//!         MonitorSettings::default(),
//!     );
//!
//!     let mut handle = monitor.spawn();
//!     println!("{:?}", handle.status());
//!
//!     tokio::signal::ctrl_c().await.ok();
//!     handle.stop_monitoring().await;
//! }
//! ```

// Core types and error handling
pub mod config;
mod error;
#[cfg(any(test, feature = "benchmark"))]
pub mod test_utils;
pub mod timing;
pub mod types;

// Schedule and timing sources
pub mod schedule;
pub mod source;
pub mod sources;

// Ingestion, recording and lifecycle
pub mod export;
pub mod ingest;
pub mod monitor;
pub mod store;

// Core exports
pub use config::TrackerConfig;
pub use error::*;
pub use types::*;

// Component exports
pub use export::{JsonExporter, RaceExport, SessionExporter};
pub use ingest::{IngestCounters, IngestStats, IngestionLoop, SnapshotSink};
pub use monitor::{MonitorHandle, MonitorSettings, MonitorState, MonitorStatus, RaceMonitor, Transition};
pub use schedule::{Schedule, ScheduleSource, StaticSchedule, YamlScheduleFile};
pub use source::SnapshotSource;
pub use sources::{SeriesSourceFactory, SourceFactory, SourceKind, SourceSettings};
pub use store::{RaceStore, SessionStore};
