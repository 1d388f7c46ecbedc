//! Test helpers shared by unit tests and benches
//!
//! - [`timing_page`] renders a timing page in a series' layout
//! - [`ScriptedSource`] replays a fixed sequence of fetch outcomes
//! - [`RecordingSink`] keeps every delivered snapshot

#![cfg(any(test, feature = "benchmark"))]

use std::collections::VecDeque;
use std::fmt::Write as _;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use parking_lot::Mutex;

use crate::ingest::SnapshotSink;
use crate::source::SnapshotSource;
use crate::sources::TableLayout;
use crate::types::{CarRecord, Series, Snapshot};
use crate::{Result, TrackerError};

/// One row of a rendered timing page.
#[derive(Debug, Clone)]
pub struct TimingRow {
    pub car_number: String,
    pub team: String,
    pub class: String,
    pub position: u32,
    pub laps: Option<u32>,
    pub last_lap: String,
    pub best_lap: String,
    /// Display text of the gap cell; empty omits the cell
    pub gap: String,
    pub in_pit: bool,
}

impl TimingRow {
    /// Row with every column filled; last and best lap share `lap_text`.
    pub fn full(
        car_number: &str,
        team: &str,
        class: &str,
        position: u32,
        lap_text: &str,
        gap_text: &str,
    ) -> Self {
        Self {
            car_number: car_number.to_string(),
            team: team.to_string(),
            class: class.to_string(),
            position,
            laps: None,
            last_lap: lap_text.to_string(),
            best_lap: lap_text.to_string(),
            gap: gap_text.to_string(),
            in_pit: false,
        }
    }

    pub fn laps(mut self, laps: u32) -> Self {
        self.laps = Some(laps);
        self
    }

    pub fn in_pit(mut self) -> Self {
        self.in_pit = true;
        self
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;").replace('"', "&quot;")
}

/// Render rows as a page in the layout of `series`.
///
/// The output never contains single quotes, so it can be embedded in a
/// single-quoted shell string.
pub fn timing_page(series: Series, rows: &[TimingRow]) -> String {
    let layout = TableLayout::for_series(series);
    let mut html = String::from("<html><head><title>Live Timing</title></head><body>\n");
    let _ = writeln!(html, "<div class=\"{}\"><table>", layout.table_marker);
    html.push_str("<tr class=\"header\"><th>Pos</th><th>#</th><th>Team</th></tr>\n");

    for row in rows {
        let row_class = match (row.in_pit, layout.pit_row_class) {
            (true, Some(pit)) => format!("{} {}", layout.row_class, pit),
            _ => layout.row_class.to_string(),
        };
        let _ = write!(html, "<tr class=\"{row_class}\">");

        let mut cell = |class: &str, text: &str| {
            let _ = write!(html, "<td class=\"{}\">{}</td>", class, escape(text));
        };
        cell(layout.position, &row.position.to_string());
        cell(layout.car_number, &row.car_number);
        cell(layout.team, &row.team);
        cell(layout.class, &row.class);
        cell(layout.laps, &row.laps.map(|l| l.to_string()).unwrap_or_default());
        cell(layout.last_lap, &row.last_lap);
        cell(layout.best_lap, &row.best_lap);
        if let Some(gap) = layout.gap.filter(|_| !row.gap.is_empty()) {
            cell(gap, &row.gap);
        }

        html.push_str("</tr>\n");
    }

    html.push_str("</table></div></body></html>\n");
    html
}

/// `count` cars in position order, all fields present.
pub fn sample_cars(count: usize) -> Vec<CarRecord> {
    (1..=count)
        .map(|i| CarRecord {
            car_number: format!("{}", i * 10),
            team: Some(format!("Team {i}")),
            class: Some("HYPERCAR".to_string()),
            position: Some(i as u32),
            laps_completed: Some(100),
            last_lap_time: Some(210.0 + i as f64),
            best_lap_time: Some(208.0 + i as f64),
            gap_to_leader: Some((i - 1) as f64 * 1.5),
            in_pit: Some(false),
        })
        .collect()
}

/// Call counters of a [`ScriptedSource`], readable after the source moved.
#[derive(Debug, Default)]
pub struct SourceProbe {
    opens: AtomicUsize,
    fetches: AtomicUsize,
    closes: AtomicUsize,
}

impl SourceProbe {
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }
}

/// Source that replays queued outcomes, then returns empty snapshots.
pub struct ScriptedSource {
    series: Series,
    script: VecDeque<Result<Snapshot>>,
    failing_opens: usize,
    probe: Arc<SourceProbe>,
}

impl ScriptedSource {
    pub fn new(series: Series) -> Self {
        Self {
            series,
            script: VecDeque::new(),
            failing_opens: 0,
            probe: Arc::new(SourceProbe::default()),
        }
    }

    pub fn then_fail(mut self) -> Self {
        self.script.push_back(Err(TrackerError::transport("scripted failure")));
        self
    }

    pub fn then_cars(mut self, count: usize) -> Self {
        self.script.push_back(Ok(Snapshot::new(self.series, sample_cars(count))));
        self
    }

    pub fn then_snapshot(mut self, snapshot: Snapshot) -> Self {
        self.script.push_back(Ok(snapshot));
        self
    }

    /// Fail the first `count` calls to `open()`.
    pub fn failing_opens(mut self, count: usize) -> Self {
        self.failing_opens = count;
        self
    }

    pub fn probe(&self) -> Arc<SourceProbe> {
        self.probe.clone()
    }
}

#[async_trait::async_trait]
impl SnapshotSource for ScriptedSource {
    async fn open(&mut self) -> Result<()> {
        let attempt = self.probe.opens.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failing_opens {
            return Err(TrackerError::transport("scripted open failure"));
        }
        Ok(())
    }

    async fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        self.probe.fetches.fetch_add(1, Ordering::SeqCst);
        self.script.pop_front().unwrap_or_else(|| Ok(Snapshot::new(self.series, Vec::new())))
    }

    async fn close(&mut self) {
        self.probe.closes.fetch_add(1, Ordering::SeqCst);
    }

    fn series(&self) -> Series {
        self.series
    }

    fn kind(&self) -> &'static str {
        "scripted"
    }
}

/// Sink that stores every snapshot it receives.
#[derive(Debug, Default)]
pub struct RecordingSink {
    snapshots: Mutex<Vec<Snapshot>>,
}

impl RecordingSink {
    pub fn count(&self) -> usize {
        self.snapshots.lock().len()
    }

    pub fn snapshots(&self) -> Vec<Snapshot> {
        self.snapshots.lock().clone()
    }
}

#[async_trait::async_trait]
impl SnapshotSink for RecordingSink {
    async fn on_snapshot(&self, snapshot: Snapshot) {
        self.snapshots.lock().push(snapshot);
    }
}
