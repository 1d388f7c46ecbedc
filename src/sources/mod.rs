//! Snapshot source variants and series dispatch
//!
//! Two variants implement [`SnapshotSource`]:
//! - [`HttpTimingSource`] downloads a server-rendered page
//! - [`BrowserTimingSource`] renders a JavaScript page in headless Chromium
//!
//! Which one an event gets is decided once, when its session starts, by
//! looking up the event's series in a closed table ([`SourceKind::for_series`]).

mod browser;
mod http;
mod table;

pub use browser::BrowserTimingSource;
pub use http::HttpTimingSource;
pub use table::{TableLayout, TableParser};

use std::fmt;
use std::time::Duration;

use tracing::debug;

use crate::Result;
use crate::source::SnapshotSource;
use crate::types::{ScheduledEvent, Series};

/// User-Agent sent when none is configured.
pub const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/130.0 Safari/537.36";

/// Browser executable used when none is configured.
pub const DEFAULT_BROWSER_BINARY: &str = "chromium";

/// The closed set of source variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    HttpFetch,
    HeadlessBrowser,
}

impl SourceKind {
    /// Variant used for a series' timing page.
    pub fn for_series(series: Series) -> Self {
        match series {
            Series::Wec => SourceKind::HttpFetch,
            Series::Imsa => SourceKind::HeadlessBrowser,
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::HttpFetch => f.write_str("http"),
            SourceKind::HeadlessBrowser => f.write_str("browser"),
        }
    }
}

/// Settings shared by every source a factory builds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    /// Bound on one fetch or render
    pub fetch_timeout: Duration,
    pub user_agent: String,
    pub browser_binary: String,
    /// Arguments placed before the browser flags
    pub browser_args: Vec<String>,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            browser_binary: DEFAULT_BROWSER_BINARY.to_string(),
            browser_args: Vec::new(),
        }
    }
}

/// Builds the snapshot source for an event.
pub trait SourceFactory: Send + Sync + 'static {
    fn create(&self, event: &ScheduledEvent) -> Result<Box<dyn SnapshotSource>>;
}

/// Factory that picks the variant from the event's series.
#[derive(Debug, Clone, Default)]
pub struct SeriesSourceFactory {
    settings: SourceSettings,
}

impl SeriesSourceFactory {
    pub fn new(settings: SourceSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &SourceSettings {
        &self.settings
    }
}

impl SourceFactory for SeriesSourceFactory {
    fn create(&self, event: &ScheduledEvent) -> Result<Box<dyn SnapshotSource>> {
        let parser = TableParser::for_series(event.series)?;
        let kind = SourceKind::for_series(event.series);
        let settings = &self.settings;
        debug!(event = %event.name, series = %event.series, %kind, "Creating snapshot source");

        Ok(match kind {
            SourceKind::HttpFetch => Box::new(HttpTimingSource::new(
                &event.source_endpoint,
                parser,
                settings.fetch_timeout,
                &settings.user_agent,
            )),
            SourceKind::HeadlessBrowser => Box::new(
                BrowserTimingSource::new(
                    &event.source_endpoint,
                    parser,
                    settings.fetch_timeout,
                    &settings.user_agent,
                    &settings.browser_binary,
                )
                .with_launcher_args(settings.browser_args.clone()),
            ),
        })
    }
}
