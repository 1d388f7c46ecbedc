//! Snapshot source trait for timing pages

use crate::Result;
use crate::types::{Series, Snapshot};

/// Trait for live timing data sources
///
/// A source owns whatever resource it needs to read its timing page (an HTTP
/// client, a headless browser profile) and turns one fetch into one
/// [`Snapshot`]. The ingestion loop drives the lifecycle:
/// `open()` once, `fetch_snapshot()` repeatedly, `close()` once.
#[async_trait::async_trait]
pub trait SnapshotSource: Send + 'static {
    /// Acquire the underlying resources.
    ///
    /// Calling this on an already open source is a no-op.
    async fn open(&mut self) -> Result<()>;

    /// Perform one fetch and parse cycle.
    ///
    /// Returns:
    /// - `Ok(snapshot)` - page fetched; rows may be partially populated and the
    ///   car list may be empty
    /// - `Err(e)` - transport failure, timeout, non-success status, or the
    ///   timing table could not be found at all
    async fn fetch_snapshot(&mut self) -> Result<Snapshot>;

    /// Release the underlying resources.
    ///
    /// Safe to call on a source that is already closed or was never opened.
    async fn close(&mut self);

    /// Series whose timing page this source reads.
    fn series(&self) -> Series;

    /// Short label for logs, e.g. `"http"` or `"browser"`.
    fn kind(&self) -> &'static str;
}
