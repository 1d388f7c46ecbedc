//! Plain HTTP timing source

use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, trace};

use super::table::TableParser;
use crate::source::SnapshotSource;
use crate::types::{Series, Snapshot};
use crate::{Result, TrackerError};

/// Source that downloads a server-rendered timing page and parses it.
pub struct HttpTimingSource {
    /// Timing page URL
    endpoint: String,

    /// Row and cell extraction for the page
    parser: TableParser,

    /// Bound on one fetch
    timeout: Duration,

    /// User-Agent header sent with every request
    user_agent: String,

    /// HTTP session, present while open
    client: Option<Client>,
}

impl HttpTimingSource {
    pub fn new(
        endpoint: impl Into<String>,
        parser: TableParser,
        timeout: Duration,
        user_agent: impl Into<String>,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            parser,
            timeout,
            user_agent: user_agent.into(),
            client: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn is_open(&self) -> bool {
        self.client.is_some()
    }

    async fn fetch_page(&self, client: &Client) -> Result<String> {
        let response = client.get(&self.endpoint).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(TrackerError::HttpStatus {
                status: status.as_u16(),
                url: self.endpoint.clone(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait::async_trait]
impl SnapshotSource for HttpTimingSource {
    async fn open(&mut self) -> Result<()> {
        if self.client.is_some() {
            return Ok(());
        }

        let client = Client::builder()
            .user_agent(self.user_agent.clone())
            .timeout(self.timeout)
            .build()
            .map_err(|e| TrackerError::transport_with_source("cannot build HTTP client", Box::new(e)))?;

        info!(series = %self.parser.series(), endpoint = %self.endpoint, "Opened HTTP timing session");
        self.client = Some(client);
        Ok(())
    }

    async fn fetch_snapshot(&mut self) -> Result<Snapshot> {
        let client = self
            .client
            .as_ref()
            .ok_or_else(|| TrackerError::SourceNotOpen { kind: self.kind().to_string() })?;

        let html = match tokio::time::timeout(self.timeout, self.fetch_page(client)).await {
            Ok(result) => result?,
            Err(_) => return Err(TrackerError::Timeout { duration: self.timeout }),
        };
        trace!(bytes = html.len(), "Fetched timing page");

        let snapshot = self.parser.parse(&html)?;
        debug!(series = %snapshot.series, cars = snapshot.cars.len(), "Parsed timing snapshot");
        Ok(snapshot)
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            info!(series = %self.parser.series(), "Closed HTTP timing session");
        } else {
            debug!(series = %self.parser.series(), "HTTP timing session already closed");
        }
    }

    fn series(&self) -> Series {
        self.parser.series()
    }

    fn kind(&self) -> &'static str {
        "http"
    }
}
