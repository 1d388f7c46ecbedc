//! Error types for race tracking.
//!
//! Every fallible operation in the crate returns [`TrackerError`]. Errors carry
//! structured context and classify themselves so callers can decide between
//! retrying and giving up.
//!
//! ## Error Categories
//!
//! - **Transport Errors**: network failures, timeouts and non-success statuses
//!   while fetching a timing page. The ingestion loop retries these forever.
//! - **Document Errors**: the timing page was fetched but the timing table
//!   could not be located at all.
//! - **Schedule Errors**: the race schedule could not be loaded. The monitor
//!   retries these on its shorter backoff interval.
//! - **Export Errors**: the race export artifact could not be written. These
//!   are logged and never retried.
//!
//! A single malformed field inside a timing row is *not* an error: it becomes
//! an absent value on the [`CarRecord`](crate::CarRecord).
//!
//! ## Recovery and Retry
//!
//! ```rust
//! use stintwatch::TrackerError;
//!
//! let error = TrackerError::transport("connection refused");
//! if error.is_retryable() {
//!     for suggestion in error.recovery_suggestions() {
//!         println!("  - {}", suggestion);
//!     }
//! }
//! ```

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::types::SessionId;

/// Result type alias for race tracking operations.
pub type Result<T, E = TrackerError> = std::result::Result<T, E>;

/// Boxed source error carried by several variants.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for race tracking operations.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum TrackerError {
    #[error("Transport failure: {reason}")]
    Transport {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Timing endpoint {url} returned status {status}")]
    HttpStatus { status: u16, url: String },

    #[error("Operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    #[error("Timing document error in {context}: {details}")]
    DocumentStructure { context: String, details: String },

    #[error("{kind} source used before open()")]
    SourceNotOpen { kind: String },

    #[error("Headless browser failure: {reason}")]
    BrowserProcess {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Schedule unavailable: {reason}")]
    Schedule {
        reason: String,
        #[source]
        source: Option<BoxError>,
    },

    #[error("Race export failed: {path}")]
    Export {
        path: PathBuf,
        #[source]
        source: BoxError,
    },

    #[error("Unknown race session {id}")]
    UnknownSession { id: SessionId },

    #[error("Invalid configuration: {reason}")]
    Config { reason: String },

    #[error("I/O error")]
    Io(#[from] std::io::Error),

    #[error("YAML error")]
    Yaml(#[from] serde_yaml_ng::Error),

    #[error("JSON error")]
    Json(#[from] serde_json::Error),
}

impl TrackerError {
    /// Returns whether this error is potentially recoverable through retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            TrackerError::Transport { .. } => true,
            TrackerError::HttpStatus { status, .. } => *status >= 500 || *status == 429,
            TrackerError::Timeout { .. } => true,
            TrackerError::DocumentStructure { .. } => true,
            TrackerError::SourceNotOpen { .. } => true,
            TrackerError::BrowserProcess { .. } => true,
            TrackerError::Schedule { .. } => true,
            TrackerError::Export { .. } => false,
            TrackerError::UnknownSession { .. } => false,
            TrackerError::Config { .. } => false,
            TrackerError::Io(_) => true,
            TrackerError::Yaml(_) => false,
            TrackerError::Json(_) => false,
        }
    }

    /// Returns suggested recovery actions for this error.
    pub fn recovery_suggestions(&self) -> Vec<&'static str> {
        match self {
            TrackerError::Transport { .. } | TrackerError::Timeout { .. } => vec![
                "Check network connectivity to the timing provider",
                "Increase the fetch timeout",
                "Wait for the next ingestion attempt",
            ],
            TrackerError::HttpStatus { .. } => vec![
                "Verify the timing endpoint URL for this event",
                "Check whether the provider is rate limiting requests",
            ],
            TrackerError::DocumentStructure { .. } => vec![
                "Check whether the timing page layout has changed",
                "Verify the provider has published live timing for this session",
            ],
            TrackerError::SourceNotOpen { .. } => {
                vec!["Call open() before fetching", "Let the ingestion loop manage the source"]
            }
            TrackerError::BrowserProcess { .. } => vec![
                "Install Chromium or set CHROME_PATH",
                "Check that the browser can run headless in this environment",
            ],
            TrackerError::Schedule { .. } => vec![
                "Check the schedule file exists and is readable",
                "Validate the schedule YAML against the documented format",
            ],
            TrackerError::Export { .. } => vec![
                "Check the export directory is writable",
                "Ensure sufficient disk space",
            ],
            TrackerError::UnknownSession { .. } => {
                vec!["Use the session id returned when the session began"]
            }
            TrackerError::Config { .. } => {
                vec!["Fix the configuration value named in the error", "Review the defaults"]
            }
            TrackerError::Io(_) => vec!["Check file permissions", "Ensure sufficient disk space"],
            TrackerError::Yaml(_) | TrackerError::Json(_) => {
                vec!["Check the document syntax", "Compare against the documented format"]
            }
        }
    }

    /// Helper constructor for transport errors.
    pub fn transport(reason: impl Into<String>) -> Self {
        TrackerError::Transport { reason: reason.into(), source: None }
    }

    /// Helper constructor for transport errors with source.
    pub fn transport_with_source(reason: impl Into<String>, source: BoxError) -> Self {
        TrackerError::Transport { reason: reason.into(), source: Some(source) }
    }

    /// Helper constructor for missing timing document structure.
    pub fn document_structure(context: impl Into<String>, details: impl Into<String>) -> Self {
        TrackerError::DocumentStructure { context: context.into(), details: details.into() }
    }

    /// Helper constructor for headless browser failures.
    pub fn browser(reason: impl Into<String>, source: Option<BoxError>) -> Self {
        TrackerError::BrowserProcess { reason: reason.into(), source }
    }

    /// Helper constructor for schedule errors.
    pub fn schedule(reason: impl Into<String>, source: Option<BoxError>) -> Self {
        TrackerError::Schedule { reason: reason.into(), source }
    }

    /// Helper constructor for export errors.
    pub fn export(path: impl Into<PathBuf>, source: impl Into<BoxError>) -> Self {
        TrackerError::Export { path: path.into(), source: source.into() }
    }

    /// Helper constructor for configuration errors.
    pub fn config(reason: impl Into<String>) -> Self {
        TrackerError::Config { reason: reason.into() }
    }
}

impl From<reqwest::Error> for TrackerError {
    fn from(err: reqwest::Error) -> Self {
        if let Some(status) = err.status() {
            let url = err.url().map(|u| u.to_string()).unwrap_or_default();
            return TrackerError::HttpStatus { status: status.as_u16(), url };
        }
        let reason = if err.is_timeout() {
            "request timed out"
        } else if err.is_connect() {
            "connection failed"
        } else if err.is_body() || err.is_decode() {
            "response body could not be read"
        } else {
            "request failed"
        };
        TrackerError::transport_with_source(reason, Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    mod property_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
          #[test]
          fn error_messages_carry_their_context(
            reason in ".*",
            status in 100u16..600u16,
            url in "https?://[a-z]{1,12}\\.[a-z]{2,3}/[a-z]*",
            duration_ms in 1u64..60000u64
          ) {
            let transport = TrackerError::transport(reason.clone());
            prop_assert!(transport.to_string().contains(&reason));

            let status_err = TrackerError::HttpStatus { status, url: url.clone() };
            let msg = status_err.to_string();
            prop_assert!(msg.contains(&status.to_string()));
            prop_assert!(msg.contains(&url));

            let timeout = TrackerError::Timeout { duration: Duration::from_millis(duration_ms) };
            prop_assert!(!timeout.to_string().is_empty());
            prop_assert!(timeout.is_retryable());
          }

          #[test]
          fn server_side_statuses_are_retryable(status in 500u16..600u16) {
            let err = TrackerError::HttpStatus { status, url: String::new() };
            prop_assert!(err.is_retryable());
          }

          #[test]
          fn source_chain_is_preserved(base_message in "[a-z ]{1,40}") {
            let err = TrackerError::transport_with_source(
                "fetch failed",
                Box::new(std::io::Error::other(base_message.clone())),
            );
            let source = std::error::Error::source(&err).map(|s| s.to_string());
            prop_assert_eq!(source, Some(base_message));
          }
        }
    }

    #[test]
    fn error_constructors_validation() {
        assert!(matches!(TrackerError::transport("x"), TrackerError::Transport { .. }));
        assert!(matches!(
            TrackerError::document_structure("table", "missing"),
            TrackerError::DocumentStructure { .. }
        ));
        assert!(matches!(TrackerError::schedule("gone", None), TrackerError::Schedule { .. }));
        assert!(matches!(TrackerError::config("bad"), TrackerError::Config { .. }));
        assert!(matches!(
            TrackerError::export("/tmp/x.json", std::io::Error::other("full")),
            TrackerError::Export { .. }
        ));
    }

    #[test]
    fn error_traits_validation() {
        fn assert_send_sync_static<T: Send + Sync + 'static>() {}
        assert_send_sync_static::<TrackerError>();

        let error = TrackerError::transport("test");
        let _: &dyn std::error::Error = &error;
    }

    #[test]
    fn retry_classification() {
        assert!(TrackerError::transport("x").is_retryable());
        assert!(TrackerError::schedule("x", None).is_retryable());
        assert!(!TrackerError::HttpStatus { status: 404, url: String::new() }.is_retryable());
        assert!(!TrackerError::config("x").is_retryable());
        assert!(!TrackerError::export("a", std::io::Error::other("b")).is_retryable());

        for suggestion in TrackerError::transport("x").recovery_suggestions() {
            assert!(suggestion.len() > 5);
        }
    }

    #[test]
    fn from_conversions_work() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "schedule.yaml");
        let err: TrackerError = io_err.into();
        assert!(matches!(err, TrackerError::Io(_)));

        let yaml_err = serde_yaml_ng::from_str::<Vec<u32>>("{not: [a list").unwrap_err();
        let err: TrackerError = yaml_err.into();
        assert!(matches!(err, TrackerError::Yaml(_)));
    }
}
