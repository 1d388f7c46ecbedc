//! Timing text conversion
//!
//! Live timing pages render numbers as display strings. This module turns
//! those strings into numbers without ever failing: text that matches none of
//! the known shapes yields `None`.
//!
//! Recognized shapes:
//! - `"M:SS.mmm"` → `M * 60 + SS.mmm` seconds
//! - a plain number (an optional leading `+` is allowed for gaps)
//! - `"+N LAP"` / `"+N LAPS"` → `N * LAP_GAP_PROXY_SECS`
//! - the leader token (`"Leader"`) → `0.0`

use std::sync::LazyLock;

use regex::Regex;

/// Seconds standing in for "one full lap" when a gap is displayed in laps.
///
/// This is an approximation, not a timing value: it only needs to order a
/// lapped car behind every car on the lead lap.
pub const LAP_GAP_PROXY_SECS: f64 = 100.0;

/// Token a timing page shows in the gap column of the race leader.
pub const NO_GAP_TOKEN: &str = "Leader";

static MINUTES_SECONDS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+):(\d{1,2}(?:\.\d+)?)$").unwrap());

static PLAIN_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)?$").unwrap());

static LAPS_BEHIND: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\+?\s*(\d+)\s*LAPS?$").unwrap());

/// Parse a lap time such as `"3:27.456"` or `"207.456"` into seconds.
pub fn parse_lap_time(text: &str) -> Option<f64> {
    let text = text.trim();

    if let Some(caps) = MINUTES_SECONDS.captures(text) {
        let minutes: f64 = caps[1].parse().ok()?;
        let seconds: f64 = caps[2].parse().ok()?;
        return Some(minutes * 60.0 + seconds);
    }

    if PLAIN_NUMBER.is_match(text) {
        return text.parse().ok();
    }

    None
}

/// Parse a gap to the leader into seconds.
///
/// Accepts everything [`parse_lap_time`] accepts, optionally prefixed with
/// `+`, plus lap-count gaps and the leader token.
pub fn parse_gap(text: &str) -> Option<f64> {
    let text = text.trim();

    if text.eq_ignore_ascii_case(NO_GAP_TOKEN) {
        return Some(0.0);
    }

    if let Some(caps) = LAPS_BEHIND.captures(text) {
        let laps: u32 = caps[1].parse().ok()?;
        return Some(f64::from(laps) * LAP_GAP_PROXY_SECS);
    }

    parse_lap_time(text.strip_prefix('+').unwrap_or(text))
}

/// Parse a whole, non-negative count such as a position or lap total.
pub fn parse_count(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}
