//! Timing table extraction
//!
//! Timing providers render the classification as an HTML table whose rows and
//! cells are tagged with CSS classes. A [`TableLayout`] names those classes
//! and a [`TableParser`] pulls one [`CarRecord`] out of each row.
//!
//! Extraction is field by field. A cell that is missing or unreadable only
//! makes that field absent; the page as a whole fails only when the timing
//! table itself cannot be found.

use std::sync::LazyLock;

use chrono::Utc;
use regex::Regex;
use tracing::{debug, trace};

use crate::timing::{parse_count, parse_gap, parse_lap_time};
use crate::types::{CarRecord, Series, Snapshot};
use crate::{Result, TrackerError};

static ROW_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<tr\b([^>]*)>(.*?)</tr>").unwrap());

static TAG_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());

static WHITESPACE_REGEX: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").unwrap());

/// CSS class names that locate the timing table and its cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableLayout {
    /// Class on the element wrapping the whole table
    pub table_marker: &'static str,
    /// Class on every car row
    pub row_class: &'static str,
    /// Extra row class present while the car is in the pit lane
    pub pit_row_class: Option<&'static str>,
    pub car_number: &'static str,
    pub team: &'static str,
    pub class: &'static str,
    pub position: &'static str,
    pub laps: &'static str,
    pub last_lap: &'static str,
    pub best_lap: &'static str,
    /// Gap column, when the page has one
    pub gap: Option<&'static str>,
}

impl TableLayout {
    /// Layout of the WEC (Al Kamel) timing page.
    pub fn wec() -> Self {
        Self {
            table_marker: "timing-table",
            row_class: "timing-row",
            pit_row_class: Some("pit"),
            car_number: "car-number",
            team: "team-name",
            class: "class",
            position: "position",
            laps: "laps",
            last_lap: "last-lap",
            best_lap: "best-lap",
            gap: Some("gap"),
        }
    }

    /// Layout of the IMSA scoring page.
    pub fn imsa() -> Self {
        Self {
            table_marker: "timing-table",
            row_class: "timing-row",
            pit_row_class: None,
            car_number: "car-number",
            team: "team",
            class: "class",
            position: "pos",
            laps: "laps",
            last_lap: "last",
            best_lap: "best",
            gap: None,
        }
    }

    /// Layout for a series.
    pub fn for_series(series: Series) -> Self {
        match series {
            Series::Wec => Self::wec(),
            Series::Imsa => Self::imsa(),
        }
    }
}

/// Regex matching a `class="..."` attribute that contains `name` as a whole class.
fn class_attr_pattern(name: &str) -> String {
    format!(r#"class\s*=\s*["'](?:[^"']*\s)?{}(?:\s[^"']*)?["']"#, regex::escape(name))
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| TrackerError::config(format!("invalid timing layout pattern: {e}")))
}

fn cell_regex(name: &str) -> Result<Regex> {
    compile(&format!(
        r"(?is)<(?:td|th|span|div)\b[^>]*{}[^>]*>(.*?)</(?:td|th|span|div)>",
        class_attr_pattern(name)
    ))
}

/// Reduce cell HTML to its display text.
fn cell_text(html: &str) -> Option<String> {
    let text = TAG_REGEX.replace_all(html, " ");
    let text = text
        .replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&amp;", "&");
    let text = WHITESPACE_REGEX.replace_all(text.trim(), " ");
    if text.is_empty() { None } else { Some(text.into_owned()) }
}

/// Compiled extractor for one [`TableLayout`].
#[derive(Debug, Clone)]
pub struct TableParser {
    series: Series,
    table_marker: Regex,
    row: Regex,
    pit_row: Option<Regex>,
    car_number: Regex,
    team: Regex,
    class: Regex,
    position: Regex,
    laps: Regex,
    last_lap: Regex,
    best_lap: Regex,
    gap: Option<Regex>,
}

impl TableParser {
    /// Compile the patterns for a layout.
    pub fn new(series: Series, layout: &TableLayout) -> Result<Self> {
        Ok(Self {
            series,
            table_marker: compile(&class_attr_pattern(layout.table_marker))?,
            row: compile(&class_attr_pattern(layout.row_class))?,
            pit_row: layout.pit_row_class.map(|c| compile(&class_attr_pattern(c))).transpose()?,
            car_number: cell_regex(layout.car_number)?,
            team: cell_regex(layout.team)?,
            class: cell_regex(layout.class)?,
            position: cell_regex(layout.position)?,
            laps: cell_regex(layout.laps)?,
            last_lap: cell_regex(layout.last_lap)?,
            best_lap: cell_regex(layout.best_lap)?,
            gap: layout.gap.map(cell_regex).transpose()?,
        })
    }

    /// Parser for a series' built-in layout.
    pub fn for_series(series: Series) -> Result<Self> {
        Self::new(series, &TableLayout::for_series(series))
    }

    pub fn series(&self) -> Series {
        self.series
    }

    fn cell(pattern: &Regex, row_html: &str) -> Option<String> {
        pattern.captures(row_html).and_then(|caps| cell_text(&caps[1]))
    }

    /// Extract one car from a row.
    ///
    /// Rows without a readable car number are skipped.
    fn parse_row(&self, attrs: &str, row_html: &str) -> Option<CarRecord> {
        let car_number = Self::cell(&self.car_number, row_html)?;

        Some(CarRecord {
            car_number,
            team: Self::cell(&self.team, row_html),
            class: Self::cell(&self.class, row_html),
            position: Self::cell(&self.position, row_html).and_then(|t| parse_count(&t)),
            laps_completed: Self::cell(&self.laps, row_html).and_then(|t| parse_count(&t)),
            last_lap_time: Self::cell(&self.last_lap, row_html).and_then(|t| parse_lap_time(&t)),
            best_lap_time: Self::cell(&self.best_lap, row_html).and_then(|t| parse_lap_time(&t)),
            gap_to_leader: self
                .gap
                .as_ref()
                .and_then(|re| Self::cell(re, row_html))
                .and_then(|t| parse_gap(&t)),
            in_pit: self.pit_row.as_ref().map(|re| re.is_match(attrs)),
        })
    }

    /// Parse a full timing page.
    pub fn parse(&self, html: &str) -> Result<Snapshot> {
        if !self.table_marker.is_match(html) {
            return Err(TrackerError::document_structure(
                format!("{} timing page", self.series),
                "timing table not found",
            ));
        }

        let mut cars = Vec::new();
        let mut skipped = 0usize;
        for caps in ROW_REGEX.captures_iter(html) {
            let attrs = &caps[1];
            if !self.row.is_match(attrs) {
                continue;
            }
            match self.parse_row(attrs, &caps[2]) {
                Some(car) => {
                    trace!(car = %car.car_number, position = ?car.position, "Parsed timing row");
                    cars.push(car);
                }
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(series = %self.series, skipped, "Skipped timing rows without a car number");
        }

        Ok(Snapshot { series: self.series, captured_at: Utc::now(), cars })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{TimingRow, timing_page};

    #[test]
    fn parses_wec_rows() {
        let html = timing_page(
            Series::Wec,
            &[
                TimingRow::full("8", "Toyota Gazoo Racing", "HYPERCAR", 1, "3:30.111", "Leader"),
                TimingRow::full("50", "Ferrari AF Corse", "HYPERCAR", 2, "3:31.500", "+12.345")
                    .in_pit(),
                TimingRow::full("22", "United Autosports", "LMP2", 3, "3:40.000", "+2 LAPS"),
            ],
        );
        let parser = TableParser::for_series(Series::Wec).unwrap();
        let snapshot = parser.parse(&html).unwrap();

        assert_eq!(snapshot.series, Series::Wec);
        assert_eq!(snapshot.cars.len(), 3);

        let leader = &snapshot.cars[0];
        assert_eq!(leader.car_number, "8");
        assert_eq!(leader.team.as_deref(), Some("Toyota Gazoo Racing"));
        assert_eq!(leader.position, Some(1));
        assert_eq!(leader.gap_to_leader, Some(0.0));
        assert_eq!(leader.in_pit, Some(false));
        assert!((leader.last_lap_time.unwrap() - 210.111).abs() < 1e-9);

        let ferrari = snapshot.car("50").unwrap();
        assert_eq!(ferrari.in_pit, Some(true));
        assert_eq!(ferrari.gap_to_leader, Some(12.345));

        let lapped = snapshot.car("22").unwrap();
        assert_eq!(lapped.gap_to_leader, Some(200.0));
    }

    #[test]
    fn imsa_layout_has_no_gap_or_pit_column() {
        let html = timing_page(
            Series::Imsa,
            &[TimingRow::full("01", "Cadillac Wayne Taylor Racing", "GTP", 1, "1:49.870", "")],
        );
        let parser = TableParser::for_series(Series::Imsa).unwrap();
        let car = parser.parse(&html).unwrap().cars.remove(0);

        assert_eq!(car.car_number, "01");
        assert_eq!(car.class.as_deref(), Some("GTP"));
        assert_eq!(car.gap_to_leader, None);
        assert_eq!(car.in_pit, None);
        assert!((car.best_lap_time.unwrap() - 109.87).abs() < 1e-9);
    }

    #[test]
    fn malformed_fields_degrade_to_absent() {
        let html = r#"
            <table class="timing-table">
              <tr class="timing-row">
                <td class="position">P?</td>
                <td class="car-number"> <b>7</b> </td>
                <td class="team-name">Toyota &amp; Friends</td>
                <td class="laps"></td>
                <td class="last-lap">IN PIT</td>
                <td class="gap">--</td>
              </tr>
            </table>"#;
        let parser = TableParser::for_series(Series::Wec).unwrap();
        let snapshot = parser.parse(html).unwrap();
        let car = &snapshot.cars[0];

        assert_eq!(car.car_number, "7");
        assert_eq!(car.team.as_deref(), Some("Toyota & Friends"));
        assert_eq!(car.position, None);
        assert_eq!(car.laps_completed, None);
        assert_eq!(car.last_lap_time, None);
        assert_eq!(car.best_lap_time, None);
        assert_eq!(car.gap_to_leader, None);
        assert_eq!(car.class, None);
    }

    #[test]
    fn rows_without_car_number_are_skipped() {
        let html = r#"<div class="timing-table"><table>
            <tr class="timing-row"><td class="team-name">Ghost</td></tr>
            <tr class="header"><td class="car-number">#</td></tr>
            <tr class="timing-row"><td class="car-number">93</td></tr>
            </table></div>"#;
        let snapshot = TableParser::for_series(Series::Wec).unwrap().parse(html).unwrap();
        assert_eq!(snapshot.cars.len(), 1);
        assert_eq!(snapshot.cars[0].car_number, "93");
    }

    #[test]
    fn empty_table_is_not_an_error() {
        let html = r#"<table class="timing-table"></table>"#;
        let snapshot = TableParser::for_series(Series::Imsa).unwrap().parse(html).unwrap();
        assert!(snapshot.is_empty());
    }

    #[test]
    fn missing_table_is_a_document_error() {
        let err = TableParser::for_series(Series::Wec)
            .unwrap()
            .parse("<html><body>Session not started</body></html>")
            .unwrap_err();
        assert!(matches!(err, TrackerError::DocumentStructure { .. }));
    }

    #[test]
    fn class_matching_is_whole_word() {
        // "best-lap" must not satisfy the "last-lap" or "laps" cells
        let html = r#"<table class="timing-table"><tr class="timing-row">
            <td class="car-number">3</td><td class="best-lap">1:50.000</td></tr></table>"#;
        let car = TableParser::for_series(Series::Wec).unwrap().parse(html).unwrap().cars.remove(0);
        assert_eq!(car.last_lap_time, None);
        assert_eq!(car.laps_completed, None);
        assert_eq!(car.best_lap_time, Some(110.0));
    }
}
