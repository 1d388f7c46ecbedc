//! Timing snapshot types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Series;

/// One car's row in a timing snapshot.
///
/// Every field except the car number may be absent: the timing page is parsed
/// field by field and a field that cannot be extracted is simply `None`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CarRecord {
    /// Race number as displayed, e.g. "7" or "007"
    pub car_number: String,
    /// Entrant / team name
    #[serde(default)]
    pub team: Option<String>,
    /// Class, e.g. "HYPERCAR", "LMP2", "GTD PRO"
    #[serde(default)]
    pub class: Option<String>,
    /// Overall position
    #[serde(default)]
    pub position: Option<u32>,
    /// Laps completed
    #[serde(default)]
    pub laps_completed: Option<u32>,
    /// Last lap time in seconds
    #[serde(default)]
    pub last_lap_time: Option<f64>,
    /// Best lap time in seconds
    #[serde(default)]
    pub best_lap_time: Option<f64>,
    /// Gap to the overall leader in seconds
    #[serde(default)]
    pub gap_to_leader: Option<f64>,
    /// Whether the car is currently in the pit lane
    #[serde(default)]
    pub in_pit: Option<bool>,
}

impl CarRecord {
    /// Create a record with only the car number populated.
    pub fn new(car_number: impl Into<String>) -> Self {
        Self { car_number: car_number.into(), ..Default::default() }
    }
}

/// A point-in-time capture of a timing page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Series the page belongs to
    pub series: Series,
    /// When the page was captured
    pub captured_at: DateTime<Utc>,
    /// Car rows in page order
    pub cars: Vec<CarRecord>,
}

impl Snapshot {
    /// Create a snapshot captured now.
    pub fn new(series: Series, cars: Vec<CarRecord>) -> Self {
        Self { series, captured_at: Utc::now(), cars }
    }

    /// Whether the snapshot carries no car rows.
    pub fn is_empty(&self) -> bool {
        self.cars.is_empty()
    }

    /// Look up a car by race number.
    pub fn car(&self, car_number: &str) -> Option<&CarRecord> {
        self.cars.iter().find(|c| c.car_number == car_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_populated_snapshot_round_trips() {
        let car = CarRecord {
            car_number: "50".into(),
            team: Some("Ferrari AF Corse".into()),
            class: Some("HYPERCAR".into()),
            position: Some(1),
            laps_completed: Some(387),
            last_lap_time: Some(212.345),
            best_lap_time: Some(206.111),
            gap_to_leader: Some(0.0),
            in_pit: Some(false),
        };
        let snapshot = Snapshot::new(Series::Wec, vec![car]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }

    #[test]
    fn absent_fields_round_trip_as_absent() {
        let snapshot = Snapshot::new(Series::Imsa, vec![CarRecord::new("01")]);

        let json = serde_json::to_string(&snapshot).unwrap();
        let back: Snapshot = serde_json::from_str(&json).unwrap();

        let car = back.car("01").unwrap();
        assert_eq!(car.position, None);
        assert_eq!(car.laps_completed, None);
        assert_eq!(car.gap_to_leader, None);
        assert_eq!(car.in_pit, None);
        assert_eq!(back, snapshot);
    }

    #[test]
    fn missing_keys_deserialize_as_absent() {
        let car: CarRecord = serde_json::from_str(r#"{"car_number":"7"}"#).unwrap();
        assert_eq!(car, CarRecord::new("7"));
    }

    #[test]
    fn car_number_is_required() {
        assert!(serde_json::from_str::<CarRecord>(r#"{"team":"Cadillac Racing","position":3}"#).is_err());
        assert!(serde_json::from_str::<CarRecord>("{}").is_err());
    }
}
