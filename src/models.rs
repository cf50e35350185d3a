use serde::{Deserialize, Serialize};

/// Finish position value used for a driver who was not classified
pub const NOT_CLASSIFIED_POSITION: f64 = 20.0;

/// Finishing result of a single entry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinishPosition {
    Classified(u32),
    NotClassified,
}

impl FinishPosition {
    /// Parse from a raw numeric cell; anything that is not a position >= 1 is
    /// treated as not classified
    pub fn from_raw(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() && v >= 1.0 => FinishPosition::Classified(v.round() as u32),
            _ => FinishPosition::NotClassified,
        }
    }

    /// Numeric value for rolling averages (DNF counts as 20th)
    pub fn numeric(&self) -> f64 {
        match self {
            FinishPosition::Classified(p) => *p as f64,
            FinishPosition::NotClassified => NOT_CLASSIFIED_POSITION,
        }
    }

    /// Value written to the positionOrder column
    pub fn as_cell(&self) -> Option<f64> {
        match self {
            FinishPosition::Classified(p) => Some(*p as f64),
            FinishPosition::NotClassified => None,
        }
    }
}

/// One historical result row: a single driver in a single race
#[derive(Debug, Clone, PartialEq)]
pub struct RaceRecord {
    pub race_id: String,
    pub year: i32,
    pub round: u32,
    pub driver_id: String,
    pub constructor_id: String,
    pub grid: i64,
    pub finish: FinishPosition,
    pub points: f64,
    pub location: Option<String>,
}

impl RaceRecord {
    /// Chronological key
    pub fn race_key(&self) -> (i32, u32) {
        (self.year, self.round)
    }

    pub fn is_winner(&self) -> bool {
        self.finish == FinishPosition::Classified(1)
    }
}

/// Driver statistics as of (before) a given race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriverStatSnapshot {
    pub driver_id: String,
    pub as_of_race: String,
    pub cumulative_wins: u32,
    pub cumulative_races: u32,
    pub win_rate: f64,
    /// Mean finish over the last 3 prior races, None without history
    pub recent_form: Option<f64>,
}

/// Constructor statistics as of (before) a given race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstructorStatSnapshot {
    pub constructor_id: String,
    pub as_of_race: String,
    pub cumulative_wins: u32,
    pub cumulative_races: u32,
    pub win_rate: f64,
    /// Mean team points (all cars summed) over the last 3 prior races, None without history
    pub recent_points: Option<f64>,
}

/// Candidate entry for an upcoming race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    #[serde(rename = "constructorId")]
    pub constructor_id: String,
    pub grid: i64,
    #[serde(alias = "Location")]
    pub location: String,
}

/// Win probability for one driver
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    #[serde(rename = "driverId")]
    pub driver_id: String,
    pub win_probability: f64,
}

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub classifier: String,
    pub store_rows: usize,
}

/// Reload response
#[derive(Debug, Serialize, Deserialize)]
pub struct ReloadResponse {
    pub reloaded: bool,
    pub store_rows: usize,
}

/// Error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finish_position_from_raw() {
        assert_eq!(FinishPosition::from_raw(Some(1.0)), FinishPosition::Classified(1));
        assert_eq!(FinishPosition::from_raw(Some(12.0)), FinishPosition::Classified(12));
        assert_eq!(FinishPosition::from_raw(None), FinishPosition::NotClassified);
        assert_eq!(FinishPosition::from_raw(Some(f64::NAN)), FinishPosition::NotClassified);
        assert_eq!(FinishPosition::from_raw(Some(0.0)), FinishPosition::NotClassified);
    }

    #[test]
    fn test_not_classified_counts_as_twentieth() {
        assert_eq!(FinishPosition::NotClassified.numeric(), 20.0);
        assert_eq!(FinishPosition::Classified(3).numeric(), 3.0);
    }

    #[test]
    fn test_roster_entry_accepts_location_alias() {
        let json = r#"{"driverId":"leclerc","constructorId":"ferrari","grid":2,"Location":"Monza"}"#;
        let entry: RosterEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.location, "Monza");
        assert_eq!(entry.grid, 2);
    }

    #[test]
    fn test_roster_entry_missing_field_is_rejected() {
        let json = r#"{"driverId":"leclerc","grid":2,"location":"Monza"}"#;
        assert!(serde_json::from_str::<RosterEntry>(json).is_err());
    }

    #[test]
    fn test_prediction_result_wire_names() {
        let result = PredictionResult {
            driver_id: "norris".to_string(),
            win_probability: 0.25,
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["driverId"], "norris");
        assert_eq!(json["win_probability"], 0.25);
    }
}
