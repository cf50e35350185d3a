//! Shared test fixtures

use crate::models::{FinishPosition, RaceRecord};

/// Record at Sakhir with points derived from the finish
pub(crate) fn record(
    race_id: &str,
    year: i32,
    round: u32,
    driver_id: &str,
    constructor_id: &str,
    position: u32,
) -> RaceRecord {
    RaceRecord {
        race_id: race_id.to_string(),
        year,
        round,
        driver_id: driver_id.to_string(),
        constructor_id: constructor_id.to_string(),
        grid: position as i64,
        finish: FinishPosition::Classified(position),
        points: points_for(position),
        location: Some("Sakhir".to_string()),
    }
}

fn points_for(position: u32) -> f64 {
    match position {
        1 => 25.0,
        2 => 18.0,
        3 => 15.0,
        4 => 12.0,
        5 => 10.0,
        6 => 8.0,
        7 => 6.0,
        8 => 4.0,
        9 => 2.0,
        10 => 1.0,
        _ => 0.0,
    }
}

/// Two seasons, two teams, three drivers; one driver only appears in 2024
pub(crate) fn two_season_records() -> Vec<RaceRecord> {
    let mut records = vec![
        record("2023_1", 2023, 1, "verstappen", "red_bull", 1),
        record("2023_1", 2023, 1, "perez", "red_bull", 2),
        record("2023_1", 2023, 1, "hamilton", "mercedes", 3),
        record("2023_2", 2023, 2, "perez", "red_bull", 1),
        record("2023_2", 2023, 2, "verstappen", "red_bull", 2),
        record("2023_2", 2023, 2, "hamilton", "mercedes", 5),
        record("2024_1", 2024, 1, "verstappen", "red_bull", 1),
        record("2024_1", 2024, 1, "hamilton", "mercedes", 2),
        record("2024_1", 2024, 1, "russell", "mercedes", 3),
    ];
    records[3].location = Some("Jeddah".to_string());
    records[4].location = Some("Jeddah".to_string());
    records[5].location = Some("Jeddah".to_string());
    records[5].finish = FinishPosition::NotClassified;
    records[5].points = 0.0;
    records
}
