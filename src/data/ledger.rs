//! Race ledger: historical results, one row per (race, driver)

use polars::prelude::*;
use std::collections::HashMap;
use std::path::Path;
use tracing::{info, warn};

use crate::data::table::{
    f64_column, optional_str_column, read_csv, str_column, text_cell, write_csv,
};
use crate::error::PipelineError;
use crate::models::{FinishPosition, RaceRecord};

/// Column names for one CSV layout
struct LedgerColumns {
    race_id: &'static str,
    year: &'static str,
    round: &'static str,
    driver_id: &'static str,
    constructor_id: &'static str,
    grid: &'static str,
    position: &'static str,
    points: &'static str,
    location: &'static str,
}

/// Processed ledger layout (race_data.csv)
const PROCESSED_COLUMNS: LedgerColumns = LedgerColumns {
    race_id: "raceId",
    year: "year",
    round: "round",
    driver_id: "driverId",
    constructor_id: "constructorId",
    grid: "grid",
    position: "positionOrder",
    points: "points",
    location: "Location",
};

/// Raw session results layout (results.csv)
const RAW_RESULT_COLUMNS: LedgerColumns = LedgerColumns {
    race_id: "raceId",
    year: "year",
    round: "round",
    driver_id: "DriverId",
    constructor_id: "TeamName",
    grid: "GridPosition",
    position: "Position",
    points: "Points",
    location: "Location",
};

/// Historical race results in chronological order
#[derive(Debug, Clone, Default)]
pub struct RaceLedger {
    records: Vec<RaceRecord>,
}

impl RaceLedger {
    /// Build a ledger, ordering records by (year, round).
    ///
    /// The sort is stable, so file order is kept within a race.
    pub fn new(mut records: Vec<RaceRecord>) -> Self {
        records.sort_by_key(|r| r.race_key());
        Self { records }
    }

    /// Load the processed ledger CSV
    pub fn load<P: AsRef<Path>>(csv_path: P) -> Result<Self, PipelineError> {
        let path = csv_path.as_ref();
        let df = read_csv(path)?;
        let records = parse_records(&df, &PROCESSED_COLUMNS)?;
        info!("Loaded {} ledger rows from {:?}", records.len(), path);
        Ok(Self::new(records))
    }

    /// Assemble the ledger from a raw event schedule and raw session results.
    ///
    /// Results are matched to the schedule on `{year}_{RoundNumber}` to pick
    /// up the venue; unmatched results keep no location.
    pub fn from_raw<P: AsRef<Path>, Q: AsRef<Path>>(
        schedule_csv: P,
        results_csv: Q,
    ) -> Result<Self, PipelineError> {
        let schedule = read_csv(schedule_csv.as_ref())?;
        let venues = venue_index(&schedule)?;

        let results = read_csv(results_csv.as_ref())?;
        let mut records = parse_records(&results, &RAW_RESULT_COLUMNS)?;

        let mut unmatched = 0usize;
        for record in &mut records {
            if record.location.is_none() {
                record.location = venues.get(&record.race_id).cloned();
                if record.location.is_none() {
                    unmatched += 1;
                }
            }
        }
        if unmatched > 0 {
            warn!("{} result rows have no matching schedule entry", unmatched);
        }

        info!(
            "Assembled {} ledger rows from {} scheduled events",
            records.len(),
            venues.len()
        );
        Ok(Self::new(records))
    }

    /// Write the ledger in the processed layout
    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<(), PipelineError> {
        let rows = &self.records;
        let df = DataFrame::new(vec![
            Column::new("raceId".into(), rows.iter().map(|r| r.race_id.clone()).collect::<Vec<_>>()),
            Column::new("year".into(), rows.iter().map(|r| r.year as i64).collect::<Vec<_>>()),
            Column::new("round".into(), rows.iter().map(|r| r.round as i64).collect::<Vec<_>>()),
            Column::new("driverId".into(), rows.iter().map(|r| r.driver_id.clone()).collect::<Vec<_>>()),
            Column::new(
                "constructorId".into(),
                rows.iter().map(|r| r.constructor_id.clone()).collect::<Vec<_>>(),
            ),
            Column::new("grid".into(), rows.iter().map(|r| r.grid).collect::<Vec<_>>()),
            Column::new(
                "positionOrder".into(),
                rows.iter().map(|r| r.finish.as_cell()).collect::<Vec<_>>(),
            ),
            Column::new("points".into(), rows.iter().map(|r| r.points).collect::<Vec<_>>()),
            Column::new(
                "is_winner".into(),
                rows.iter().map(|r| r.is_winner() as i64).collect::<Vec<_>>(),
            ),
            Column::new("Location".into(), rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>()),
        ])?;
        write_csv(df, path.as_ref())
    }

    pub fn records(&self) -> &[RaceRecord] {
        &self.records
    }

    /// Iterate over races: groups of consecutive records sharing (year, round)
    pub fn races(&self) -> impl Iterator<Item = &[RaceRecord]> {
        self.records.chunk_by(|a, b| a.race_key() == b.race_key())
    }

    /// Number of distinct races
    pub fn race_count(&self) -> usize {
        self.races().count()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// raceId -> Location from an event schedule
fn venue_index(schedule: &DataFrame) -> Result<HashMap<String, String>, PipelineError> {
    let year_col = f64_column(schedule, "year")?;
    let round_col = f64_column(schedule, "RoundNumber")?;
    let location_col = str_column(schedule, "Location")?;

    let mut venues = HashMap::new();
    for i in 0..schedule.height() {
        if let (Some(year), Some(round), Some(location)) =
            (year_col.get(i), round_col.get(i), text_cell(&location_col, i))
        {
            venues.insert(race_id(year as i32, round as u32), location);
        }
    }
    Ok(venues)
}

fn race_id(year: i32, round: u32) -> String {
    format!("{}_{}", year, round)
}

/// Convert a result table into records, skipping rows without identity
fn parse_records(df: &DataFrame, cols: &LedgerColumns) -> Result<Vec<RaceRecord>, PipelineError> {
    let race_id_col = optional_str_column(df, cols.race_id)?;
    let year_col = f64_column(df, cols.year)?;
    let round_col = f64_column(df, cols.round)?;
    let driver_col = str_column(df, cols.driver_id)?;
    let constructor_col = str_column(df, cols.constructor_id)?;
    let grid_col = f64_column(df, cols.grid)?;
    let position_col = f64_column(df, cols.position)?;
    let points_col = f64_column(df, cols.points)?;
    let location_col = optional_str_column(df, cols.location)?;

    let mut records = Vec::with_capacity(df.height());
    let mut skipped = 0usize;

    for i in 0..df.height() {
        let (Some(year), Some(round), Some(driver_id), Some(constructor_id)) = (
            year_col.get(i),
            round_col.get(i),
            text_cell(&driver_col, i),
            text_cell(&constructor_col, i),
        ) else {
            skipped += 1;
            continue;
        };

        let year = year as i32;
        let round = round as u32;
        let race_id = race_id_col
            .as_ref()
            .and_then(|c| text_cell(c, i))
            .unwrap_or_else(|| race_id(year, round));

        records.push(RaceRecord {
            race_id,
            year,
            round,
            driver_id,
            constructor_id,
            grid: grid_col.get(i).map(|g| g as i64).unwrap_or(0),
            finish: FinishPosition::from_raw(position_col.get(i)),
            points: points_col.get(i).unwrap_or(0.0),
            location: location_col.as_ref().and_then(|c| text_cell(c, i)),
        });
    }

    if skipped > 0 {
        warn!("Skipped {} rows without year, round, driver or constructor", skipped);
    }

    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fixtures::record;
    use std::fs;

    #[test]
    fn test_new_sorts_chronologically_and_stably() {
        let ledger = RaceLedger::new(vec![
            record("2024_1", 2024, 1, "verstappen", "red_bull", 1),
            record("2023_2", 2023, 2, "hamilton", "mercedes", 1),
            record("2023_1", 2023, 1, "alonso", "aston_martin", 2),
            record("2023_1", 2023, 1, "perez", "red_bull", 1),
        ]);

        let order: Vec<&str> = ledger.records().iter().map(|r| r.driver_id.as_str()).collect();
        assert_eq!(order, vec!["alonso", "perez", "hamilton", "verstappen"]);
    }

    #[test]
    fn test_races_groups_by_year_and_round() {
        let ledger = RaceLedger::new(vec![
            record("2023_1", 2023, 1, "a", "x", 1),
            record("2023_1", 2023, 1, "b", "x", 2),
            record("2023_2", 2023, 2, "a", "x", 2),
            record("2024_1", 2024, 1, "a", "x", 1),
        ]);

        let sizes: Vec<usize> = ledger.races().map(|r| r.len()).collect();
        assert_eq!(sizes, vec![2, 1, 1]);
        assert_eq!(ledger.race_count(), 3);
    }

    #[test]
    fn test_load_processed_csv() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race_data.csv");
        fs::write(
            &path,
            "raceId,year,round,driverId,constructorId,grid,positionOrder,points,status,is_winner,EventName,Location\n\
             2023_2,2023,2,hamilton,Mercedes,3.0,,0.0,Retired,0,Saudi Arabian Grand Prix,Jeddah\n\
             2023_1,2023,1,verstappen,Red Bull Racing,1.0,1.0,25.0,Finished,1,Bahrain Grand Prix,Sakhir\n\
             2023_1,2023,1,,Ferrari,2.0,2.0,18.0,Finished,0,Bahrain Grand Prix,Sakhir\n",
        )
        .unwrap();

        let ledger = RaceLedger::load(&path).unwrap();
        assert_eq!(ledger.len(), 2);

        let first = &ledger.records()[0];
        assert_eq!(first.driver_id, "verstappen");
        assert!(first.is_winner());
        assert_eq!(first.location.as_deref(), Some("Sakhir"));

        let second = &ledger.records()[1];
        assert_eq!(second.finish, FinishPosition::NotClassified);
        assert_eq!(second.grid, 3);
    }

    #[test]
    fn test_load_missing_column_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("race_data.csv");
        fs::write(&path, "year,round,driverId\n2023,1,hamilton\n").unwrap();

        let err = RaceLedger::load(&path).unwrap_err();
        assert!(matches!(err, PipelineError::MissingColumn(_)));
    }

    #[test]
    fn test_from_raw_joins_schedule_location() {
        let dir = tempfile::tempdir().unwrap();
        let schedule = dir.path().join("races.csv");
        let results = dir.path().join("results.csv");
        fs::write(
            &schedule,
            "RoundNumber,Country,Location,EventName,year\n\
             1,Bahrain,Sakhir,Bahrain Grand Prix,2023\n\
             2,Saudi Arabia,Jeddah,Saudi Arabian Grand Prix,2023\n",
        )
        .unwrap();
        fs::write(
            &results,
            "DriverNumber,Abbreviation,DriverId,TeamName,Position,GridPosition,Status,Points,raceId,year,round\n\
             1,VER,max_verstappen,Red Bull Racing,1.0,1.0,Finished,25.0,2023_1,2023,1\n\
             11,PER,perez,Red Bull Racing,1.0,15.0,Finished,25.0,2023_2,2023,2\n\
             44,HAM,hamilton,Mercedes,,7.0,Retired,0.0,2023_3,2023,3\n",
        )
        .unwrap();

        let ledger = RaceLedger::from_raw(&schedule, &results).unwrap();
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.records()[0].location.as_deref(), Some("Sakhir"));
        assert_eq!(ledger.records()[1].location.as_deref(), Some("Jeddah"));
        assert_eq!(ledger.records()[2].location, None);
        assert_eq!(ledger.records()[1].constructor_id, "Red Bull Racing");
    }

    #[test]
    fn test_write_then_load_keeps_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("processed").join("race_data.csv");
        let mut dnf = record("2023_2", 2023, 2, "b", "y", 4);
        dnf.finish = FinishPosition::NotClassified;
        let ledger = RaceLedger::new(vec![record("2023_1", 2023, 1, "a", "x", 1), dnf]);

        ledger.write_csv(&path).unwrap();
        let loaded = RaceLedger::load(&path).unwrap();

        assert_eq!(loaded.records(), ledger.records());
    }
}
