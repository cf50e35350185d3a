//! Feature Store
//!
//! The ledger joined with accumulator statistics and categorical codes, one
//! row per ledger record. Persisted as a flat CSV table next to the encoding
//! table and a manifest.

use chrono::Utc;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

use crate::data::accumulator::{MetricAccumulator, RaceMetrics};
use crate::data::encoder::{CategoryEncoding, EncodingTable};
use crate::data::features::{
    FeatureVector, FEATURE_NAMES, NO_HISTORY_FORM, NO_HISTORY_POINTS, NO_HISTORY_WIN_RATE,
};
use crate::data::ledger::RaceLedger;
use crate::data::table::{
    f64_column, optional_f64_column, optional_str_column, read_csv, str_column, text_cell,
    write_csv,
};
use crate::error::PipelineError;
use crate::models::{ConstructorStatSnapshot, DriverStatSnapshot, FinishPosition, RaceRecord};

pub const FEATURES_FILE: &str = "final_features.csv";
pub const ENCODINGS_FILE: &str = "encodings.json";
pub const MANIFEST_FILE: &str = "manifest.json";

/// One Feature Store row
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub race_id: String,
    pub year: i32,
    pub round: u32,
    pub driver_id: String,
    pub constructor_id: String,
    pub grid: i64,
    pub finish: FinishPosition,
    pub points: f64,
    pub is_winner: bool,
    pub location: Option<String>,
    pub driver_wins_cum: u32,
    pub driver_races_cum: u32,
    pub driver_win_rate: f64,
    pub driver_recent_form: f64,
    pub constructor_wins_cum: u32,
    pub constructor_races_cum: u32,
    pub constructor_win_rate: f64,
    pub constructor_recent_points: f64,
    pub location_id: i64,
    pub driver_id_enc: i64,
    pub constructor_id_enc: i64,
}

impl FeatureRow {
    fn assemble(record: &RaceRecord, metrics: &RaceMetrics, encodings: &EncodingTable) -> Self {
        Self {
            race_id: record.race_id.clone(),
            year: record.year,
            round: record.round,
            driver_id: record.driver_id.clone(),
            constructor_id: record.constructor_id.clone(),
            grid: record.grid,
            finish: record.finish,
            points: record.points,
            is_winner: record.is_winner(),
            location: record.location.clone(),
            driver_wins_cum: metrics.driver.cumulative_wins,
            driver_races_cum: metrics.driver.cumulative_races,
            driver_win_rate: metrics.driver.win_rate,
            driver_recent_form: metrics.driver.recent_form.unwrap_or(NO_HISTORY_FORM),
            constructor_wins_cum: metrics.constructor.cumulative_wins,
            constructor_races_cum: metrics.constructor.cumulative_races,
            constructor_win_rate: metrics.constructor.win_rate,
            constructor_recent_points: metrics
                .constructor
                .recent_points
                .unwrap_or(NO_HISTORY_POINTS),
            location_id: encodings.location.encode_opt(record.location.as_deref()),
            driver_id_enc: encodings.driver.encode(&record.driver_id),
            constructor_id_enc: encodings.constructor.encode(&record.constructor_id),
        }
    }

    pub fn race_key(&self) -> (i32, u32) {
        (self.year, self.round)
    }

    /// Training-path feature vector
    pub fn feature_vector(&self) -> FeatureVector {
        FeatureVector {
            grid: self.grid as f64,
            driver_win_rate: self.driver_win_rate,
            driver_recent_form: self.driver_recent_form,
            constructor_win_rate: self.constructor_win_rate,
            constructor_recent_points: self.constructor_recent_points,
            location_id: self.location_id as f64,
            driver_id_enc: self.driver_id_enc as f64,
            constructor_id_enc: self.constructor_id_enc as f64,
        }
    }

    pub fn driver_snapshot(&self) -> DriverStatSnapshot {
        DriverStatSnapshot {
            driver_id: self.driver_id.clone(),
            as_of_race: self.race_id.clone(),
            cumulative_wins: self.driver_wins_cum,
            cumulative_races: self.driver_races_cum,
            win_rate: self.driver_win_rate,
            recent_form: Some(self.driver_recent_form),
        }
    }

    pub fn constructor_snapshot(&self) -> ConstructorStatSnapshot {
        ConstructorStatSnapshot {
            constructor_id: self.constructor_id.clone(),
            as_of_race: self.race_id.clone(),
            cumulative_wins: self.constructor_wins_cum,
            cumulative_races: self.constructor_races_cum,
            win_rate: self.constructor_win_rate,
            recent_points: Some(self.constructor_recent_points),
        }
    }
}

/// Build metadata written next to the table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreManifest {
    pub built_at: String,
    pub rows: usize,
    pub races: usize,
    pub feature_names: Vec<String>,
    pub no_history_form: f64,
}

impl StoreManifest {
    fn describe(store: &FeatureStore) -> Self {
        Self {
            built_at: Utc::now().to_rfc3339(),
            rows: store.rows.len(),
            races: store.race_count(),
            feature_names: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            no_history_form: NO_HISTORY_FORM,
        }
    }

    /// Reject a store built with a different feature layout or fill value
    fn check(&self, rows: usize) -> Result<(), PipelineError> {
        if self.feature_names != FEATURE_NAMES {
            return Err(PipelineError::CorruptStore(format!(
                "feature layout {:?} does not match {:?}",
                self.feature_names, FEATURE_NAMES
            )));
        }
        if self.no_history_form != NO_HISTORY_FORM {
            return Err(PipelineError::CorruptStore(format!(
                "no-history form sentinel {} does not match {}",
                self.no_history_form, NO_HISTORY_FORM
            )));
        }
        if self.rows != rows {
            return Err(PipelineError::CorruptStore(format!(
                "manifest lists {} rows, table has {}",
                self.rows, rows
            )));
        }
        Ok(())
    }
}

/// Latest (max year, round) snapshot per driver and per constructor
#[derive(Debug, Clone, Default)]
pub struct LatestSnapshots {
    drivers: HashMap<String, ((i32, u32), DriverStatSnapshot)>,
    constructors: HashMap<String, ((i32, u32), ConstructorStatSnapshot)>,
}

impl LatestSnapshots {
    /// Scan the rows once; among rows of the same race the later row wins
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let mut latest = Self::default();
        for row in rows {
            let key = row.race_key();
            let newer = |current: Option<&(i32, u32)>| current.map_or(true, |c| key >= *c);

            if newer(latest.drivers.get(&row.driver_id).map(|(k, _)| k)) {
                latest
                    .drivers
                    .insert(row.driver_id.clone(), (key, row.driver_snapshot()));
            }
            if newer(latest.constructors.get(&row.constructor_id).map(|(k, _)| k)) {
                latest
                    .constructors
                    .insert(row.constructor_id.clone(), (key, row.constructor_snapshot()));
            }
        }
        latest
    }

    pub fn driver(&self, driver_id: &str) -> Option<&DriverStatSnapshot> {
        self.drivers.get(driver_id).map(|(_, s)| s)
    }

    pub fn constructor(&self, constructor_id: &str) -> Option<&ConstructorStatSnapshot> {
        self.constructors.get(constructor_id).map(|(_, s)| s)
    }
}

/// Derived, read-only feature table plus its encoding table
#[derive(Debug, Clone)]
pub struct FeatureStore {
    rows: Vec<FeatureRow>,
    encodings: EncodingTable,
}

impl FeatureStore {
    /// Build the store from the full ledger
    pub fn build(ledger: &RaceLedger) -> Result<Self, PipelineError> {
        if ledger.is_empty() {
            return Err(PipelineError::EmptyLedger);
        }

        let encodings = EncodingTable::fit(ledger.records());
        let metrics = MetricAccumulator::compute(ledger);
        let rows: Vec<FeatureRow> = ledger
            .records()
            .iter()
            .zip(&metrics)
            .map(|(record, m)| FeatureRow::assemble(record, m, &encodings))
            .collect();

        info!(
            "Built feature store: {} rows, {} races, {} drivers, {} constructors, {} locations",
            rows.len(),
            ledger.race_count(),
            encodings.driver.len(),
            encodings.constructor.len(),
            encodings.location.len()
        );

        Ok(Self { rows, encodings })
    }

    /// Write table, encodings and manifest into `dir`
    pub fn write<P: AsRef<Path>>(&self, dir: P) -> Result<(), PipelineError> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)?;

        write_csv(self.to_dataframe()?, &dir.join(FEATURES_FILE))?;
        fs::write(
            dir.join(ENCODINGS_FILE),
            serde_json::to_string_pretty(&self.encodings)?,
        )?;
        fs::write(
            dir.join(MANIFEST_FILE),
            serde_json::to_string_pretty(&StoreManifest::describe(self))?,
        )?;

        info!("Wrote feature store ({} rows) to {:?}", self.rows.len(), dir);
        Ok(())
    }

    /// Load a persisted store.
    ///
    /// Fails on a missing or unreadable table, an empty table, a manifest
    /// mismatch, or an encoding table that disagrees with the rows.
    pub fn load<P: AsRef<Path>>(dir: P) -> Result<Self, PipelineError> {
        let dir = dir.as_ref();
        let table_path = dir.join(FEATURES_FILE);
        if !table_path.is_file() {
            return Err(PipelineError::StoreNotFound(table_path.display().to_string()));
        }

        let df = read_csv(&table_path).map_err(corrupt)?;
        let rows = parse_rows(&df).map_err(corrupt)?;
        if rows.is_empty() {
            return Err(PipelineError::CorruptStore(format!(
                "{} has no rows",
                table_path.display()
            )));
        }

        let manifest_path = dir.join(MANIFEST_FILE);
        if manifest_path.is_file() {
            let manifest: StoreManifest =
                serde_json::from_str(&fs::read_to_string(&manifest_path)?).map_err(corrupt)?;
            manifest.check(rows.len())?;
            debug!("Store manifest: built at {}", manifest.built_at);
        } else {
            warn!(
                "{} not found; feature layout and fill values are unverified",
                manifest_path.display()
            );
        }
        check_debut_fill(&rows)?;

        let encodings_path = dir.join(ENCODINGS_FILE);
        let encodings = if encodings_path.is_file() {
            let table: EncodingTable =
                serde_json::from_str(&fs::read_to_string(&encodings_path)?).map_err(corrupt)?;
            table.validate()?;
            check_rows_against(&table, &rows)?;
            table
        } else {
            warn!(
                "{} not found; deriving encodings from the stored rows",
                encodings_path.display()
            );
            Self::encodings_from_rows(&rows)?
        };

        info!("Loaded feature store: {} rows from {:?}", rows.len(), dir);
        Ok(Self { rows, encodings })
    }

    /// Re-derive the encoding table from the codes recorded in the rows
    pub fn encodings_from_rows(rows: &[FeatureRow]) -> Result<EncodingTable, PipelineError> {
        Ok(EncodingTable {
            location: CategoryEncoding::from_pairs(
                "location",
                rows.iter()
                    .filter_map(|r| r.location.as_deref().map(|l| (l, r.location_id))),
            )?,
            driver: CategoryEncoding::from_pairs(
                "driver",
                rows.iter().map(|r| (r.driver_id.as_str(), r.driver_id_enc)),
            )?,
            constructor: CategoryEncoding::from_pairs(
                "constructor",
                rows.iter()
                    .map(|r| (r.constructor_id.as_str(), r.constructor_id_enc)),
            )?,
        })
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    pub fn encodings(&self) -> &EncodingTable {
        &self.encodings
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn race_count(&self) -> usize {
        self.rows
            .iter()
            .map(|r| r.race_id.as_str())
            .collect::<HashSet<_>>()
            .len()
    }

    pub fn latest_snapshots(&self) -> LatestSnapshots {
        LatestSnapshots::from_rows(&self.rows)
    }

    /// Feature vectors and winner labels for the external trainer
    pub fn training_matrix(&self) -> (Vec<FeatureVector>, Vec<bool>) {
        self.rows
            .iter()
            .map(|r| (r.feature_vector(), r.is_winner))
            .unzip()
    }

    pub fn known_drivers(&self) -> Vec<String> {
        sorted_set(self.rows.iter().map(|r| r.driver_id.as_str()))
    }

    pub fn known_constructors(&self) -> Vec<String> {
        sorted_set(self.rows.iter().map(|r| r.constructor_id.as_str()))
    }

    pub fn known_locations(&self) -> Vec<String> {
        sorted_set(self.rows.iter().filter_map(|r| r.location.as_deref()))
    }

    fn to_dataframe(&self) -> Result<DataFrame, PipelineError> {
        let rows = &self.rows;
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
                rows.iter().map(|r| r.is_winner as i64).collect::<Vec<_>>(),
            ),
            Column::new("Location".into(), rows.iter().map(|r| r.location.clone()).collect::<Vec<_>>()),
            Column::new(
                "driver_wins_cum".into(),
                rows.iter().map(|r| r.driver_wins_cum as i64).collect::<Vec<_>>(),
            ),
            Column::new(
                "driver_races_cum".into(),
                rows.iter().map(|r| r.driver_races_cum as i64).collect::<Vec<_>>(),
            ),
            Column::new(
                "driver_win_rate".into(),
                rows.iter().map(|r| r.driver_win_rate).collect::<Vec<_>>(),
            ),
            Column::new(
                "driver_recent_form".into(),
                rows.iter().map(|r| r.driver_recent_form).collect::<Vec<_>>(),
            ),
            Column::new(
                "constructor_wins_cum".into(),
                rows.iter().map(|r| r.constructor_wins_cum as i64).collect::<Vec<_>>(),
            ),
            Column::new(
                "constructor_races_cum".into(),
                rows.iter().map(|r| r.constructor_races_cum as i64).collect::<Vec<_>>(),
            ),
            Column::new(
                "constructor_win_rate".into(),
                rows.iter().map(|r| r.constructor_win_rate).collect::<Vec<_>>(),
            ),
            Column::new(
                "constructor_recent_points".into(),
                rows.iter().map(|r| r.constructor_recent_points).collect::<Vec<_>>(),
            ),
            Column::new("location_id".into(), rows.iter().map(|r| r.location_id).collect::<Vec<_>>()),
            Column::new(
                "driver_id_enc".into(),
                rows.iter().map(|r| r.driver_id_enc).collect::<Vec<_>>(),
            ),
            Column::new(
                "constructor_id_enc".into(),
                rows.iter().map(|r| r.constructor_id_enc).collect::<Vec<_>>(),
            ),
        ])?;
        Ok(df)
    }
}

fn corrupt<E: std::fmt::Display>(err: E) -> PipelineError {
    PipelineError::CorruptStore(err.to_string())
}

fn sorted_set<'a, I: Iterator<Item = &'a str>>(values: I) -> Vec<String> {
    values
        .collect::<BTreeSet<_>>()
        .into_iter()
        .map(str::to_string)
        .collect()
}

/// Every row's recorded code must equal the table's code for its value
fn check_rows_against(table: &EncodingTable, rows: &[FeatureRow]) -> Result<(), PipelineError> {
    for (i, row) in rows.iter().enumerate() {
        let expected = (
            table.location.encode_opt(row.location.as_deref()),
            table.driver.encode(&row.driver_id),
            table.constructor.encode(&row.constructor_id),
        );
        if expected != (row.location_id, row.driver_id_enc, row.constructor_id_enc) {
            return Err(PipelineError::CorruptStore(format!(
                "row {} ({} / {}) disagrees with the encoding table",
                i, row.race_id, row.driver_id
            )));
        }
    }
    Ok(())
}

/// A driver's first stored race has no history, so its form must be the fill value
fn check_debut_fill(rows: &[FeatureRow]) -> Result<(), PipelineError> {
    let mut debut: HashMap<&str, (i32, u32)> = HashMap::new();
    for row in rows {
        let first = debut.entry(row.driver_id.as_str()).or_insert(row.race_key());
        if row.race_key() < *first {
            *first = row.race_key();
        }
    }

    for (i, row) in rows.iter().enumerate() {
        let is_debut = debut.get(row.driver_id.as_str()) == Some(&row.race_key());
        if is_debut && row.driver_recent_form != NO_HISTORY_FORM {
            return Err(PipelineError::CorruptStore(format!(
                "row {}: debut of {} has driver_recent_form {}, expected {}",
                i, row.driver_id, row.driver_recent_form, NO_HISTORY_FORM
            )));
        }
    }
    Ok(())
}

/// Parse persisted rows; cumulative counters are optional
fn parse_rows(df: &DataFrame) -> Result<Vec<FeatureRow>, PipelineError> {
    let race_id_col = str_column(df, "raceId")?;
    let year_col = f64_column(df, "year")?;
    let round_col = f64_column(df, "round")?;
    let driver_col = str_column(df, "driverId")?;
    let constructor_col = str_column(df, "constructorId")?;
    let grid_col = f64_column(df, "grid")?;
    let position_col = f64_column(df, "positionOrder")?;
    let points_col = f64_column(df, "points")?;
    let winner_col = f64_column(df, "is_winner")?;
    let location_col = optional_str_column(df, "Location")?;
    let driver_wins_col = optional_f64_column(df, "driver_wins_cum")?;
    let driver_races_col = optional_f64_column(df, "driver_races_cum")?;
    let driver_rate_col = f64_column(df, "driver_win_rate")?;
    let driver_form_col = f64_column(df, "driver_recent_form")?;
    let constructor_wins_col = optional_f64_column(df, "constructor_wins_cum")?;
    let constructor_races_col = optional_f64_column(df, "constructor_races_cum")?;
    let constructor_rate_col = f64_column(df, "constructor_win_rate")?;
    let constructor_points_col = f64_column(df, "constructor_recent_points")?;
    let location_id_col = f64_column(df, "location_id")?;
    let driver_enc_col = f64_column(df, "driver_id_enc")?;
    let constructor_enc_col = f64_column(df, "constructor_id_enc")?;

    let required = |col: &Float64Chunked, name: &str, i: usize| {
        col.get(i).ok_or_else(|| {
            PipelineError::CorruptStore(format!("row {}: missing value in {}", i, name))
        })
    };
    let counter = |col: &Option<Float64Chunked>, i: usize| {
        col.as_ref().and_then(|c| c.get(i)).unwrap_or(0.0) as u32
    };

    let mut rows = Vec::with_capacity(df.height());
    for i in 0..df.height() {
        let race_id = text_cell(&race_id_col, i)
            .ok_or_else(|| PipelineError::CorruptStore(format!("row {}: missing raceId", i)))?;
        let driver_id = text_cell(&driver_col, i)
            .ok_or_else(|| PipelineError::CorruptStore(format!("row {}: missing driverId", i)))?;
        let constructor_id = text_cell(&constructor_col, i).ok_or_else(|| {
            PipelineError::CorruptStore(format!("row {}: missing constructorId", i))
        })?;

        rows.push(FeatureRow {
            race_id,
            year: required(&year_col, "year", i)? as i32,
            round: required(&round_col, "round", i)? as u32,
            driver_id,
            constructor_id,
            grid: required(&grid_col, "grid", i)? as i64,
            finish: FinishPosition::from_raw(position_col.get(i)),
            points: points_col.get(i).unwrap_or(0.0),
            is_winner: winner_col.get(i).unwrap_or(0.0) >= 1.0,
            location: location_col.as_ref().and_then(|c| text_cell(c, i)),
            driver_wins_cum: counter(&driver_wins_col, i),
            driver_races_cum: counter(&driver_races_col, i),
            driver_win_rate: driver_rate_col.get(i).unwrap_or(NO_HISTORY_WIN_RATE),
            driver_recent_form: driver_form_col.get(i).unwrap_or(NO_HISTORY_FORM),
            constructor_wins_cum: counter(&constructor_wins_col, i),
            constructor_races_cum: counter(&constructor_races_col, i),
            constructor_win_rate: constructor_rate_col.get(i).unwrap_or(NO_HISTORY_WIN_RATE),
            constructor_recent_points: constructor_points_col.get(i).unwrap_or(NO_HISTORY_POINTS),
            location_id: required(&location_id_col, "location_id", i)? as i64,
            driver_id_enc: required(&driver_enc_col, "driver_id_enc", i)? as i64,
            constructor_id_enc: required(&constructor_enc_col, "constructor_id_enc", i)? as i64,
        });
    }

    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::encoder::UNSEEN_CODE;
    use crate::data::fixtures::{record, two_season_records};

    fn store() -> FeatureStore {
        FeatureStore::build(&RaceLedger::new(two_season_records())).unwrap()
    }

    #[test]
    fn test_build_rejects_empty_ledger() {
        let err = FeatureStore::build(&RaceLedger::default()).unwrap_err();
        assert!(matches!(err, PipelineError::EmptyLedger));
    }

    #[test]
    fn test_build_fills_missing_history() {
        let store = store();
        let first = &store.rows()[0];
        assert_eq!(first.driver_races_cum, 0);
        assert_eq!(first.driver_win_rate, NO_HISTORY_WIN_RATE);
        assert_eq!(first.driver_recent_form, NO_HISTORY_FORM);
        assert_eq!(first.constructor_recent_points, NO_HISTORY_POINTS);
    }

    #[test]
    fn test_build_one_row_per_record_with_codes() {
        let store = store();
        assert_eq!(store.len(), 9);
        assert_eq!(store.race_count(), 3);
        for row in store.rows() {
            assert_ne!(row.driver_id_enc, UNSEEN_CODE);
            assert_ne!(row.constructor_id_enc, UNSEEN_CODE);
            assert_ne!(row.location_id, UNSEEN_CODE);
        }
    }

    #[test]
    fn test_row_derived_encodings_match_fitted_table() {
        let records = two_season_records();
        let store = FeatureStore::build(&RaceLedger::new(records.clone())).unwrap();
        let derived = FeatureStore::encodings_from_rows(store.rows()).unwrap();
        assert_eq!(&derived, store.encodings());
        assert_eq!(derived, EncodingTable::fit(&records));
    }

    #[test]
    fn test_latest_snapshot_uses_max_year_round() {
        let store = store();
        let latest = store.latest_snapshots();

        let verstappen = latest.driver("verstappen").unwrap();
        assert_eq!(verstappen.as_of_race, "2024_1");
        assert_eq!(verstappen.cumulative_races, 2);
        assert_eq!(verstappen.cumulative_wins, 1);
        assert_eq!(verstappen.win_rate, 0.5);
        assert_eq!(verstappen.recent_form, Some(1.5));

        let red_bull = latest.constructor("red_bull").unwrap();
        assert_eq!(red_bull.as_of_race, "2024_1");
        assert_eq!(red_bull.cumulative_races, 4);

        assert!(latest.driver("alonso").is_none());
    }

    #[test]
    fn test_latest_snapshot_ignores_row_order() {
        let mut rows = store().rows().to_vec();
        rows.reverse();
        let latest = LatestSnapshots::from_rows(&rows);
        assert_eq!(latest.driver("hamilton").unwrap().as_of_race, "2024_1");
        assert_eq!(latest.driver("perez").unwrap().as_of_race, "2023_2");
    }

    #[test]
    fn test_known_lists_are_sorted_and_unique() {
        let store = store();
        assert_eq!(
            store.known_drivers(),
            vec!["hamilton", "perez", "russell", "verstappen"]
        );
        assert_eq!(store.known_constructors(), vec!["mercedes", "red_bull"]);
        assert_eq!(store.known_locations(), vec!["Jeddah", "Sakhir"]);
    }

    #[test]
    fn test_training_matrix_aligned_with_rows() {
        let store = store();
        let (vectors, labels) = store.training_matrix();
        assert_eq!(vectors.len(), store.len());
        assert_eq!(labels.iter().filter(|w| **w).count(), 3);
        assert_eq!(vectors[0].grid, 1.0);
    }

    #[test]
    fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.write(dir.path()).unwrap();

        let loaded = FeatureStore::load(dir.path()).unwrap();
        assert_eq!(loaded.rows(), store.rows());
        assert_eq!(loaded.encodings(), store.encodings());
    }

    #[test]
    fn test_load_missing_store_fails() {
        let dir = tempfile::tempdir().unwrap();
        let err = FeatureStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::StoreNotFound(_)));
    }

    #[test]
    fn test_load_without_encodings_derives_them() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.write(dir.path()).unwrap();
        fs::remove_file(dir.path().join(ENCODINGS_FILE)).unwrap();

        let loaded = FeatureStore::load(dir.path()).unwrap();
        assert_eq!(loaded.encodings(), store.encodings());
    }

    #[test]
    fn test_load_rejects_inconsistent_encodings() {
        let dir = tempfile::tempdir().unwrap();
        store().write(dir.path()).unwrap();

        let other = EncodingTable::fit(&[record("2023_1", 2023, 1, "aaa", "zzz", 1)]);
        fs::write(
            dir.path().join(ENCODINGS_FILE),
            serde_json::to_string(&other).unwrap(),
        )
        .unwrap();

        let err = FeatureStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptStore(_)));
    }

    #[test]
    fn test_load_rejects_manifest_with_other_sentinel() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.write(dir.path()).unwrap();

        let mut manifest = StoreManifest::describe(&store);
        manifest.no_history_form = 0.0;
        fs::write(
            dir.path().join(MANIFEST_FILE),
            serde_json::to_string(&manifest).unwrap(),
        )
        .unwrap();

        let err = FeatureStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptStore(_)));
    }

    #[test]
    fn test_load_without_manifest_accepts_valid_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = store();
        store.write(dir.path()).unwrap();
        fs::remove_file(dir.path().join(MANIFEST_FILE)).unwrap();

        let loaded = FeatureStore::load(dir.path()).unwrap();
        assert_eq!(loaded.rows(), store.rows());
    }

    #[test]
    fn test_load_rejects_zero_filled_debut_form() {
        let mut store = store();
        for row in store.rows.iter_mut().filter(|r| r.driver_races_cum == 0) {
            row.driver_recent_form = 0.0;
        }

        let with_manifest = tempfile::tempdir().unwrap();
        store.write(with_manifest.path()).unwrap();
        let err = FeatureStore::load(with_manifest.path()).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptStore(_)));

        let legacy = tempfile::tempdir().unwrap();
        store.write(legacy.path()).unwrap();
        fs::remove_file(legacy.path().join(MANIFEST_FILE)).unwrap();
        let err = FeatureStore::load(legacy.path()).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptStore(_)));
    }

    #[test]
    fn test_load_rejects_garbage_table() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(FEATURES_FILE), "not,a,feature\ntable,at,all\n").unwrap();
        let err = FeatureStore::load(dir.path()).unwrap_err();
        assert!(matches!(err, PipelineError::CorruptStore(_)));
    }
}
