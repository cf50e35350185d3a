//! Inference Preprocessor
//!
//! Turns an upcoming-race roster into feature vectors from each entity's
//! latest stored snapshot, with the same layout and fill values the store
//! build uses.

use tracing::debug;

use crate::data::encoder::EncodingTable;
use crate::data::features::{
    FeatureVector, NO_HISTORY_FORM, NO_HISTORY_POINTS, NO_HISTORY_WIN_RATE,
};
use crate::data::store::{FeatureStore, LatestSnapshots};
use crate::error::PipelineError;
use crate::models::RosterEntry;

/// Roster preprocessor bound to one loaded store snapshot
#[derive(Debug, Clone)]
pub struct InferencePreprocessor {
    latest: LatestSnapshots,
    encodings: EncodingTable,
}

impl InferencePreprocessor {
    pub fn new(store: &FeatureStore) -> Self {
        Self {
            latest: store.latest_snapshots(),
            encodings: store.encodings().clone(),
        }
    }

    /// Feature vectors aligned with `roster`
    pub fn preprocess(&self, roster: &[RosterEntry]) -> Result<Vec<FeatureVector>, PipelineError> {
        if roster.is_empty() {
            return Err(PipelineError::InvalidRoster {
                index: 0,
                reason: "roster is empty".to_string(),
            });
        }

        roster
            .iter()
            .enumerate()
            .map(|(index, entry)| {
                validate_entry(entry).map_err(|reason| PipelineError::InvalidRoster {
                    index,
                    reason,
                })?;
                Ok(self.vector_for(entry))
            })
            .collect()
    }

    fn vector_for(&self, entry: &RosterEntry) -> FeatureVector {
        let driver_id = entry.driver_id.trim();
        let constructor_id = entry.constructor_id.trim();
        let location = entry.location.trim();

        let (driver_win_rate, driver_recent_form) = match self.latest.driver(driver_id) {
            Some(s) => (s.win_rate, s.recent_form.unwrap_or(NO_HISTORY_FORM)),
            None => {
                debug!("No history for driver {}", driver_id);
                (NO_HISTORY_WIN_RATE, NO_HISTORY_FORM)
            }
        };
        let (constructor_win_rate, constructor_recent_points) =
            match self.latest.constructor(constructor_id) {
                Some(s) => (s.win_rate, s.recent_points.unwrap_or(NO_HISTORY_POINTS)),
                None => {
                    debug!("No history for constructor {}", constructor_id);
                    (NO_HISTORY_WIN_RATE, NO_HISTORY_POINTS)
                }
            };

        FeatureVector {
            grid: entry.grid as f64,
            driver_win_rate,
            driver_recent_form,
            constructor_win_rate,
            constructor_recent_points,
            location_id: self.encodings.location.encode(location) as f64,
            driver_id_enc: self.encodings.driver.encode(driver_id) as f64,
            constructor_id_enc: self.encodings.constructor.encode(constructor_id) as f64,
        }
    }
}

fn validate_entry(entry: &RosterEntry) -> Result<(), String> {
    if entry.driver_id.trim().is_empty() {
        return Err("driverId is empty".to_string());
    }
    if entry.constructor_id.trim().is_empty() {
        return Err("constructorId is empty".to_string());
    }
    if entry.location.trim().is_empty() {
        return Err("location is empty".to_string());
    }
    if entry.grid < 1 {
        return Err(format!("grid must be >= 1, got {}", entry.grid));
    }
    Ok(())
}
