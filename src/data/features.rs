//! Feature vector layout and missing-value defaults
//!
//! Both the store build path and the roster path produce `FeatureVector`s, so
//! field order and fill values live here and nowhere else.

use serde::{Deserialize, Serialize};

/// Number of model input features
pub const NUM_FEATURES: usize = 8;

/// Feature names in model input order
pub const FEATURE_NAMES: [&str; NUM_FEATURES] = [
    "grid",
    "driver_win_rate",
    "driver_recent_form",
    "constructor_win_rate",
    "constructor_recent_points",
    "location_id",
    "driver_id_enc",
    "constructor_id_enc",
];

/// Win rate for an entity with no history
pub const NO_HISTORY_WIN_RATE: f64 = 0.0;

/// Recent form for a driver with no history: worse than any real finish.
/// Used for the store fill and the inference fallback alike.
pub const NO_HISTORY_FORM: f64 = 20.0;

/// Recent points for a constructor with no history
pub const NO_HISTORY_POINTS: f64 = 0.0;

/// Model input for one driver entry
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub grid: f64,
    pub driver_win_rate: f64,
    pub driver_recent_form: f64,
    pub constructor_win_rate: f64,
    pub constructor_recent_points: f64,
    pub location_id: f64,
    pub driver_id_enc: f64,
    pub constructor_id_enc: f64,
}

impl FeatureVector {
    /// Flatten in `FEATURE_NAMES` order
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.grid,
            self.driver_win_rate,
            self.driver_recent_form,
            self.constructor_win_rate,
            self.constructor_recent_points,
            self.location_id,
            self.driver_id_enc,
            self.constructor_id_enc,
        ]
    }
}

/// Flatten a batch into a row-major f32 matrix for model input
pub fn to_row_major_f32(vectors: &[FeatureVector]) -> Vec<f32> {
    vectors
        .iter()
        .flat_map(|v| v.to_array())
        .map(|x| x as f32)
        .collect()
}
