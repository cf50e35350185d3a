//! Ledger loading and feature engineering modules

pub mod accumulator;
pub mod encoder;
pub mod features;
pub mod ledger;
pub mod store;
pub(crate) mod table;

#[cfg(test)]
pub(crate) mod fixtures;

// Re-export commonly used types
pub use accumulator::{MetricAccumulator, RaceMetrics, RECENT_WINDOW};
pub use encoder::{CategoryEncoding, EncodingTable, UNSEEN_CODE};
pub use features::{
    to_row_major_f32, FeatureVector, FEATURE_NAMES, NO_HISTORY_FORM, NO_HISTORY_POINTS,
    NO_HISTORY_WIN_RATE, NUM_FEATURES,
};
pub use ledger::RaceLedger;
pub use store::{FeatureRow, FeatureStore, LatestSnapshots, StoreManifest};
