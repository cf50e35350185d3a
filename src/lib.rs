//! F1 Predict - Formula 1 race win prediction
//!
//! This library provides:
//! - A causal feature pipeline: race ledger, per-entity running statistics,
//!   categorical encodings and a persisted Feature Store
//! - Inference preprocessing that rebuilds the training feature layout for an
//!   upcoming-race roster
//! - Win classifiers (ONNX models, or an explicit heuristic) and ranked output
//! - Time-based holdout evaluation
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use f1_predict::data::{FeatureStore, RaceLedger};
//! use f1_predict::models::RosterEntry;
//! use f1_predict::predictor::{HeuristicClassifier, PredictionService};
//!
//! let ledger = RaceLedger::load("data/processed/race_data.csv").unwrap();
//! let store = FeatureStore::build(&ledger).unwrap();
//! let service = PredictionService::new(Arc::new(store), Box::new(HeuristicClassifier::new()));
//!
//! let roster = vec![RosterEntry {
//!     driver_id: "VER".to_string(),
//!     constructor_id: "Red Bull Racing".to_string(),
//!     grid: 1,
//!     location: "Sakhir".to_string(),
//! }];
//! for result in service.predict(&roster).unwrap() {
//!     println!("{}: {:.3}", result.driver_id, result.win_probability);
//! }
//! ```

pub mod config;
pub mod core;
pub mod data;
pub mod error;
pub mod evaluation;
pub mod models;
pub mod predictor;
pub mod preprocess;

// Re-export commonly used types
pub use config::AppConfig;
pub use data::{FeatureStore, FeatureVector, RaceLedger, FEATURE_NAMES};
pub use error::PipelineError;
pub use models::{PredictionResult, RosterEntry};
pub use predictor::{
    HeuristicClassifier, OnnxClassifier, PredictionService, SharedPredictor, WinClassifier,
};
pub use preprocess::InferencePreprocessor;
