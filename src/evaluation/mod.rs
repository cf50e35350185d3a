//! Time-based holdout evaluation of a win classifier on the Feature Store

pub mod metrics;

pub use metrics::{binary_metrics, log_loss, BinaryMetrics, DECISION_THRESHOLD, LOG_LOSS_EPS};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::core::ranking::rank;
use crate::data::features::FeatureVector;
use crate::data::store::{FeatureRow, FeatureStore};
use crate::error::PipelineError;
use crate::predictor::{check_output, WinClassifier};

/// Holdout evaluation result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub test_year: i32,
    pub train_rows: usize,
    pub rows: usize,
    pub races: usize,
    pub accuracy: f64,
    pub log_loss: f64,
    pub precision: f64,
    pub recall: f64,
    /// Fraction of races whose top-ranked driver won
    pub top_pick_hit_rate: f64,
}

/// Split rows into (year < test_year, year == test_year)
pub fn split_by_year(rows: &[FeatureRow], test_year: i32) -> (Vec<&FeatureRow>, Vec<&FeatureRow>) {
    let train = rows.iter().filter(|r| r.year < test_year).collect();
    let test = rows.iter().filter(|r| r.year == test_year).collect();
    (train, test)
}

/// Score `classifier` on every store row from `test_year`
pub fn evaluate(
    store: &FeatureStore,
    classifier: &dyn WinClassifier,
    test_year: i32,
) -> Result<EvaluationReport, PipelineError> {
    let (train, test) = split_by_year(store.rows(), test_year);
    if test.is_empty() {
        return Err(PipelineError::EmptyEvaluation(test_year));
    }

    let vectors: Vec<FeatureVector> = test.iter().map(|r| r.feature_vector()).collect();
    let labels: Vec<bool> = test.iter().map(|r| r.is_winner).collect();
    let probabilities = classifier.predict_probability(&vectors)?;
    check_output(&probabilities, vectors.len())?;

    let mut races: BTreeMap<(i32, u32), Vec<usize>> = BTreeMap::new();
    for (i, row) in test.iter().enumerate() {
        races.entry(row.race_key()).or_default().push(i);
    }

    let mut hits = 0usize;
    for indices in races.values() {
        let ids: Vec<&str> = indices.iter().map(|&i| test[i].driver_id.as_str()).collect();
        let probs: Vec<f64> = indices.iter().map(|&i| probabilities[i]).collect();
        let ranked = rank(&ids, &probs)?;
        if let Some(top) = ranked.first() {
            if indices
                .iter()
                .any(|&i| test[i].is_winner && test[i].driver_id == top.driver_id)
            {
                hits += 1;
            }
        }
    }

    let m = binary_metrics(&labels, &probabilities);
    let report = EvaluationReport {
        test_year,
        train_rows: train.len(),
        rows: test.len(),
        races: races.len(),
        accuracy: m.accuracy,
        log_loss: m.log_loss,
        precision: m.precision,
        recall: m.recall,
        top_pick_hit_rate: hits as f64 / races.len() as f64,
    };

    info!(
        "Evaluated {} on {}: {} rows, accuracy {:.3}, log loss {:.4}",
        classifier.name(),
        test_year,
        report.rows,
        report.accuracy,
        report.log_loss
    );
    Ok(report)
}
