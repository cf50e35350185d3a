//! Holdout Metrics
//!
//! Classification metrics for the win label: accuracy, log loss, precision
//! and recall at a fixed decision threshold.

use serde::{Deserialize, Serialize};

/// Probabilities are clipped to [EPS, 1 - EPS] before taking logs
pub const LOG_LOSS_EPS: f64 = 1e-15;

/// A predicted probability at or above this counts as a predicted win
pub const DECISION_THRESHOLD: f64 = 0.5;

/// Binary classification metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BinaryMetrics {
    pub accuracy: f64,
    pub log_loss: f64,
    pub precision: f64,
    pub recall: f64,
}

/// Mean binary cross-entropy
pub fn log_loss(labels: &[bool], probabilities: &[f64]) -> f64 {
    if labels.is_empty() {
        return 0.0;
    }
    let total: f64 = labels
        .iter()
        .zip(probabilities)
        .map(|(&won, &p)| {
            let p = p.clamp(LOG_LOSS_EPS, 1.0 - LOG_LOSS_EPS);
            if won {
                -p.ln()
            } else {
                -(1.0 - p).ln()
            }
        })
        .sum();
    total / labels.len() as f64
}

/// Calculate metrics from labels and aligned probabilities
pub fn binary_metrics(labels: &[bool], probabilities: &[f64]) -> BinaryMetrics {
    if labels.is_empty() {
        return BinaryMetrics::default();
    }

    let mut true_pos = 0usize;
    let mut false_pos = 0usize;
    let mut false_neg = 0usize;
    let mut correct = 0usize;

    for (&won, &p) in labels.iter().zip(probabilities) {
        let predicted = p >= DECISION_THRESHOLD;
        match (predicted, won) {
            (true, true) => true_pos += 1,
            (true, false) => false_pos += 1,
            (false, true) => false_neg += 1,
            (false, false) => {}
        }
        if predicted == won {
            correct += 1;
        }
    }

    // No predicted (or actual) positives gives 0 rather than NaN
    let ratio = |num: usize, den: usize| if den > 0 { num as f64 / den as f64 } else { 0.0 };

    BinaryMetrics {
        accuracy: correct as f64 / labels.len() as f64,
        log_loss: log_loss(labels, probabilities),
        precision: ratio(true_pos, true_pos + false_pos),
        recall: ratio(true_pos, true_pos + false_neg),
    }
}
