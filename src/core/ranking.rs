//! Ranking Formatter

use crate::error::PipelineError;
use crate::models::PredictionResult;

/// Pair driver ids with probabilities and sort by probability descending.
///
/// The sort is stable: entries with equal probability keep roster order.
/// Non-finite probabilities are rejected.
pub fn rank<S: AsRef<str>>(
    driver_ids: &[S],
    probabilities: &[f64],
) -> Result<Vec<PredictionResult>, PipelineError> {
    if driver_ids.len() != probabilities.len() {
        return Err(PipelineError::LengthMismatch {
            expected: driver_ids.len(),
            actual: probabilities.len(),
        });
    }

    if let Some(i) = probabilities.iter().position(|p| !p.is_finite()) {
        return Err(PipelineError::Classifier(format!(
            "probability at entry {} is not finite",
            i
        )));
    }

    let mut results: Vec<PredictionResult> = driver_ids
        .iter()
        .zip(probabilities)
        .map(|(id, &p)| PredictionResult {
            driver_id: id.as_ref().to_string(),
            win_probability: p,
        })
        .collect();

    results.sort_by(|a, b| b.win_probability.total_cmp(&a.win_probability));

    Ok(results)
}
