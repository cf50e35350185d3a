use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{info, warn};

use crate::config::{AppConfig, ModelKind};
use crate::core::ranking::rank;
use crate::data::features::{to_row_major_f32, FeatureVector, FEATURE_NAMES, NUM_FEATURES};
use crate::data::store::FeatureStore;
use crate::error::PipelineError;
use crate::models::{PredictionResult, RosterEntry};
use crate::preprocess::InferencePreprocessor;

/// Binary win classifier over feature vectors
pub trait WinClassifier: Send + Sync {
    /// Win probability per vector, aligned with the input
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PipelineError>;

    fn name(&self) -> &str;
}

/// Training metadata shipped next to the model
#[derive(Debug, Deserialize)]
struct ModelMeta {
    feat_list: Vec<String>,
    in_dim: Option<usize>,
}

impl ModelMeta {
    fn check(&self) -> Result<(), PipelineError> {
        if self.feat_list != FEATURE_NAMES {
            return Err(PipelineError::Classifier(format!(
                "model was trained on {:?}, expected {:?}",
                self.feat_list, FEATURE_NAMES
            )));
        }
        let in_dim = self.in_dim.unwrap_or(self.feat_list.len());
        if in_dim != NUM_FEATURES {
            return Err(PipelineError::Classifier(format!(
                "model input width {} does not match {}",
                in_dim, NUM_FEATURES
            )));
        }
        Ok(())
    }
}

/// ONNX-based win classifier
pub struct OnnxClassifier {
    session: Mutex<Session>,
}

impl OnnxClassifier {
    /// Load an ONNX model, checking its metadata when a meta path is given
    pub fn load<P: AsRef<Path>>(model_path: P, meta_path: Option<&Path>) -> Result<Self, PipelineError> {
        let model_path = model_path.as_ref();

        if let Some(meta_path) = meta_path {
            let meta: ModelMeta = serde_json::from_str(&fs::read_to_string(meta_path)?)?;
            meta.check()?;
            info!("Model metadata OK: {:?}", meta_path);
        }

        info!("Loading model: {:?}", model_path);
        let session = build_session(model_path).map_err(|e| {
            PipelineError::Classifier(format!("failed to load {:?}: {}", model_path, e))
        })?;

        Ok(Self {
            session: Mutex::new(session),
        })
    }
}

fn build_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .commit_from_file(model_path)?;
    Ok(session)
}

impl WinClassifier for OnnxClassifier {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PipelineError> {
        let n = features.len();
        let input_tensor = Tensor::from_array(([n, NUM_FEATURES], to_row_major_f32(features)))
            .map_err(|e| PipelineError::Classifier(e.to_string()))?;

        let mut session = self
            .session
            .lock()
            .map_err(|e| PipelineError::Classifier(format!("failed to lock session: {}", e)))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| PipelineError::Classifier(e.to_string()))?;

        // Output 0 is the predicted label, output 1 the class probabilities
        let index = if outputs.len() > 1 { 1 } else { 0 };
        let (shape, data) = outputs[index]
            .try_extract_tensor::<f32>()
            .map_err(|e| PipelineError::Classifier(e.to_string()))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let width = match dims.as_slice() {
            [rows] if *rows as usize == n => 1,
            [rows, cols] if *rows as usize == n && (*cols == 1 || *cols == 2) => *cols as usize,
            _ => {
                return Err(PipelineError::Classifier(format!(
                    "unexpected output shape {:?} for {} rows",
                    dims, n
                )))
            }
        };

        // With two columns the positive class is the second
        Ok((0..n)
            .map(|i| data[i * width + width - 1] as f64)
            .collect())
    }

    fn name(&self) -> &str {
        "onnx"
    }
}

/// Logistic score over grid, win rates and recent form.
///
/// Only used when configured explicitly; never stands in for a missing model.
#[derive(Debug, Clone, Default)]
pub struct HeuristicClassifier;

impl HeuristicClassifier {
    pub fn new() -> Self {
        Self
    }

    fn score(v: &FeatureVector) -> f64 {
        let z = -2.0 - 0.25 * (v.grid - 1.0)
            + 3.0 * v.driver_win_rate
            + 2.0 * v.constructor_win_rate
            + 1.5 * (20.0 - v.driver_recent_form) / 19.0
            + 0.05 * v.constructor_recent_points;
        1.0 / (1.0 + (-z).exp())
    }
}

impl WinClassifier for HeuristicClassifier {
    fn predict_probability(&self, features: &[FeatureVector]) -> Result<Vec<f64>, PipelineError> {
        Ok(features.iter().map(Self::score).collect())
    }

    fn name(&self) -> &str {
        "heuristic"
    }
}

/// Reject classifier output that is misaligned or not a probability
pub(crate) fn check_output(probabilities: &[f64], expected: usize) -> Result<(), PipelineError> {
    if probabilities.len() != expected {
        return Err(PipelineError::Classifier(format!(
            "returned {} probabilities for {} entries",
            probabilities.len(),
            expected
        )));
    }
    if let Some((i, p)) = probabilities
        .iter()
        .enumerate()
        .find(|(_, p)| !p.is_finite() || !(0.0..=1.0).contains(*p))
    {
        return Err(PipelineError::Classifier(format!(
            "probability {} at entry {} is outside [0, 1]",
            p, i
        )));
    }
    Ok(())
}

/// Loaded store, preprocessor and classifier for one serving snapshot
pub struct PredictionService {
    store: Arc<FeatureStore>,
    preprocessor: InferencePreprocessor,
    classifier: Box<dyn WinClassifier>,
}

impl PredictionService {
    pub fn new(store: Arc<FeatureStore>, classifier: Box<dyn WinClassifier>) -> Self {
        let preprocessor = InferencePreprocessor::new(&store);
        Self {
            store,
            preprocessor,
            classifier,
        }
    }

    /// Load the store and the configured classifier
    pub fn load(config: &AppConfig) -> Result<Self, PipelineError> {
        let store = FeatureStore::load(&config.store.dir)?;
        let classifier: Box<dyn WinClassifier> = match config.model.kind {
            ModelKind::Onnx => Box::new(OnnxClassifier::load(
                &config.model.path,
                config.model.meta_path.as_deref().map(Path::new),
            )?),
            ModelKind::Heuristic => {
                warn!("Serving the heuristic classifier; no model is loaded");
                Box::new(HeuristicClassifier::new())
            }
        };

        info!(
            "Prediction service ready: {} store rows, {} classifier",
            store.len(),
            classifier.name()
        );
        Ok(Self::new(Arc::new(store), classifier))
    }

    /// Win probabilities for a roster, most likely winner first
    pub fn predict(&self, roster: &[RosterEntry]) -> Result<Vec<PredictionResult>, PipelineError> {
        let vectors = self.preprocessor.preprocess(roster)?;
        let probabilities = self.classifier.predict_probability(&vectors)?;
        check_output(&probabilities, vectors.len())?;

        let ids: Vec<&str> = roster.iter().map(|e| e.driver_id.trim()).collect();
        rank(&ids, &probabilities)
    }

    pub fn preprocessor(&self) -> &InferencePreprocessor {
        &self.preprocessor
    }

    pub fn store(&self) -> &FeatureStore {
        &self.store
    }

    pub fn classifier_name(&self) -> &str {
        self.classifier.name()
    }

    pub fn store_rows(&self) -> usize {
        self.store.len()
    }

    pub fn list_known_drivers(&self) -> Vec<String> {
        self.store.known_drivers()
    }

    pub fn list_known_constructors(&self) -> Vec<String> {
        self.store.known_constructors()
    }

    pub fn list_known_locations(&self) -> Vec<String> {
        self.store.known_locations()
    }
}

/// Swappable serving snapshot shared across request handlers
pub struct SharedPredictor {
    inner: RwLock<Arc<PredictionService>>,
}

impl SharedPredictor {
    pub fn new(service: PredictionService) -> Self {
        Self {
            inner: RwLock::new(Arc::new(service)),
        }
    }

    /// Current snapshot; callers keep it for the whole request
    pub fn current(&self) -> Arc<PredictionService> {
        let guard = self.inner.read().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(&guard)
    }

    /// Swap in a new snapshot
    pub fn replace(&self, service: PredictionService) {
        let service = Arc::new(service);
        *self.inner.write().unwrap_or_else(PoisonError::into_inner) = service;
    }
}
