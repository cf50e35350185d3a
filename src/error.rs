use polars::prelude::PolarsError;
use thiserror::Error;

#[cfg(feature = "api")]
use actix_web::{http::StatusCode, HttpResponse, ResponseError};
#[cfg(feature = "api")]
use std::fmt;

#[cfg(feature = "api")]
use crate::models::ErrorResponse;

/// Errors raised by the feature pipeline and inference core
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Polars(#[from] PolarsError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Race ledger is empty")]
    EmptyLedger,

    #[error("Feature store not found at {0}")]
    StoreNotFound(String),

    #[error("Feature store is corrupt: {0}")]
    CorruptStore(String),

    #[error("Encoding conflict in {category}: {detail}")]
    EncodingConflict { category: String, detail: String },

    #[error("Invalid roster entry {index}: {reason}")]
    InvalidRoster { index: usize, reason: String },

    #[error("Classifier error: {0}")]
    Classifier(String),

    #[error("Length mismatch: expected {expected}, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("No feature store rows for year {0}")]
    EmptyEvaluation(i32),
}

impl PipelineError {
    /// True for errors caused by the request rather than the loaded state
    pub fn is_client_error(&self) -> bool {
        matches!(self, PipelineError::InvalidRoster { .. })
    }
}

/// Application error types
#[cfg(feature = "api")]
#[derive(Debug)]
pub enum AppError {
    /// Invalid request data
    ValidationError(String),
    /// Model or prediction error
    PredictionError(String),
    /// Internal server error
    InternalError(String),
}

#[cfg(feature = "api")]
impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Validation error: {}", msg),
            AppError::PredictionError(msg) => write!(f, "Prediction error: {}", msg),
            AppError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

#[cfg(feature = "api")]
impl std::error::Error for AppError {}

#[cfg(feature = "api")]
impl From<PipelineError> for AppError {
    fn from(err: PipelineError) -> Self {
        if err.is_client_error() {
            AppError::ValidationError(err.to_string())
        } else {
            match &err {
                PipelineError::Classifier(_) | PipelineError::LengthMismatch { .. } => {
                    AppError::PredictionError(err.to_string())
                }
                _ => AppError::InternalError(err.to_string()),
            }
        }
    }
}

#[cfg(feature = "api")]
impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::PredictionError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::InternalError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let (error_code, message) = match self {
            AppError::ValidationError(msg) => ("validation_error", msg.clone()),
            AppError::PredictionError(msg) => ("prediction_error", msg.clone()),
            AppError::InternalError(msg) => ("internal_error", msg.clone()),
        };

        HttpResponse::build(self.status_code()).json(ErrorResponse {
            error: error_code.to_string(),
            message,
        })
    }
}
