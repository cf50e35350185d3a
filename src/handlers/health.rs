use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::AppState;
use f1_predict::models::HealthResponse;

/// Health check endpoint
pub async fn health_check(state: web::Data<Arc<AppState>>) -> impl Responder {
    let service = state.predictor.current();
    let response = HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        classifier: service.classifier_name().to_string(),
        store_rows: service.store_rows(),
    };

    HttpResponse::Ok().json(response)
}
