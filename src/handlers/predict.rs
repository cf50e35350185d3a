use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::AppState;
use f1_predict::error::AppError;
use f1_predict::models::RosterEntry;

/// JSON extractor config: malformed bodies become validation errors
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| {
        warn!("Rejected request body: {}", err);
        AppError::ValidationError(err.to_string()).into()
    })
}

/// Rank a roster by win probability
pub async fn predict_race(
    state: web::Data<Arc<AppState>>,
    roster: web::Json<Vec<RosterEntry>>,
) -> Result<HttpResponse, AppError> {
    // Hold one snapshot for the whole request
    let service = state.predictor.current();
    debug!("Predicting roster of {} entries", roster.len());

    let results = service.predict(&roster).map_err(|e| {
        warn!("Prediction failed: {}", e);
        AppError::from(e)
    })?;

    Ok(HttpResponse::Ok().json(results))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use actix_web::{http::StatusCode, test, App};
    use f1_predict::config::AppConfig;
    use f1_predict::models::{ErrorResponse, PredictionResult};
    use serde_json::json;

    macro_rules! app {
        () => {
            test::init_service(
                App::new()
                    .app_data(web::Data::new(test_support::state(AppConfig::default())))
                    .app_data(json_config())
                    .route("/predict", web::post().to(predict_race)),
            )
            .await
        };
    }

    #[actix_web::test]
    async fn test_predict_ranks_roster() {
        let app = app!();
        let body = json!([
            {"driverId": "LEC", "constructorId": "Ferrari", "grid": 3, "location": "Monza"},
            {"driverId": "VER", "constructorId": "Red Bull Racing", "grid": 1, "Location": "Monza"},
            {"driverId": "NEW", "constructorId": "Haas", "grid": 20, "location": "Las Vegas"}
        ]);
        let req = test::TestRequest::post().uri("/predict").set_json(&body).to_request();
        let results: Vec<PredictionResult> = test::call_and_read_body_json(&app, req).await;

        assert_eq!(results.len(), 3);
        assert_eq!(results[2].driver_id, "NEW");
        assert!(results
            .windows(2)
            .all(|w| w[0].win_probability >= w[1].win_probability));
    }

    #[actix_web::test]
    async fn test_predict_invalid_grid_is_bad_request() {
        let app = app!();
        let body = json!([
            {"driverId": "VER", "constructorId": "Red Bull Racing", "grid": 0, "location": "Monza"}
        ]);
        let req = test::TestRequest::post().uri("/predict").set_json(&body).to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let err: ErrorResponse = test::read_body_json(resp).await;
        assert_eq!(err.error, "validation_error");
    }

    #[actix_web::test]
    async fn test_predict_malformed_body_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!({"driverId": "VER"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn test_predict_empty_roster_is_bad_request() {
        let app = app!();
        let req = test::TestRequest::post()
            .uri("/predict")
            .set_json(json!([]))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }
}
