use actix_web::{web, HttpResponse};
use std::sync::Arc;
use tracing::{error, info};

use crate::AppState;
use f1_predict::error::AppError;
use f1_predict::models::ReloadResponse;
use f1_predict::predictor::PredictionService;

/// Reload store and classifier from the configured paths.
///
/// On failure the current snapshot keeps serving.
pub async fn reload(state: web::Data<Arc<AppState>>) -> Result<HttpResponse, AppError> {
    let config = state.config.clone();
    let service = web::block(move || PredictionService::load(&config))
        .await
        .map_err(|e| AppError::InternalError(e.to_string()))?
        .map_err(|e| {
            error!("Reload failed, keeping current snapshot: {}", e);
            AppError::from(e)
        })?;

    let store_rows = service.store_rows();
    state.predictor.replace(service);
    info!("Reloaded prediction service ({} store rows)", store_rows);

    Ok(HttpResponse::Ok().json(ReloadResponse {
        reloaded: true,
        store_rows,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handlers::test_support;
    use actix_web::{http::StatusCode, test, App};
    use f1_predict::config::{AppConfig, ModelKind};
    use f1_predict::data::{FeatureStore, RaceLedger};
    use f1_predict::models::{FinishPosition, RaceRecord};

    fn config_for(dir: &std::path::Path) -> AppConfig {
        let mut config = AppConfig::default();
        config.store.dir = dir.display().to_string();
        config.model.kind = ModelKind::Heuristic;
        config
    }

    #[actix_web::test]
    async fn test_failed_reload_keeps_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_support::state(config_for(&dir.path().join("missing")));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/admin/reload", web::post().to(reload)),
        )
        .await;

        let req = test::TestRequest::post().uri("/admin/reload").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(state.predictor.current().store_rows(), 4);
    }

    #[actix_web::test]
    async fn test_reload_swaps_in_new_store() {
        let dir = tempfile::tempdir().unwrap();
        let one_race = RaceLedger::new(vec![RaceRecord {
            race_id: "2024_1".to_string(),
            year: 2024,
            round: 1,
            driver_id: "NOR".to_string(),
            constructor_id: "McLaren".to_string(),
            grid: 1,
            finish: FinishPosition::Classified(1),
            points: 25.0,
            location: Some("Silverstone".to_string()),
        }]);
        FeatureStore::build(&one_race).unwrap().write(dir.path()).unwrap();

        let state = test_support::state(config_for(dir.path()));
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .route("/admin/reload", web::post().to(reload)),
        )
        .await;

        let req = test::TestRequest::post().uri("/admin/reload").to_request();
        let resp: ReloadResponse = test::call_and_read_body_json(&app, req).await;
        assert!(resp.reloaded);
        assert_eq!(resp.store_rows, 1);
        assert_eq!(state.predictor.current().list_known_drivers(), vec!["NOR"]);
    }
}
