use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod handlers;

use f1_predict::config::AppConfig;
use f1_predict::predictor::{PredictionService, SharedPredictor};
use handlers::{catalog, health, predict, reload};

/// Application state shared across handlers
pub struct AppState {
    pub predictor: SharedPredictor,
    pub config: AppConfig,
}

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;
    let addr = format!("{}:{}", config.server.host, config.server.port);

    info!("Loading feature store from {:?}", config.store.dir);
    let service = PredictionService::load(&config).context("Failed to load prediction service")?;

    let app_state = Arc::new(AppState {
        predictor: SharedPredictor::new(service),
        config,
    });

    info!("Starting F1 prediction API server at http://{}", addr);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(app_state.clone()))
            .app_data(predict::json_config())
            .wrap(middleware::Logger::default())
            .route("/health", web::get().to(health::health_check))
            .route("/drivers", web::get().to(catalog::list_drivers))
            .route("/constructors", web::get().to(catalog::list_constructors))
            .route("/locations", web::get().to(catalog::list_locations))
            .route("/predict", web::post().to(predict::predict_race))
            .route("/admin/reload", web::post().to(reload::reload))
    })
    .bind(&addr)
    .with_context(|| format!("Failed to bind {}", addr))?
    .run()
    .await?;

    Ok(())
}
