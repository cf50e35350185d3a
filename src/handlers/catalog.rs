//! Known-entity listings from the loaded Feature Store

use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;

use crate::AppState;

pub async fn list_drivers(state: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok().json(state.predictor.current().list_known_drivers())
}

pub async fn list_constructors(state: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok().json(state.predictor.current().list_known_constructors())
}

pub async fn list_locations(state: web::Data<Arc<AppState>>) -> impl Responder {
    HttpResponse::Ok().json(state.predictor.current().list_known_locations())
}
