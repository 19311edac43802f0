use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::api::handlers;
use crate::engine::PredictionEngine;
use crate::gateway::Gateway;

pub fn create_router<E: PredictionEngine + 'static>() -> Router<Arc<Gateway<E>>> {
    Router::new()
        // Health check
        .route("/health", get(handlers::health_check::<E>))
        // Prediction endpoints, one per input encoding
        .route("/predict", post(handlers::predict::<E>))
        .route("/predict_upload", post(handlers::predict_upload::<E>))
        .route("/predict_base64", post(handlers::predict_base64::<E>))
}
