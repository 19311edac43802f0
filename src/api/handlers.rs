use axum::{
    extract::{multipart::Field, Multipart, State},
    http::StatusCode,
    response::Json,
    Json as RequestJson,
};
use serde::Serialize;
use std::sync::Arc;

use crate::engine::PredictionEngine;
use crate::gateway::{Gateway, GatewayError};
use crate::model::{
    Base64PredictRequest, PathPredictRequest, PredictionBatch, SharedMetadata, UploadPart,
};

pub type AppState<E> = Arc<Gateway<E>>;

/// Structured error body: a machine-distinguishable category plus a
/// human-readable detail string.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub category: String,
}

impl ErrorResponse {
    pub fn new(category: &str, message: &str) -> Self {
        Self {
            error: message.to_string(),
            category: category.to_string(),
        }
    }
}

/// HTTP mapping of the pipeline error taxonomy. This is the only place the
/// core errors meet status codes.
fn error_response(err: GatewayError) -> (StatusCode, Json<ErrorResponse>) {
    let status = match err {
        GatewayError::Validation(_) => StatusCode::BAD_REQUEST,
        GatewayError::UnsupportedMedia(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        GatewayError::Decode(_) => StatusCode::BAD_REQUEST,
        GatewayError::Engine(_) => StatusCode::BAD_GATEWAY,
        GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse::new(err.category(), &err.to_string())),
    )
}

/// Simple health check endpoint reporting the configured model.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub model: String,
    pub timestamp: String,
}

pub async fn health_check<E: PredictionEngine>(
    State(gateway): State<AppState<E>>,
) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        model: gateway.model_name().to_string(),
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

/// POST /predict — filepath-based instances.
pub async fn predict<E: PredictionEngine>(
    State(gateway): State<AppState<E>>,
    RequestJson(request): RequestJson<PathPredictRequest>,
) -> Result<Json<PredictionBatch>, (StatusCode, Json<ErrorResponse>)> {
    gateway
        .predict_paths(request)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /predict_upload — repeated `files` parts plus optional form fields
/// applied to the whole batch.
pub async fn predict_upload<E: PredictionEngine>(
    State(gateway): State<AppState<E>>,
    mut multipart: Multipart,
) -> Result<Json<PredictionBatch>, (StatusCode, Json<ErrorResponse>)> {
    let mut parts = Vec::new();
    let mut meta = SharedMetadata::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| error_response(GatewayError::Validation(err.to_string())))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "files" => {
                let filename = field.file_name().map(str::to_string);
                let content_type = field.content_type().map(str::to_string);
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|err| error_response(GatewayError::Validation(err.to_string())))?;
                parts.push(UploadPart {
                    filename,
                    content_type,
                    bytes: bytes.to_vec(),
                });
            }
            "country" => meta.country = Some(text_field(field).await?),
            "admin1_region" => meta.admin1_region = Some(text_field(field).await?),
            "latitude" => meta.latitude = Some(coordinate_field("latitude", field).await?),
            "longitude" => meta.longitude = Some(coordinate_field("longitude", field).await?),
            other => {
                log::debug!("ignoring unknown multipart field '{}'", other);
            }
        }
    }

    if parts.is_empty() {
        return Err(error_response(GatewayError::Validation(
            "missing 'files' field in request".to_string(),
        )));
    }

    gateway
        .predict_uploads(parts, meta)
        .await
        .map(Json)
        .map_err(error_response)
}

/// POST /predict_base64 — base64-embedded instances with per-record
/// metadata.
pub async fn predict_base64<E: PredictionEngine>(
    State(gateway): State<AppState<E>>,
    RequestJson(request): RequestJson<Base64PredictRequest>,
) -> Result<Json<PredictionBatch>, (StatusCode, Json<ErrorResponse>)> {
    gateway
        .predict_base64(request)
        .await
        .map(Json)
        .map_err(error_response)
}

async fn text_field(field: Field<'_>) -> Result<String, (StatusCode, Json<ErrorResponse>)> {
    field
        .text()
        .await
        .map_err(|err| error_response(GatewayError::Validation(err.to_string())))
}

async fn coordinate_field(
    name: &str,
    field: Field<'_>,
) -> Result<f64, (StatusCode, Json<ErrorResponse>)> {
    let raw = text_field(field).await?;
    raw.trim().parse::<f64>().map_err(|_| {
        error_response(GatewayError::Validation(format!(
            "invalid '{}' value '{}'",
            name, raw
        )))
    })
}
