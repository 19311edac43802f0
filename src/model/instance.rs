use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Engine-facing representation of one image plus its metadata, regardless
/// of the wire encoding it arrived in. Constructed by exactly one normalizer
/// adapter per incoming record and immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanonicalInstance {
    /// Locally resolvable reference to the image bytes. Unique within a
    /// batch; doubles as the join key when results come back.
    pub filepath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin1_region: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latitude: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub longitude: Option<f64>,
    /// Caller-declared fields carried through for re-attachment on the
    /// response. The engine never interprets these.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Body of `POST /predict`.
#[derive(Debug, Clone, Deserialize)]
pub struct PathPredictRequest {
    pub instances: Vec<PathInstance>,
}

/// One filepath-based record. `filepath` is optional here so the adapter can
/// reject its absence with a descriptive error instead of a generic
/// deserialization failure.
#[derive(Debug, Clone, Deserialize)]
pub struct PathInstance {
    pub filepath: Option<String>,
    pub country: Option<String>,
    pub admin1_region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// Body of `POST /predict_base64`. Metadata is per record here, unlike the
/// upload form where it applies to the whole batch.
#[derive(Debug, Clone, Deserialize)]
pub struct Base64PredictRequest {
    pub instances: Vec<Base64Instance>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Base64Instance {
    pub image_data: Option<String>,
    pub country: Option<String>,
    pub admin1_region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

/// One multipart file part, detached from the transport extractor.
#[derive(Debug, Clone)]
pub struct UploadPart {
    pub filename: Option<String>,
    pub content_type: Option<String>,
    pub bytes: Vec<u8>,
}

/// Form-level metadata of an upload request, applied uniformly to every
/// file in the batch.
#[derive(Debug, Clone, Default)]
pub struct SharedMetadata {
    pub country: Option<String>,
    pub admin1_region: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}
