use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::model::CanonicalInstance;

/// Canonical batch submitted to the prediction engine in a single call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceBatch {
    pub instances: Vec<CanonicalInstance>,
}

/// Final response envelope, and also the shape the engine hands back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionBatch {
    pub predictions: Vec<PredictionRecord>,
}

/// One engine output, correlated to its instance by `filepath`. Either the
/// prediction fields are populated or `failures` lists why they are not;
/// per-image engine faults ride inline here rather than failing the request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionRecord {
    pub filepath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_score: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prediction_source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub classifications: Option<Classifications>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detections: Option<Vec<Detection>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failures: Option<Vec<String>>,
    /// Extra fields re-attached by the response assembler, plus anything
    /// engine-side this gateway does not model.
    #[serde(flatten)]
    pub extra: HashMap<String, serde_json::Value>,
}

impl PredictionRecord {
    /// Empty record for `filepath`; the producer fills in the rest.
    pub fn new(filepath: impl Into<String>) -> Self {
        Self {
            filepath: filepath.into(),
            prediction: None,
            prediction_score: None,
            prediction_source: None,
            classifications: None,
            detections: None,
            failures: None,
            extra: HashMap::new(),
        }
    }

    /// Record representing a per-image failure.
    pub fn failed(filepath: impl Into<String>, reasons: Vec<String>) -> Self {
        let mut record = Self::new(filepath);
        record.failures = Some(reasons);
        record
    }
}

/// Ranked classifier output, classes and scores index-aligned.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Classifications {
    pub classes: Vec<String>,
    pub scores: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Detection {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    pub label: String,
    pub conf: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
}
