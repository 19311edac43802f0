use anyhow::{Context, Result};

use crate::config::EngineConfig;
use crate::engine::traits::PredictionEngine;
use crate::model::{InstanceBatch, PredictionBatch};

/// Client for an upstream prediction service speaking the canonical batch
/// shape: POST `{"instances": [...]}` in, `{"predictions": [...]}` out.
///
/// The model identifier and geofence toggle are forwarded as query
/// parameters; the body stays exactly the canonical batch, and the service's
/// internals (model loading, geofencing policy) are opaque to this gateway.
pub struct RemoteEngine {
    client: reqwest::Client,
    endpoint: String,
    model_name: String,
    geofence: bool,
}

impl RemoteEngine {
    pub fn new(config: &EngineConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .build()
            .context("failed to build engine HTTP client")?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model_name: config.model.clone(),
            geofence: config.geofence,
        })
    }
}

#[async_trait::async_trait]
impl PredictionEngine for RemoteEngine {
    async fn predict(&self, batch: &InstanceBatch) -> Result<PredictionBatch> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[
                ("model", self.model_name.as_str()),
                ("geofence", if self.geofence { "true" } else { "false" }),
            ])
            .json(batch)
            .send()
            .await
            .context("prediction engine unreachable")?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            anyhow::bail!("prediction engine returned {}: {}", status, detail);
        }

        let predictions: PredictionBatch = response
            .json()
            .await
            .context("prediction engine returned an unreadable batch")?;
        Ok(predictions)
    }

    fn model_name(&self) -> &str {
        &self.model_name
    }
}
