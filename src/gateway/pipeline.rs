use std::path::PathBuf;

use crate::engine::PredictionEngine;
use crate::gateway::assemble::merge_extra_fields;
use crate::gateway::error::GatewayError;
use crate::gateway::normalize::{Base64Adapter, PathAdapter, UploadAdapter};
use crate::gateway::scratch::ScratchSpace;
use crate::model::{
    Base64PredictRequest, CanonicalInstance, InstanceBatch, PathPredictRequest, PredictionBatch,
    SharedMetadata, UploadPart,
};

/// One gateway serves every request; per-request state lives inside each
/// pipeline call. Configuration is injected once at construction and only
/// read afterwards, so handlers share nothing mutable.
///
/// Each call runs the same sequence: normalize, predict (single engine call
/// for the whole batch), assemble, clean up. Any failure short-circuits to
/// cleanup before the error propagates, and a dropped call future reaches
/// cleanup through `ScratchSpace`.
pub struct Gateway<E> {
    engine: E,
    extra_fields: Vec<String>,
    scratch_root: PathBuf,
}

impl<E: PredictionEngine> Gateway<E> {
    pub fn new(
        engine: E,
        extra_fields: Vec<String>,
        scratch_root: PathBuf,
    ) -> anyhow::Result<Self> {
        std::fs::create_dir_all(&scratch_root).map_err(|err| {
            anyhow::anyhow!(
                "failed to create scratch directory {}: {}",
                scratch_root.display(),
                err
            )
        })?;
        Ok(Self {
            engine,
            extra_fields,
            scratch_root,
        })
    }

    pub fn model_name(&self) -> &str {
        self.engine.model_name()
    }

    /// `POST /predict`: path passthrough. No temp storage, so no scratch
    /// scope either.
    pub async fn predict_paths(
        &self,
        request: PathPredictRequest,
    ) -> Result<PredictionBatch, GatewayError> {
        let instances = PathAdapter::normalize(request.instances)?;
        self.predict_batch(instances).await
    }

    /// `POST /predict_upload`: raw bytes materialized, batch-wide metadata.
    pub async fn predict_uploads(
        &self,
        parts: Vec<UploadPart>,
        meta: SharedMetadata,
    ) -> Result<PredictionBatch, GatewayError> {
        let scratch = ScratchSpace::new(&self.scratch_root);
        let normalized = UploadAdapter::normalize(parts, &meta, &scratch).await;
        self.finish(normalized, scratch).await
    }

    /// `POST /predict_base64`: decoded and re-encoded payloads materialized,
    /// per-record metadata.
    pub async fn predict_base64(
        &self,
        request: Base64PredictRequest,
    ) -> Result<PredictionBatch, GatewayError> {
        let scratch = ScratchSpace::new(&self.scratch_root);
        let normalized = Base64Adapter::normalize(request.instances, &scratch).await;
        self.finish(normalized, scratch).await
    }

    /// Tail of the temp-backed pipelines. Cleanup runs on every path out and
    /// never changes the outcome it accompanies.
    async fn finish(
        &self,
        normalized: Result<Vec<CanonicalInstance>, GatewayError>,
        scratch: ScratchSpace,
    ) -> Result<PredictionBatch, GatewayError> {
        let outcome = match normalized {
            Ok(instances) => self.predict_batch(instances).await,
            Err(err) => Err(err),
        };
        scratch.release_all().await;
        outcome
    }

    /// Single engine call for the whole batch, then keyed reassembly. Engine
    /// faults fail the batch together; no partial results.
    async fn predict_batch(
        &self,
        instances: Vec<CanonicalInstance>,
    ) -> Result<PredictionBatch, GatewayError> {
        log::debug!("predicting batch of {} instance(s)", instances.len());
        let batch = InstanceBatch { instances };
        let predictions = self
            .engine
            .predict(&batch)
            .await
            .map_err(|err| GatewayError::Engine(err.to_string()))?;
        Ok(merge_extra_fields(
            &batch.instances,
            predictions,
            &self.extra_fields,
        ))
    }
}
