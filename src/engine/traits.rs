use crate::model::{InstanceBatch, PredictionBatch};
use anyhow::Result;

/// Single opaque call boundary to the external prediction engine.
///
/// One call per inbound batch, at most once: the gateway never splits,
/// retries, or streams. A fault fails the whole batch; per-image problems
/// come back inline as records with `failures` set. Implementations must be
/// internally synchronized; the gateway calls them concurrently across
/// requests without coordination.
#[async_trait::async_trait]
pub trait PredictionEngine: Send + Sync {
    async fn predict(&self, batch: &InstanceBatch) -> Result<PredictionBatch>;

    /// Identifier of the model behind this engine, reported by `/health`.
    fn model_name(&self) -> &str;
}
