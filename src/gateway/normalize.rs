use base64::{engine::general_purpose, Engine as _};
use itertools::Itertools;
use std::collections::HashMap;
use std::io::Cursor;

use crate::gateway::error::GatewayError;
use crate::gateway::scratch::ScratchSpace;
use crate::model::{
    Base64Instance, CanonicalInstance, PathInstance, SharedMetadata, UploadPart,
};

/// Adapter for `POST /predict`: caller-supplied paths pass through verbatim.
/// No temp files are created; the engine is trusted to resolve caller-owned
/// storage.
pub struct PathAdapter;

impl PathAdapter {
    pub fn normalize(records: Vec<PathInstance>) -> Result<Vec<CanonicalInstance>, GatewayError> {
        let mut instances = Vec::with_capacity(records.len());
        for record in records {
            let filepath = record.filepath.ok_or_else(|| {
                GatewayError::Validation("missing 'filepath' field in instance".to_string())
            })?;
            instances.push(CanonicalInstance {
                filepath,
                country: record.country,
                admin1_region: record.admin1_region,
                latitude: record.latitude,
                longitude: record.longitude,
                extra: record.extra,
            });
        }
        ensure_unique_paths(&instances)?;
        Ok(instances)
    }
}

/// Adapter for `POST /predict_upload`: each accepted part is written
/// verbatim to a fresh scratch file. Form-level metadata applies to the
/// whole batch, not per file.
pub struct UploadAdapter;

impl UploadAdapter {
    pub async fn normalize(
        parts: Vec<UploadPart>,
        meta: &SharedMetadata,
        scratch: &ScratchSpace,
    ) -> Result<Vec<CanonicalInstance>, GatewayError> {
        let mut instances = Vec::with_capacity(parts.len());
        for (index, part) in parts.into_iter().enumerate() {
            let is_image = part
                .content_type
                .as_deref()
                .map(|ct| ct.starts_with("image/"))
                .unwrap_or(false);
            if !is_image {
                let name = part.filename.as_deref().unwrap_or("<unnamed>");
                return Err(GatewayError::UnsupportedMedia(format!(
                    "file '{}' is not an image",
                    name
                )));
            }

            let path = scratch
                .materialize(&format!("_{}.jpg", index), part.bytes)
                .await?;
            instances.push(CanonicalInstance {
                filepath: path.to_string_lossy().into_owned(),
                country: meta.country.clone(),
                admin1_region: meta.admin1_region.clone(),
                latitude: meta.latitude,
                longitude: meta.longitude,
                extra: HashMap::new(),
            });
        }
        ensure_unique_paths(&instances)?;
        Ok(instances)
    }
}

/// Adapter for `POST /predict_base64`: decode, normalize to a single-frame
/// RGB JPEG, and materialize each record. Metadata is per record here,
/// unlike the upload adapter.
pub struct Base64Adapter;

impl Base64Adapter {
    pub async fn normalize(
        records: Vec<Base64Instance>,
        scratch: &ScratchSpace,
    ) -> Result<Vec<CanonicalInstance>, GatewayError> {
        let mut instances = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            let payload = record.image_data.ok_or_else(|| {
                GatewayError::Validation("missing 'image_data' field in instance".to_string())
            })?;

            let jpeg = reencode_jpeg(&payload)?;
            let path = scratch.materialize(&format!("_{}.jpg", index), jpeg).await?;
            instances.push(CanonicalInstance {
                filepath: path.to_string_lossy().into_owned(),
                country: record.country,
                admin1_region: record.admin1_region,
                latitude: record.latitude,
                longitude: record.longitude,
                extra: record.extra,
            });
        }
        ensure_unique_paths(&instances)?;
        Ok(instances)
    }
}

/// Base64 -> image decode -> RGB8 -> JPEG bytes. Multi-frame inputs collapse
/// to the decoded still image, so the engine always sees one frame.
fn reencode_jpeg(payload: &str) -> Result<Vec<u8>, GatewayError> {
    let bytes = general_purpose::STANDARD
        .decode(payload)
        .map_err(|err| GatewayError::Decode(err.to_string()))?;
    let decoded =
        image::load_from_memory(&bytes).map_err(|err| GatewayError::Decode(err.to_string()))?;
    let rgb = decoded.to_rgb8();

    let mut out = Cursor::new(Vec::new());
    rgb.write_to(&mut out, image::ImageFormat::Jpeg)
        .map_err(|err| GatewayError::Decode(err.to_string()))?;
    Ok(out.into_inner())
}

/// Duplicate paths would collide on the single join key downstream, so the
/// batch is rejected before any temp file reaches the engine.
fn ensure_unique_paths(instances: &[CanonicalInstance]) -> Result<(), GatewayError> {
    if let Some(dup) = instances
        .iter()
        .map(|instance| instance.filepath.as_str())
        .duplicates()
        .next()
    {
        return Err(GatewayError::Validation(format!(
            "duplicate filepath '{}' in batch",
            dup
        )));
    }
    Ok(())
}
