use std::collections::HashMap;

use crate::model::{CanonicalInstance, PredictionBatch, PredictionRecord};

/// Re-attach declared extra fields to the engine's records, joined on
/// `filepath`.
///
/// The merge is keyed, not positional: records are indexed by path (last
/// write wins on duplicate keys), each instance's declared extras are copied
/// onto the record at its own path, and paths the engine dropped are skipped
/// silently. Output order is map-iteration order, which need not match
/// submission order.
pub fn merge_extra_fields(
    instances: &[CanonicalInstance],
    batch: PredictionBatch,
    extra_fields: &[String],
) -> PredictionBatch {
    let mut by_path: HashMap<String, PredictionRecord> =
        HashMap::with_capacity(batch.predictions.len());
    for record in batch.predictions {
        by_path.insert(record.filepath.clone(), record);
    }

    for instance in instances {
        let Some(record) = by_path.get_mut(&instance.filepath) else {
            continue;
        };
        for field in extra_fields {
            if let Some(value) = instance.extra.get(field) {
                record.extra.insert(field.clone(), value.clone());
            }
        }
    }

    PredictionBatch {
        predictions: by_path.into_values().collect(),
    }
}
