use tracing::warn;

use crate::models::Operation;
use crate::services::content_store::{ContentStore, StoreError};
use crate::services::op_engine;

/// Result of running one edit through the store
pub struct AppliedEdit {
    /// The edit as applied, with offsets clamped to the snapshot it was applied to
    pub operation: Operation,
    pub persisted: Result<(), StoreError>,
}

/// Read the current content, apply `operation` and write the result back to the cache tier.
///
/// There is no per-document lock around this sequence: two edits of the same document that
/// interleave read the same snapshot and the later write wins. Unsupported operations are
/// not applied and return `None`.
pub async fn apply_edit(
    store: &ContentStore,
    room_code: &str,
    doc_id: i64,
    operation: &Operation,
) -> Option<AppliedEdit> {
    if !operation.is_supported() {
        warn!("Unsupported operation for document {} in room {}, ignored", doc_id, room_code);
        return None;
    }

    let current = store.get(room_code, doc_id).await;
    let normalized = op_engine::normalize(&current, operation);
    let content = op_engine::apply(&current, &normalized);
    let persisted = store.set(room_code, doc_id, content).await;

    Some(AppliedEdit {
        operation: normalized,
        persisted,
    })
}
