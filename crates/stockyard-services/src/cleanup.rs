//! Compensating storage deletes.
//!
//! Used after a failed upload and after record deletion. Every helper here
//! returns `()`: a failed delete is logged and can never change the outcome of
//! the operation that triggered it.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use stockyard_storage::Storage;

const MAX_PARALLEL_DELETES: usize = 8;

/// Delete one object, logging instead of failing.
pub async fn delete_object_best_effort(storage: &Arc<dyn Storage>, storage_key: &str) {
    if let Err(e) = storage.delete(storage_key).await {
        tracing::warn!(
            error = %e,
            storage_key = %storage_key,
            "Compensating delete failed, object may be orphaned"
        );
    }
}

/// Delete every listed object, logging each failure.
pub async fn delete_objects_best_effort<I, S>(storage: &Arc<dyn Storage>, storage_keys: I)
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let keys: Vec<String> = storage_keys
        .into_iter()
        .map(|k| k.as_ref().to_string())
        .filter(|k| !k.is_empty())
        .collect();

    if keys.is_empty() {
        return;
    }
    tracing::debug!(count = keys.len(), "Deleting storage objects");

    stream::iter(keys)
        .map(|key| {
            let storage = storage.clone();
            async move { delete_object_best_effort(&storage, &key).await }
        })
        .buffer_unordered(MAX_PARALLEL_DELETES)
        .collect::<Vec<_>>()
        .await;
}
