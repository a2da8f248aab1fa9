//! Shared key generation for storage backends.
//!
//! Key format: `assets/{tenant_id}/{parent_id}/{filename}`.

use uuid::Uuid;

use crate::{StorageError, StorageResult};

/// Generate a storage key for the given tenant, parent record and filename.
///
/// The filename must be a single path component.
pub fn generate_storage_key(
    tenant_id: Uuid,
    parent_id: Uuid,
    filename: &str,
) -> StorageResult<String> {
    if filename.is_empty()
        || filename.contains('/')
        || filename.contains('\\')
        || filename.contains("..")
    {
        return Err(StorageError::InvalidKey(format!(
            "Filename {:?} is not a single path component",
            filename
        )));
    }
    Ok(format!("assets/{}/{}/{}", tenant_id, parent_id, filename))
}

/// Reject keys that could escape the storage root.
pub fn validate_key(storage_key: &str) -> StorageResult<()> {
    if storage_key.is_empty() || storage_key.contains("..") || storage_key.starts_with('/') {
        return Err(StorageError::InvalidKey(
            "Storage key contains invalid characters".to_string(),
        ));
    }
    Ok(())
}
