//! Mock Storage implementation for testing

use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use stockyard_storage::keys::generate_storage_key;
use stockyard_storage::{ByteStream, Storage, StorageBackend, StorageError, StorageResult};
use uuid::Uuid;

/// In-memory storage that records every save and delete.
#[derive(Clone, Default)]
pub struct MockStorage {
    files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    save_calls: Arc<Mutex<Vec<String>>>,
    delete_calls: Arc<Mutex<Vec<String>>>,
    /// Number of saves that succeed before every further save fails.
    fail_saves_after: Arc<Mutex<Option<usize>>>,
    fail_deletes: Arc<Mutex<bool>>,
}

impl MockStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a file in the mock storage
    pub fn set_file(&self, key: &str, data: Vec<u8>) {
        self.files.lock().unwrap().insert(key.to_string(), data);
    }

    /// Remove a file from the mock storage
    pub fn remove_file(&self, key: &str) {
        self.files.lock().unwrap().remove(key);
    }

    /// Check if a file exists in the mock storage
    pub fn has_file(&self, key: &str) -> bool {
        self.files.lock().unwrap().contains_key(key)
    }

    pub fn file_count(&self) -> usize {
        self.files.lock().unwrap().len()
    }

    /// Keys returned by successful saves, in call order.
    pub fn save_calls(&self) -> Vec<String> {
        self.save_calls.lock().unwrap().clone()
    }

    /// Keys passed to `delete`, in call order, whether or not it succeeded.
    pub fn delete_calls(&self) -> Vec<String> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn fail_saves(&self, fail: bool) {
        *self.fail_saves_after.lock().unwrap() = if fail { Some(0) } else { None };
    }

    pub fn fail_saves_after(&self, successes: usize) {
        *self.fail_saves_after.lock().unwrap() = Some(successes);
    }

    pub fn fail_deletes(&self, fail: bool) {
        *self.fail_deletes.lock().unwrap() = fail;
    }
}

#[async_trait]
impl Storage for MockStorage {
    async fn save(
        &self,
        tenant_id: Uuid,
        parent_id: Uuid,
        filename: &str,
        data: Vec<u8>,
    ) -> StorageResult<String> {
        let limit = *self.fail_saves_after.lock().unwrap();
        if let Some(limit) = limit {
            if self.save_calls.lock().unwrap().len() >= limit {
                return Err(StorageError::UploadFailed("injected save failure".to_string()));
            }
        }

        let key = generate_storage_key(tenant_id, parent_id, filename)?;
        self.files.lock().unwrap().insert(key.clone(), data);
        self.save_calls.lock().unwrap().push(key.clone());
        Ok(key)
    }

    async fn get(&self, storage_key: &str) -> StorageResult<Vec<u8>> {
        self.files
            .lock()
            .unwrap()
            .get(storage_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(storage_key.to_string()))
    }

    async fn get_stream(&self, storage_key: &str) -> StorageResult<ByteStream> {
        let data = self.get(storage_key).await?;
        Ok(Box::pin(stream::once(async move { Ok(Bytes::from(data)) })))
    }

    async fn delete(&self, storage_key: &str) -> StorageResult<()> {
        self.delete_calls
            .lock()
            .unwrap()
            .push(storage_key.to_string());

        if *self.fail_deletes.lock().unwrap() {
            return Err(StorageError::DeleteFailed("injected delete failure".to_string()));
        }
        self.files.lock().unwrap().remove(storage_key);
        Ok(())
    }

    async fn exists(&self, storage_key: &str) -> StorageResult<bool> {
        Ok(self.has_file(storage_key))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Local
    }
}
