use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::BlobBackend;
use crate::error::{BlobError, Result};

/// An in-process blob backend used by tests and by single-node setups that
/// have no durability requirement. Same semantics as `Local`, minus disk I/O.
#[derive(Default)]
pub struct Memory {
    objects: RwLock<HashMap<String, Vec<u8>>>,
}

impl Memory {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobBackend for Memory {
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()> {
        self.objects.write().await.insert(key.to_owned(), bytes.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.objects
            .write()
            .await
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))
    }

    async fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.objects.read().await.contains_key(key))
    }

    async fn stat(&self, key: &str) -> Result<u64> {
        self.objects
            .read()
            .await
            .get(key)
            .map(|b| b.len() as u64)
            .ok_or_else(|| BlobError::NotFound(key.to_owned()))
    }
}
