use async_trait::async_trait;

use crate::error::Result;

/// A minimal, opaque byte-addressable store keyed by a backend-defined
/// string key. The CAS store owns key shape (it passes content digests);
/// backends only move bytes. Implementations are stateless per call and must
/// be safe under concurrent writers of the **same** key, since by
/// construction two writers of the same content digest write identical
/// bytes.
#[async_trait]
pub trait BlobBackend: Send + Sync {
    /// Writes `bytes` under `key`. Succeeds whether or not the key already
    /// existed; callers that care distinguish via `exists` beforehand.
    async fn put(&self, key: &str, bytes: &[u8]) -> Result<()>;

    /// Reads the bytes stored under `key`, or `BlobError::NotFound`.
    async fn get(&self, key: &str) -> Result<Vec<u8>>;

    /// Reads a byte range `[start, end)` of the object stored under `key`.
    /// The default implementation reads the whole object and slices it;
    /// backends that can do better (e.g. HTTP range requests) override it.
    async fn get_range(&self, key: &str, start: u64, end: u64) -> Result<Vec<u8>> {
        let full = self.get(key).await?;
        let start = start.min(full.len() as u64) as usize;
        let end = end.min(full.len() as u64) as usize;
        Ok(full[start..end].to_vec())
    }

    async fn delete(&self, key: &str) -> Result<()>;

    async fn exists(&self, key: &str) -> Result<bool>;

    /// Size in bytes of the object stored under `key`.
    async fn stat(&self, key: &str) -> Result<u64>;
}
