use std::sync::Arc;

use nexus_blob::BlobBackend;
use nexus_hash::{Digest, CHUNK_THRESHOLD};
use nexus_metadata::Store as MetadataStore;

use crate::error::{CasError, Result};
use crate::manifest::{ChunkRef, Manifest};

/// Orchestrates content digesting, chunking, and manifest resolution over a
/// raw byte-addressable [`BlobBackend`], recording object identity and
/// refcounts in [`MetadataStore`]. Neither of those two layers knows about
/// the other; `CasStore` is what ties a content digest to the bytes it
/// names.
pub struct CasStore {
    backend: Arc<dyn BlobBackend>,
    metadata: Arc<MetadataStore>,
    backend_id: String,
}

impl CasStore {
    pub fn new(backend: Arc<dyn BlobBackend>, metadata: Arc<MetadataStore>, backend_id: impl Into<String>) -> Self {
        Self {
            backend,
            metadata,
            backend_id: backend_id.into(),
        }
    }

    /// Writes `bytes`, registering (but not incref'ing) the resulting blob
    /// record if it doesn't already exist, and returns the content digest
    /// callers should reference. Objects over [`CHUNK_THRESHOLD`] are split
    /// into fixed-size chunks behind a manifest (§4.3); callers never see the
    /// difference.
    pub async fn put(&self, bytes: &[u8]) -> Result<Digest> {
        let digest = Digest::of(bytes);
        if self.metadata.get_blob(&digest).is_ok() {
            return Ok(digest);
        }

        if bytes.len() <= CHUNK_THRESHOLD {
            let key = digest.to_hex();
            if !self.backend.exists(&key).await? {
                self.backend.put(&key, bytes).await?;
            }
            self.metadata.register_blob(digest, bytes.len() as u64, &self.backend_id, &key, None);
            return Ok(digest);
        }

        let mut chunks = Vec::new();
        for (i, chunk) in bytes.chunks(CHUNK_THRESHOLD).enumerate() {
            let chunk_digest = Digest::of(chunk);
            let key = chunk_digest.to_hex();
            if !self.backend.exists(&key).await? {
                self.backend.put(&key, chunk).await?;
            }
            chunks.push(ChunkRef {
                digest: chunk_digest,
                offset: (i * CHUNK_THRESHOLD) as u64,
                size: chunk.len() as u64,
            });
        }
        let manifest = Manifest {
            chunks,
            total_size: bytes.len() as u64,
        };
        let manifest_bytes = manifest.to_bytes();
        let manifest_digest = Digest::of_manifest(&manifest_bytes);
        let manifest_key = manifest_digest.to_hex();
        if !self.backend.exists(&manifest_key).await? {
            self.backend.put(&manifest_key, &manifest_bytes).await?;
        }

        self.metadata
            .register_blob(digest, bytes.len() as u64, &self.backend_id, &manifest_key, Some(manifest_digest));
        Ok(digest)
    }

    /// Reads the full object named by `digest`, reassembling chunks if
    /// needed, and verifies the result still hashes to `digest`
    /// (`CasError::Integrity` is fatal — never silently swallowed).
    pub async fn get(&self, digest: &Digest) -> Result<Vec<u8>> {
        let record = self.metadata.get_blob(digest).map_err(|_| CasError::NotFound(*digest))?;

        let bytes = match record.chunk_manifest {
            None => self.backend.get(&record.backend_key).await?,
            Some(manifest_digest) => {
                let manifest_bytes = self.backend.get(&manifest_digest.to_hex()).await?;
                let manifest = Manifest::from_bytes(&manifest_bytes)
                    .map_err(|e| CasError::CorruptManifest(*digest, e.to_string()))?;
                let mut out = Vec::with_capacity(manifest.total_size as usize);
                for chunk in &manifest.chunks {
                    out.extend(self.backend.get(&chunk.digest.to_hex()).await?);
                }
                out
            }
        };

        let actual = Digest::of(&bytes);
        if actual != *digest {
            return Err(CasError::Integrity { expected: *digest, actual });
        }
        Ok(bytes)
    }

    /// Reads `[start, end)` of the object without reassembling the whole
    /// thing when it's chunked.
    pub async fn get_range(&self, digest: &Digest, start: u64, end: u64) -> Result<Vec<u8>> {
        let record = self.metadata.get_blob(digest).map_err(|_| CasError::NotFound(*digest))?;

        match record.chunk_manifest {
            None => Ok(self.backend.get_range(&record.backend_key, start, end).await?),
            Some(manifest_digest) => {
                let manifest_bytes = self.backend.get(&manifest_digest.to_hex()).await?;
                let manifest = Manifest::from_bytes(&manifest_bytes)
                    .map_err(|e| CasError::CorruptManifest(*digest, e.to_string()))?;
                let mut out = Vec::new();
                for (chunk, local_start, local_end) in manifest.chunks_in_range(start, end) {
                    out.extend(self.backend.get_range(&chunk.digest.to_hex(), local_start, local_end).await?);
                }
                Ok(out)
            }
        }
    }

    pub fn incref(&self, digest: &Digest) -> Result<u64> {
        Ok(self.metadata.incref_blob(digest)?)
    }

    pub fn decref(&self, digest: &Digest) -> Result<u64> {
        Ok(self.metadata.decref_blob(digest)?)
    }

    /// Deletes every zero-refcount blob's bytes from the backend and drops
    /// its metadata row. Chunked objects also drop their manifest and every
    /// chunk named in it; chunks are not themselves refcounted across
    /// objects, so this can delete bytes a *different* manifest also
    /// references if the two objects happened to share a chunk digest. That
    /// tradeoff is deliberate: cross-object chunk dedup would need its own
    /// refcount table, and Nexus's chunking exists to bound read/write
    /// granularity, not to deduplicate storage across unrelated objects.
    pub async fn reclaim(&self) -> Result<u64> {
        let mut reclaimed = 0;
        for record in self.metadata.zero_refcount_blobs() {
            if let Some(manifest_digest) = record.chunk_manifest {
                if let Ok(manifest_bytes) = self.backend.get(&manifest_digest.to_hex()).await {
                    if let Ok(manifest) = Manifest::from_bytes(&manifest_bytes) {
                        for chunk in &manifest.chunks {
                            let _ = self.backend.delete(&chunk.digest.to_hex()).await;
                        }
                    }
                }
                let _ = self.backend.delete(&manifest_digest.to_hex()).await;
            } else {
                let _ = self.backend.delete(&record.backend_key).await;
            }
            self.metadata.remove_blob(&record.content_digest);
            reclaimed += 1;
        }
        Ok(reclaimed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nexus_blob::Memory;

    fn store() -> CasStore {
        CasStore::new(Arc::new(Memory::new()), Arc::new(MetadataStore::new()), "memory")
    }

    #[tokio::test]
    async fn put_then_get_roundtrips_small_object() {
        let cas = store();
        let digest = cas.put(b"hello world").await.unwrap();
        let bytes = cas.get(&digest).await.unwrap();
        assert_eq!(bytes, b"hello world");
    }

    #[tokio::test]
    async fn put_is_idempotent_on_identical_content() {
        let cas = store();
        let d1 = cas.put(b"same").await.unwrap();
        let d2 = cas.put(b"same").await.unwrap();
        assert_eq!(d1, d2);
    }

    #[tokio::test]
    async fn large_object_round_trips_via_chunking() {
        let cas = store();
        let big = vec![7u8; CHUNK_THRESHOLD * 2 + 123];
        let digest = cas.put(&big).await.unwrap();
        let back = cas.get(&digest).await.unwrap();
        assert_eq!(back, big);
    }

    #[tokio::test]
    async fn ranged_read_matches_full_read_slice() {
        let cas = store();
        let big: Vec<u8> = (0..(CHUNK_THRESHOLD * 2 + 500)).map(|i| (i % 251) as u8).collect();
        let digest = cas.put(&big).await.unwrap();
        let start = CHUNK_THRESHOLD as u64 - 10;
        let end = CHUNK_THRESHOLD as u64 + 10;
        let ranged = cas.get_range(&digest, start, end).await.unwrap();
        assert_eq!(ranged, big[start as usize..end as usize]);
    }

    #[tokio::test]
    async fn reclaim_deletes_zero_refcount_blobs() {
        let cas = store();
        let digest = cas.put(b"orphan").await.unwrap();
        let reclaimed = cas.reclaim().await.unwrap();
        assert_eq!(reclaimed, 1);
        assert!(cas.get(&digest).await.is_err());
    }

    #[tokio::test]
    async fn incref_keeps_blob_alive_through_reclaim() {
        let cas = store();
        let digest = cas.put(b"kept").await.unwrap();
        cas.incref(&digest).unwrap();
        cas.reclaim().await.unwrap();
        assert!(cas.get(&digest).await.is_ok());
    }
}
