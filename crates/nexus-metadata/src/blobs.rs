use nexus_hash::Digest;

use crate::error::{MetadataError, Result};
use crate::store::Store;
use crate::types::BlobRecord;

impl Store {
    pub fn get_blob(&self, digest: &Digest) -> Result<BlobRecord> {
        self.inner
            .read()
            .blobs
            .get(digest)
            .cloned()
            .ok_or_else(|| MetadataError::BlobNotFound(digest.to_hex()))
    }

    /// Registers a newly-ingested blob with `refcount=0`; the caller incref's
    /// it in the same logical operation that creates the version row
    /// referencing it (§3 invariant 1: every live version resolves to a
    /// blob with refcount ≥ 1).
    pub fn register_blob(&self, digest: Digest, size: u64, backend_id: &str, backend_key: &str, chunk_manifest: Option<Digest>) {
        let mut inner = self.inner.write();
        inner.blobs.entry(digest).or_insert_with(|| BlobRecord {
            content_digest: digest,
            size,
            backend_id: backend_id.to_owned(),
            backend_key: backend_key.to_owned(),
            refcount: 0,
            chunk_manifest,
        });
    }

    /// Idempotent within a caller's logical transaction only in the sense
    /// that calling it once per reference is the caller's responsibility;
    /// this method itself always increments.
    pub fn incref_blob(&self, digest: &Digest) -> Result<u64> {
        let mut inner = self.inner.write();
        let blob = inner
            .blobs
            .get_mut(digest)
            .ok_or_else(|| MetadataError::BlobNotFound(digest.to_hex()))?;
        blob.refcount += 1;
        Ok(blob.refcount)
    }

    /// Decrements refcount; never underflows below zero. Returns the new
    /// count so callers can decide whether to schedule reclamation.
    pub fn decref_blob(&self, digest: &Digest) -> Result<u64> {
        let mut inner = self.inner.write();
        let blob = inner
            .blobs
            .get_mut(digest)
            .ok_or_else(|| MetadataError::BlobNotFound(digest.to_hex()))?;
        blob.refcount = blob.refcount.saturating_sub(1);
        Ok(blob.refcount)
    }

    /// Blobs with `refcount == 0`, eligible for background reclamation past
    /// the grace interval the caller enforces.
    pub fn zero_refcount_blobs(&self) -> Vec<BlobRecord> {
        self.inner
            .read()
            .blobs
            .values()
            .filter(|b| b.refcount == 0)
            .cloned()
            .collect()
    }

    pub fn remove_blob(&self, digest: &Digest) {
        self.inner.write().blobs.remove(digest);
    }
}
