use nexus_hash::Digest;
use serde::{Deserialize, Serialize};

/// One chunk of a chunked object: its own content digest, and where it sits
/// in the reassembled byte stream.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkRef {
    pub digest: Digest,
    pub offset: u64,
    pub size: u64,
}

/// The manifest for an object larger than `CHUNK_THRESHOLD` (§4.3): an
/// ordered list of chunk references plus the total reassembled size. The
/// manifest itself is stored as a blob, addressed by the digest of its own
/// serialized bytes (`Digest::of_manifest`); the *object's* digest, tracked
/// in `nexus-metadata`, is the digest of the full reassembled content, not
/// the manifest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Manifest {
    pub chunks: Vec<ChunkRef>,
    pub total_size: u64,
}

impl Manifest {
    pub fn to_bytes(&self) -> Vec<u8> {
        serde_json::to_vec(self).expect("manifest serialization is infallible")
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Chunks that overlap the half-open byte range `[start, end)`, together
    /// with the portion of each to keep.
    pub fn chunks_in_range(&self, start: u64, end: u64) -> Vec<(&ChunkRef, u64, u64)> {
        self.chunks
            .iter()
            .filter_map(|c| {
                let chunk_end = c.offset + c.size;
                if c.offset >= end || chunk_end <= start {
                    return None;
                }
                let local_start = start.saturating_sub(c.offset);
                let local_end = (end.min(chunk_end)) - c.offset;
                Some((c, local_start, local_end))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(digest_seed: &[u8], offset: u64, size: u64) -> ChunkRef {
        ChunkRef {
            digest: Digest::of(digest_seed),
            offset,
            size,
        }
    }

    #[test]
    fn roundtrips_through_bytes() {
        let manifest = Manifest {
            chunks: vec![chunk(b"a", 0, 8), chunk(b"b", 8, 8)],
            total_size: 16,
        };
        let bytes = manifest.to_bytes();
        let back = Manifest::from_bytes(&bytes).unwrap();
        assert_eq!(back.total_size, 16);
        assert_eq!(back.chunks.len(), 2);
    }

    #[test]
    fn range_selects_overlapping_chunks_only() {
        let manifest = Manifest {
            chunks: vec![chunk(b"a", 0, 10), chunk(b"b", 10, 10), chunk(b"c", 20, 10)],
            total_size: 30,
        };
        let hits = manifest.chunks_in_range(5, 15);
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].1, 5);
        assert_eq!(hits[0].2, 10);
        assert_eq!(hits[1].1, 0);
        assert_eq!(hits[1].2, 5);
    }
}
