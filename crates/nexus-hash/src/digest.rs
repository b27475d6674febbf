use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A stable 256-bit content digest. Two byte sequences have the same digest
/// iff they are equal; this is the identity CAS blobs are named by.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Digest([u8; 32]);

#[derive(Debug, Error, PartialEq)]
pub enum DigestError {
    #[error("digest must decode to 32 bytes, got {0}")]
    BadLength(usize),
    #[error("invalid hex in digest: {0}")]
    BadHex(#[from] hex::FromHexError),
}

impl Digest {
    /// Computes the digest of a byte sequence. Deterministic: the same bytes
    /// always produce the same digest, regardless of backend or invocation.
    pub fn of(bytes: &[u8]) -> Self {
        Digest(*blake3::hash(bytes).as_bytes())
    }

    /// Computes the digest of a manifest's own serialized bytes; the caller
    /// tags the result so readers know to resolve a manifest rather than
    /// treat this digest as the raw object.
    pub fn of_manifest(manifest_bytes: &[u8]) -> Self {
        Self::of(manifest_bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }

    /// First two hex characters, used as the shard directory prefix by the
    /// local blob backend's on-disk layout.
    pub fn shard_prefix(&self) -> String {
        self.to_hex()[..2].to_string()
    }
}

impl fmt::Debug for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Digest({})", self.to_hex())
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for Digest {
    type Err = DigestError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let len = bytes.len();
        let arr: [u8; 32] = bytes.try_into().map_err(|_| DigestError::BadLength(len))?;
        Ok(Digest(arr))
    }
}

impl From<Digest> for String {
    fn from(d: Digest) -> Self {
        d.to_hex()
    }
}

impl TryFrom<String> for Digest {
    type Error = DigestError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digest_is_deterministic() {
        let a = Digest::of(b"hello");
        let b = Digest::of(b"hello");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_content_distinct_digest() {
        assert_ne!(Digest::of(b"hello"), Digest::of(b"world"));
    }

    #[test]
    fn hex_roundtrip() {
        let d = Digest::of(b"roundtrip");
        let hex = d.to_hex();
        let parsed: Digest = hex.parse().unwrap();
        assert_eq!(d, parsed);
    }

    #[test]
    fn rejects_wrong_length() {
        let err = "abcd".parse::<Digest>().unwrap_err();
        assert_eq!(err, DigestError::BadLength(2));
    }

    #[test]
    fn shard_prefix_is_two_hex_chars() {
        let d = Digest::of(b"x");
        assert_eq!(d.shard_prefix().len(), 2);
        assert!(d.to_hex().starts_with(&d.shard_prefix()));
    }
}
