use std::fmt;

use serde::{Deserialize, Serialize};

use crate::digest::Digest;

/// A 128-bit token combining a content digest and a version number, used for
/// optimistic concurrency on file writes. Two writes of the same content at
/// the same version produce the same etag; any change to either component
/// changes it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct ETag([u8; 16]);

impl ETag {
    pub fn derive(content_digest: &Digest, version: u64) -> Self {
        let mut input = Vec::with_capacity(40);
        input.extend_from_slice(content_digest.as_bytes());
        input.extend_from_slice(&version.to_be_bytes());
        let full = blake3::hash(&input);
        let mut out = [0u8; 16];
        out.copy_from_slice(&full.as_bytes()[..16]);
        ETag(out)
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ETag({})", self.to_hex())
    }
}

impl fmt::Display for ETag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for ETag {
    type Err = hex::FromHexError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s)?;
        let arr: [u8; 16] = bytes
            .try_into()
            .map_err(|_| hex::FromHexError::InvalidStringLength)?;
        Ok(ETag(arr))
    }
}

impl From<ETag> for String {
    fn from(e: ETag) -> Self {
        e.to_hex()
    }
}

impl TryFrom<String> for ETag {
    type Error = hex::FromHexError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_digest_and_version_same_etag() {
        let d = Digest::of(b"content");
        assert_eq!(ETag::derive(&d, 1), ETag::derive(&d, 1));
    }

    #[test]
    fn different_version_different_etag() {
        let d = Digest::of(b"content");
        assert_ne!(ETag::derive(&d, 1), ETag::derive(&d, 2));
    }

    #[test]
    fn different_content_different_etag() {
        let a = Digest::of(b"one");
        let b = Digest::of(b"two");
        assert_ne!(ETag::derive(&a, 1), ETag::derive(&b, 1));
    }
}
