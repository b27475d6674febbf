//! Content digests, etags, and the tagged wire envelope shared by every
//! other Nexus crate.

mod digest;
mod envelope;
mod etag;

pub use digest::{Digest, DigestError};
pub use envelope::{EnvelopeError, WireBytes, WireDateTime, WireDuration};
pub use etag::ETag;

/// Objects larger than this are chunked by the CAS store (§4.3).
pub const CHUNK_THRESHOLD: usize = 8 * 1024 * 1024;
