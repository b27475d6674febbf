//! Resolves a tenant's virtual path to a `(backend, relative path)` pair via
//! longest-prefix match against mount records, caching resolutions per
//! tenant until the mount table changes.

mod error;
mod router;

pub use error::{NamespaceError, Result};
pub use router::{Resolution, Router};
