//! Public file operations (§4.8): permission-checked `read`/`write`/`delete`/
//! `rename`/`mkdir`/`rmdir`/`list`/`glob`/`grep` over the path namespace,
//! composing `nexus-namespace`'s mount routing, `nexus-rebac`'s permission
//! checks, `nexus-cas`'s content-addressed storage, and `nexus-versioning`'s
//! snapshot orchestration.

mod error;
mod grep;
mod service;
mod types;

pub use error::{FileServiceError, Result};
pub use service::FileService;
pub use types::{GrepHit, GrepOptions, ListEntry, ListOptions, MkdirOptions, ReadResult, Stat, WriteOptions, WriteResult};
