//! Transactional metadata store: files, versions, blobs, mounts, workspaces,
//! snapshots, ReBAC tuples, the entity registry, and the change event log.
//!
//! A single [`Store`] instance holds every table behind one
//! `parking_lot::RwLock`; see `store::Inner` for why that's sufficient here
//! even though the component this crate is modeled on keeps a
//! committed-state/tx-state split for full snapshot isolation.

mod blobs;
mod error;
mod events;
mod files;
mod keys;
mod mounts;
mod path;
mod registry;
mod snapshots;
mod store;
mod tuples;
mod types;
mod versions;
mod workspaces;

pub use error::{MetadataError, Result};
pub use files::WriteOutcome;
pub use path::{normalize, MAX_PATH_BYTES};
pub use store::Store;
pub use types::{
    ApiKeyRecord, BlobRecord, ChangeEvent, ChangeKind, EntityRecord, FileRecord, MountRecord,
    NormalizedPath, SnapshotRecord, TenantId, Tuple, VersionRecord, WorkspaceRecord,
};
