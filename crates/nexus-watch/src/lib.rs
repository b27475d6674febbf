//! Watch journal (§4.7): a bounded, path-glob/event-kind-filtered view over
//! `nexus-metadata`'s change-event log. Subscribers register with
//! `(tenant, path_globs, event_kinds)`, poll for events strictly in `seq`
//! order, and persist the returned cursor to resume after a disconnect.

mod error;
mod journal;
mod types;

pub use error::{Result, WatchError};
pub use journal::Journal;
pub use types::{PollResult, SubscribeRequest};
