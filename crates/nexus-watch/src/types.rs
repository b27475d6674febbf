use nexus_metadata::ChangeKind;
use serde::{Deserialize, Serialize};

/// What a subscriber wants to hear about. Empty `path_globs` matches every
/// path; `None` for `event_kinds` matches every kind.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubscribeRequest {
    pub tenant_id: String,
    pub path_globs: Vec<String>,
    pub event_kinds: Option<Vec<ChangeKind>>,
    /// Resume from a cursor persisted by a previous connection. `None`
    /// starts the subscription at the journal's current tail (no replay).
    pub resume_from: Option<u64>,
}

/// Result of one `Journal::poll` call: events due, the cursor to persist for
/// the next resume, and whether this call landed on a heartbeat tick with no
/// events to report (so the caller's transport can still emit a keepalive).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PollResult {
    pub events: Vec<nexus_metadata::ChangeEvent>,
    pub cursor: u64,
    pub heartbeat_due: bool,
}
