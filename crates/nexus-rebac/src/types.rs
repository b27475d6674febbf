use nexus_metadata::Tuple;
use serde::{Deserialize, Serialize};

/// A `type:id` pair — a subject or an object in the authorization graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Entity {
    pub entity_type: String,
    pub entity_id: String,
}

impl Entity {
    pub fn new(entity_type: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self {
            entity_type: entity_type.into(),
            entity_id: entity_id.into(),
        }
    }
}

/// How fresh a check's answer must be (§4.5 "Consistency tokens").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Consistency {
    /// Cached results are acceptable regardless of revision.
    MinimizeLatency,
    /// The subproblem cache may only be used at or above this revision.
    AtLeastAsFresh(u64),
    /// Bypasses the subproblem cache entirely.
    FullyConsistent,
}

impl Default for Consistency {
    fn default() -> Self {
        Consistency::MinimizeLatency
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Decision {
    Allow,
    Deny,
    Indeterminate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub decision: Decision,
    pub reason: Option<String>,
    pub resolved_at: u64,
}

impl CheckOutcome {
    pub fn allowed(&self) -> bool {
        matches!(self.decision, Decision::Allow)
    }
}

/// One request in a `bulk_check` batch.
#[derive(Debug, Clone)]
pub struct CheckRequest {
    pub subject: Entity,
    pub permission: String,
    pub object: Entity,
}

/// A node in an `expand` tree: either a leaf set of tuples that satisfied a
/// relation directly, or a labeled group of child nodes (union/intersection/
/// exclusion/arrow/parent).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ExpandNode {
    Leaf { relation: String, tuples: Vec<Tuple> },
    Group { op: String, children: Vec<ExpandNode> },
}

/// An ordered list of tuples forming the first accepting path found for a
/// check, returned by `explain`.
pub type ExplainPath = Vec<Tuple>;
