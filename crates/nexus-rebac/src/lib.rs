mod budgets;
mod cache;
mod engine;
mod error;
mod namespace;
mod types;

pub use budgets::{Budgets, WalkState};
pub use engine::Engine;
pub use error::{RebacError, Result};
pub use namespace::{default_file_namespace, Expr, NamespaceConfig, NamespaceRegistry};
pub use types::{CheckOutcome, CheckRequest, Consistency, Decision, Entity, ExpandNode, ExplainPath};
