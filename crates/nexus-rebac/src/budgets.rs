use std::collections::HashSet;
use std::time::{Duration, Instant};

use crate::error::{RebacError, Result};
use crate::types::Entity;

/// Per-check limits (§4.5 "Cycle and fan-out safeguards"). Defaults match
/// the spec's stated defaults.
#[derive(Debug, Clone, Copy)]
pub struct Budgets {
    pub max_depth: u32,
    pub max_visited: u32,
    pub max_fanout: u32,
    pub timeout: Duration,
}

impl Default for Budgets {
    fn default() -> Self {
        Self {
            max_depth: 50,
            max_visited: 10_000,
            max_fanout: 1_000,
            timeout: Duration::from_secs(1),
        }
    }
}

/// Mutable state threaded through one `check`/`expand` walk: the visited-set
/// that prunes cycles, and the counters that enforce the budgets above.
pub struct WalkState {
    budgets: Budgets,
    started_at: Instant,
    visited: HashSet<(String, String, String, String, String)>,
    visited_count: u32,
}

impl WalkState {
    pub fn new(budgets: Budgets) -> Self {
        Self {
            budgets,
            started_at: Instant::now(),
            visited: HashSet::new(),
            visited_count: 0,
        }
    }

    /// Marks `(subject, permission, object)` as visited at `depth`, failing
    /// with `Indeterminate` if doing so would exceed any budget, or if this
    /// exact subproblem is already on the current path (a cycle).
    pub fn enter(&mut self, subject: &Entity, permission: &str, object: &Entity, depth: u32) -> Result<()> {
        if self.started_at.elapsed() > self.budgets.timeout {
            return Err(RebacError::Indeterminate("timeout exceeded"));
        }
        if depth > self.budgets.max_depth {
            return Err(RebacError::Indeterminate("max recursion depth exceeded"));
        }
        let key = (
            subject.entity_type.clone(),
            subject.entity_id.clone(),
            permission.to_owned(),
            object.entity_type.clone(),
            object.entity_id.clone(),
        );
        if !self.visited.insert(key) {
            return Err(RebacError::Indeterminate("cycle detected"));
        }
        self.visited_count += 1;
        if self.visited_count > self.budgets.max_visited {
            return Err(RebacError::Indeterminate("max visited nodes exceeded"));
        }
        Ok(())
    }

    /// Checks a fan-out count (e.g. the number of tuples expanded from one
    /// intermediate node) against the budget.
    pub fn check_fanout(&self, count: usize) -> Result<()> {
        if count as u32 > self.budgets.max_fanout {
            return Err(RebacError::Indeterminate("fan-out cap exceeded"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn depth_budget_trips_indeterminate() {
        let mut state = WalkState::new(Budgets { max_depth: 2, ..Default::default() });
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");
        assert!(state.enter(&s, "read", &o, 0).is_ok());
        assert!(matches!(state.enter(&s, "read", &o, 3), Err(RebacError::Indeterminate(_))));
    }

    #[test]
    fn revisiting_same_subproblem_is_a_cycle() {
        let mut state = WalkState::new(Budgets::default());
        let s = Entity::new("user", "a");
        let o = Entity::new("file", "/x");
        state.enter(&s, "read", &o, 0).unwrap();
        assert!(matches!(state.enter(&s, "read", &o, 1), Err(RebacError::Indeterminate(_))));
    }

    #[test]
    fn fanout_budget_trips_indeterminate() {
        let state = WalkState::new(Budgets { max_fanout: 3, ..Default::default() });
        assert!(state.check_fanout(3).is_ok());
        assert!(state.check_fanout(4).is_err());
    }
}
