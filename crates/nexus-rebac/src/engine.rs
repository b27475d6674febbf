use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use nexus_metadata::{Store as MetadataStore, Tuple};

use crate::budgets::{Budgets, WalkState};
use crate::cache::{GroupClosureIndex, HotBitmap, InFlight, SubproblemCache};
use crate::error::{RebacError, Result};
use crate::namespace::{Expr, NamespaceConfig, NamespaceRegistry};
use crate::types::{CheckOutcome, CheckRequest, Consistency, Decision, Entity, ExpandNode, ExplainPath};

const DEFAULT_QUANTIZATION_WINDOW: Duration = Duration::from_secs(5);

struct Inner {
    metadata: Arc<MetadataStore>,
    namespaces: Arc<NamespaceRegistry>,
    subproblem_cache: SubproblemCache,
    hot_bitmap: HotBitmap,
    group_closure: GroupClosureIndex,
    inflight: InFlight,
    budgets: Budgets,
}

/// The permission engine: tuple store access, namespace-driven graph-walk
/// checks, and the four caches in §4.5. Cheap to clone — it's a thin handle
/// around an `Arc<Inner>`, the way `check` needs to hand a `'static` future
/// to the in-flight dedup table.
#[derive(Clone)]
pub struct Engine(Arc<Inner>);

impl Engine {
    pub fn new(metadata: Arc<MetadataStore>, namespaces: Arc<NamespaceRegistry>) -> Self {
        Self::with_budgets(metadata, namespaces, Budgets::default())
    }

    pub fn with_budgets(metadata: Arc<MetadataStore>, namespaces: Arc<NamespaceRegistry>, budgets: Budgets) -> Self {
        Self(Arc::new(Inner {
            metadata,
            namespaces,
            subproblem_cache: SubproblemCache::new(DEFAULT_QUANTIZATION_WINDOW),
            hot_bitmap: HotBitmap::new(),
            group_closure: GroupClosureIndex::new(),
            inflight: InFlight::new(),
            budgets,
        }))
    }

    // ---- tuple store -----------------------------------------------------

    pub fn create_tuple(&self, tuple: Tuple) -> Tuple {
        let object = Entity::new(tuple.object_type.clone(), tuple.object_id.clone());
        let subject = Entity::new(tuple.subject_type.clone(), tuple.subject_id.clone());
        let (created, _revision) = self.0.metadata.create_tuple(tuple);
        self.invalidate_frontier(&created.tenant_id, &object);
        self.0.group_closure.invalidate_subject(&created.tenant_id, &subject);
        created
    }

    pub fn delete_tuple(&self, tenant_id: &str, tuple_id: &str) -> Result<()> {
        let tuple = self.0.metadata.get_tuple(tuple_id);
        self.0.metadata.delete_tuple(tenant_id, tuple_id)?;
        if let Some(tuple) = tuple {
            let object = Entity::new(tuple.object_type, tuple.object_id);
            self.invalidate_frontier(tenant_id, &object);
        }
        Ok(())
    }

    pub fn get_tuple(&self, tuple_id: &str) -> Option<Tuple> {
        self.0.metadata.get_tuple(tuple_id)
    }

    pub fn list_tuples(&self, tenant_id: &str) -> Vec<Tuple> {
        self.0.metadata.list_tuples(tenant_id)
    }

    pub fn tuples_for_object(&self, tenant_id: &str, object: &Entity) -> Vec<Tuple> {
        self.0.metadata.tuples_for_object(tenant_id, &object.entity_type, &object.entity_id, None)
    }

    /// Public hook for callers that mutate the tuple store without going
    /// through [`Engine::create_tuple`]/[`Engine::delete_tuple`] — e.g.
    /// `nexus-fileservice`'s `rename`, which rewrites `object_id` in bulk via
    /// `nexus_metadata::rewrite_file_object_ids` rather than delete+recreate.
    pub fn invalidate(&self, tenant_id: &str, object: &Entity) {
        self.invalidate_frontier(tenant_id, object);
    }

    /// Drops cached answers about `object`, and for files, about every
    /// strict ancestor (a write there can change what an ancestor-level
    /// check sees through an arrow). Descendant entries that depended on
    /// inheriting *through* `object` are not swept here — the time-quantized
    /// subproblem cache bounds their staleness to one window, which §4.5
    /// calls out as an accepted backstop.
    fn invalidate_frontier(&self, tenant_id: &str, object: &Entity) {
        self.0.subproblem_cache.invalidate_object(tenant_id, object);
        self.0.hot_bitmap.invalidate(tenant_id, "read", object);
        self.0.hot_bitmap.invalidate(tenant_id, "write", object);
        if object.entity_type == "file" {
            if let Ok(mut path) = nexus_metadata::normalize(&object.entity_id) {
                while let Some(parent) = path.parent() {
                    let ancestor = Entity::new("file", parent.as_str());
                    self.0.subproblem_cache.invalidate_object(tenant_id, &ancestor);
                    path = parent;
                }
            }
        }
    }

    // ---- namespace config --------------------------------------------------

    pub fn namespace_create(&self, config: NamespaceConfig) -> Result<()> {
        self.0.namespaces.create(config)
    }

    pub fn namespace_get(&self, object_type: &str) -> Result<NamespaceConfig> {
        self.0.namespaces.get(object_type)
    }

    pub fn namespace_list(&self) -> Vec<NamespaceConfig> {
        self.0.namespaces.list()
    }

    pub fn namespace_delete(&self, object_type: &str) -> Result<()> {
        self.0.namespaces.delete(object_type)
    }

    pub fn rebuild_hot_bitmap(&self, tenant_id: &str, permission: &str, object: &Entity) -> Result<()> {
        let subjects = self.collect_subjects(tenant_id, permission, object, &mut HashSet::new())?;
        self.0
            .hot_bitmap
            .set(tenant_id, permission, object, subjects.into_iter().map(|s| (s.entity_type, s.entity_id)).collect());
        Ok(())
    }

    // ---- check -------------------------------------------------------------

    pub async fn check(&self, tenant_id: &str, subject: Entity, permission: String, object: Entity, consistency: Consistency) -> Result<CheckOutcome> {
        let revision = self.0.metadata.revision();

        if let Some(hit) = self.0.hot_bitmap.contains(tenant_id, &permission, &object, &subject) {
            return Ok(CheckOutcome {
                decision: if hit { Decision::Allow } else { Decision::Deny },
                reason: Some("hot bitmap".to_owned()),
                resolved_at: revision,
            });
        }

        let min_revision = match consistency {
            Consistency::MinimizeLatency => None,
            Consistency::AtLeastAsFresh(tok) => Some(tok),
            Consistency::FullyConsistent => None,
        };

        if !matches!(consistency, Consistency::FullyConsistent) {
            if let Some(allowed) = self.0.subproblem_cache.get(tenant_id, &subject, &permission, &object, Utc::now(), min_revision) {
                return Ok(CheckOutcome {
                    decision: if allowed { Decision::Allow } else { Decision::Deny },
                    reason: Some("subproblem cache hit".to_owned()),
                    resolved_at: revision,
                });
            }
        }

        let walk_inner = self.0.clone();
        let tenant_owned = tenant_id.to_owned();
        let subject_for_walk = subject.clone();
        let permission_for_walk = permission.clone();
        let object_for_walk = object.clone();

        let outcome = self
            .0
            .inflight
            .run(tenant_id, &subject, &permission, &object, async move {
                walk_check(&walk_inner, &tenant_owned, &subject_for_walk, &permission_for_walk, &object_for_walk)
            })
            .await?;

        if !matches!(consistency, Consistency::FullyConsistent) && !matches!(outcome.decision, Decision::Indeterminate) {
            self.0
                .subproblem_cache
                .put(tenant_id, &subject, &permission, &object, Utc::now(), outcome.allowed(), revision);
        }
        Ok(outcome)
    }

    // ---- expand / explain ---------------------------------------------------

    pub fn expand(&self, tenant_id: &str, permission: &str, object: &Entity) -> Result<ExpandNode> {
        let mut visited = HashSet::new();
        build_expand(&self.0, tenant_id, permission, object, 0, &mut visited)
    }

    pub fn explain(&self, tenant_id: &str, subject: &Entity, permission: &str, object: &Entity) -> Result<Option<ExplainPath>> {
        let mut state = WalkState::new(self.0.budgets);
        match explain_permission(&self.0, &mut state, tenant_id, subject, permission, object, 0) {
            Ok(path) => Ok(path),
            Err(RebacError::Indeterminate(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    // ---- lookup --------------------------------------------------------------

    pub fn lookup_subjects(&self, tenant_id: &str, permission: &str, object: &Entity) -> Result<Vec<Entity>> {
        Ok(self.collect_subjects(tenant_id, permission, object, &mut HashSet::new())?.into_iter().collect())
    }

    fn collect_subjects(&self, tenant_id: &str, permission: &str, object: &Entity, visited: &mut HashSet<(String, String, String)>) -> Result<HashSet<Entity>> {
        collect_subjects(&self.0, tenant_id, permission, object, visited)
    }

    /// Scans every tuple naming `object_type` in this tenant for candidate
    /// objects, then checks `subject`'s permission on each. This is a linear
    /// scan of the tuple store — fine at in-memory scale, but it's the part
    /// of this engine that would need a real reverse index (or the
    /// group-closure-style precomputation §4.5 calls "hot-object bitmap")
    /// before it could serve a tenant with millions of tuples.
    pub async fn lookup_resources(&self, tenant_id: &str, subject: &Entity, permission: &str, object_type: &str) -> Result<Vec<Entity>> {
        let mut candidates = HashSet::new();
        for tuple in self.0.metadata.list_tuples(tenant_id) {
            if tuple.object_type == object_type {
                candidates.insert(Entity::new(tuple.object_type, tuple.object_id));
            }
        }
        let mut matches = Vec::new();
        for object in candidates {
            let outcome = self
                .check(tenant_id, subject.clone(), permission.to_owned(), object.clone(), Consistency::MinimizeLatency)
                .await?;
            if outcome.allowed() {
                matches.push(object);
            }
        }
        matches.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));
        Ok(matches)
    }

    pub async fn bulk_check(&self, tenant_id: &str, requests: Vec<CheckRequest>, consistency: Consistency) -> Vec<Result<CheckOutcome>> {
        let mut results = Vec::with_capacity(requests.len());
        for req in requests {
            results.push(self.check(tenant_id, req.subject, req.permission, req.object, consistency).await);
        }
        results
    }
}

fn namespace_for(inner: &Inner, object: &Entity) -> Result<NamespaceConfig> {
    inner.namespaces.get(&object.entity_type)
}

fn walk_check(inner: &Inner, tenant_id: &str, subject: &Entity, permission: &str, object: &Entity) -> Result<CheckOutcome> {
    let revision = inner.metadata.revision();
    let mut state = WalkState::new(inner.budgets);
    match eval_permission(inner, &mut state, tenant_id, subject, permission, object, 0) {
        Ok(allowed) => Ok(CheckOutcome {
            decision: if allowed { Decision::Allow } else { Decision::Deny },
            reason: None,
            resolved_at: revision,
        }),
        Err(RebacError::Indeterminate(reason)) => Ok(CheckOutcome {
            decision: Decision::Indeterminate,
            reason: Some(reason.to_owned()),
            resolved_at: revision,
        }),
        Err(e) => Err(e),
    }
}

fn eval_permission(inner: &Inner, state: &mut WalkState, tenant_id: &str, subject: &Entity, permission: &str, object: &Entity, depth: u32) -> Result<bool> {
    state.enter(subject, permission, object, depth)?;
    let ns = namespace_for(inner, object)?;
    let expr = ns.expr_for(permission)?;
    eval_expr(inner, state, tenant_id, subject, permission, expr, object, depth)
}

fn eval_expr(inner: &Inner, state: &mut WalkState, tenant_id: &str, subject: &Entity, relation: &str, expr: &Expr, object: &Entity, depth: u32) -> Result<bool> {
    match expr {
        Expr::This => {
            let tuples = direct_tuples_for(inner, tenant_id, object, relation);
            state.check_fanout(tuples.len())?;
            Ok(tuples.iter().any(|t| matches_subject(t, subject)))
        }
        Expr::Relation(r) => eval_permission(inner, state, tenant_id, subject, r, object, depth + 1),
        Expr::TupleToUserset { tupleset, computed } => {
            let tuples = direct_tuples_for(inner, tenant_id, object, tupleset);
            state.check_fanout(tuples.len())?;
            for tuple in &tuples {
                let related = Entity::new(tuple.subject_type.clone(), tuple.subject_id.clone());
                if computed == "member" {
                    if let Some(true) = inner.group_closure.is_member(tenant_id, subject, &related) {
                        return Ok(true);
                    }
                }
                if eval_permission(inner, state, tenant_id, subject, computed, &related, depth + 1)? {
                    if computed == "member" {
                        inner.group_closure.record(tenant_id, subject, &related);
                    }
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Parent(computed) => match parent_of(object) {
            Some(parent) => eval_permission(inner, state, tenant_id, subject, computed, &parent, depth + 1),
            None => Ok(false),
        },
        Expr::Union(exprs) => {
            for e in exprs {
                if eval_expr(inner, state, tenant_id, subject, relation, e, object, depth)? {
                    return Ok(true);
                }
            }
            Ok(false)
        }
        Expr::Intersection(exprs) => {
            for e in exprs {
                if !eval_expr(inner, state, tenant_id, subject, relation, e, object, depth)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        Expr::Exclusion(a, b) => {
            let include = eval_expr(inner, state, tenant_id, subject, relation, a, object, depth)?;
            if !include {
                return Ok(false);
            }
            Ok(!eval_expr(inner, state, tenant_id, subject, relation, b, object, depth)?)
        }
    }
}

fn direct_tuples_for(inner: &Inner, tenant_id: &str, object: &Entity, relation: &str) -> Vec<Tuple> {
    inner.metadata.tuples_for_object(tenant_id, &object.entity_type, &object.entity_id, Some(relation))
}

fn matches_subject(tuple: &Tuple, subject: &Entity) -> bool {
    tuple.subject_type == subject.entity_type && tuple.subject_id == subject.entity_id
}

fn parent_of(object: &Entity) -> Option<Entity> {
    if object.entity_type != "file" {
        return None;
    }
    let path = nexus_metadata::normalize(&object.entity_id).ok()?;
    path.parent().map(|p| Entity::new("file", p.as_str()))
}

fn build_expand(inner: &Inner, tenant_id: &str, permission: &str, object: &Entity, depth: u32, visited: &mut HashSet<(String, String, String)>) -> Result<ExpandNode> {
    let key = (object.entity_type.clone(), object.entity_id.clone(), permission.to_owned());
    if !visited.insert(key) || depth > inner.budgets.max_depth {
        return Ok(ExpandNode::Group { op: "cycle".to_owned(), children: vec![] });
    }
    let ns = namespace_for(inner, object)?;
    let expr = ns.expr_for(permission)?;
    build_expand_expr(inner, tenant_id, permission, expr, object, depth, visited)
}

fn build_expand_expr(inner: &Inner, tenant_id: &str, relation: &str, expr: &Expr, object: &Entity, depth: u32, visited: &mut HashSet<(String, String, String)>) -> Result<ExpandNode> {
    match expr {
        Expr::This => Ok(ExpandNode::Leaf {
            relation: relation.to_owned(),
            tuples: direct_tuples_for(inner, tenant_id, object, relation),
        }),
        Expr::Relation(r) => build_expand(inner, tenant_id, r, object, depth + 1, visited),
        Expr::TupleToUserset { tupleset, computed } => {
            let tuples = direct_tuples_for(inner, tenant_id, object, tupleset);
            let mut children = Vec::new();
            for tuple in &tuples {
                let related = Entity::new(tuple.subject_type.clone(), tuple.subject_id.clone());
                children.push(build_expand(inner, tenant_id, computed, &related, depth + 1, visited)?);
            }
            Ok(ExpandNode::Group {
                op: format!("{tupleset}->{computed}"),
                children,
            })
        }
        Expr::Parent(computed) => match parent_of(object) {
            Some(parent) => Ok(ExpandNode::Group {
                op: "parent".to_owned(),
                children: vec![build_expand(inner, tenant_id, computed, &parent, depth + 1, visited)?],
            }),
            None => Ok(ExpandNode::Group { op: "parent".to_owned(), children: vec![] }),
        },
        Expr::Union(exprs) => Ok(ExpandNode::Group {
            op: "union".to_owned(),
            children: exprs
                .iter()
                .map(|e| build_expand_expr(inner, tenant_id, relation, e, object, depth, visited))
                .collect::<Result<Vec<_>>>()?,
        }),
        Expr::Intersection(exprs) => Ok(ExpandNode::Group {
            op: "intersection".to_owned(),
            children: exprs
                .iter()
                .map(|e| build_expand_expr(inner, tenant_id, relation, e, object, depth, visited))
                .collect::<Result<Vec<_>>>()?,
        }),
        Expr::Exclusion(a, b) => Ok(ExpandNode::Group {
            op: "exclusion".to_owned(),
            children: vec![
                build_expand_expr(inner, tenant_id, relation, a, object, depth, visited)?,
                build_expand_expr(inner, tenant_id, relation, b, object, depth, visited)?,
            ],
        }),
    }
}

fn explain_permission(inner: &Inner, state: &mut WalkState, tenant_id: &str, subject: &Entity, permission: &str, object: &Entity, depth: u32) -> Result<Option<ExplainPath>> {
    state.enter(subject, permission, object, depth)?;
    let ns = namespace_for(inner, object)?;
    let expr = ns.expr_for(permission)?;
    explain_expr(inner, state, tenant_id, subject, permission, expr, object, depth)
}

fn explain_expr(inner: &Inner, state: &mut WalkState, tenant_id: &str, subject: &Entity, relation: &str, expr: &Expr, object: &Entity, depth: u32) -> Result<Option<ExplainPath>> {
    match expr {
        Expr::This => {
            let tuples = direct_tuples_for(inner, tenant_id, object, relation);
            state.check_fanout(tuples.len())?;
            Ok(tuples.into_iter().find(|t| matches_subject(t, subject)).map(|t| vec![t]))
        }
        Expr::Relation(r) => explain_permission(inner, state, tenant_id, subject, r, object, depth + 1),
        Expr::TupleToUserset { tupleset, computed } => {
            let tuples = direct_tuples_for(inner, tenant_id, object, tupleset);
            state.check_fanout(tuples.len())?;
            for tuple in tuples {
                let related = Entity::new(tuple.subject_type.clone(), tuple.subject_id.clone());
                if let Some(mut path) = explain_permission(inner, state, tenant_id, subject, computed, &related, depth + 1)? {
                    path.insert(0, tuple);
                    return Ok(Some(path));
                }
            }
            Ok(None)
        }
        Expr::Parent(computed) => match parent_of(object) {
            Some(parent) => explain_permission(inner, state, tenant_id, subject, computed, &parent, depth + 1),
            None => Ok(None),
        },
        Expr::Union(exprs) => {
            for e in exprs {
                if let Some(path) = explain_expr(inner, state, tenant_id, subject, relation, e, object, depth)? {
                    return Ok(Some(path));
                }
            }
            Ok(None)
        }
        Expr::Intersection(exprs) => {
            let mut combined = Vec::new();
            for e in exprs {
                match explain_expr(inner, state, tenant_id, subject, relation, e, object, depth)? {
                    Some(path) => combined.extend(path),
                    None => return Ok(None),
                }
            }
            Ok(Some(combined))
        }
        Expr::Exclusion(a, b) => {
            let include = explain_expr(inner, state, tenant_id, subject, relation, a, object, depth)?;
            match include {
                Some(path) if explain_expr(inner, state, tenant_id, subject, relation, b, object, depth)?.is_none() => Ok(Some(path)),
                _ => Ok(None),
            }
        }
    }
}

fn collect_subjects(inner: &Inner, tenant_id: &str, permission: &str, object: &Entity, visited: &mut HashSet<(String, String, String)>) -> Result<HashSet<Entity>> {
    let key = (object.entity_type.clone(), object.entity_id.clone(), permission.to_owned());
    if !visited.insert(key) {
        return Ok(HashSet::new());
    }
    let ns = namespace_for(inner, object)?;
    let expr = ns.expr_for(permission)?;
    collect_subjects_expr(inner, tenant_id, permission, expr, object, visited)
}

fn collect_subjects_expr(inner: &Inner, tenant_id: &str, relation: &str, expr: &Expr, object: &Entity, visited: &mut HashSet<(String, String, String)>) -> Result<HashSet<Entity>> {
    match expr {
        Expr::This => Ok(direct_tuples_for(inner, tenant_id, object, relation)
            .into_iter()
            .map(|t| Entity::new(t.subject_type, t.subject_id))
            .collect()),
        Expr::Relation(r) => collect_subjects(inner, tenant_id, r, object, visited),
        Expr::TupleToUserset { tupleset, computed } => {
            let mut out = HashSet::new();
            for tuple in direct_tuples_for(inner, tenant_id, object, tupleset) {
                let related = Entity::new(tuple.subject_type, tuple.subject_id);
                out.extend(collect_subjects(inner, tenant_id, computed, &related, visited)?);
            }
            Ok(out)
        }
        Expr::Parent(computed) => match parent_of(object) {
            Some(parent) => collect_subjects(inner, tenant_id, computed, &parent, visited),
            None => Ok(HashSet::new()),
        },
        Expr::Union(exprs) => {
            let mut out = HashSet::new();
            for e in exprs {
                out.extend(collect_subjects_expr(inner, tenant_id, relation, e, object, visited)?);
            }
            Ok(out)
        }
        Expr::Intersection(exprs) => {
            let mut iter = exprs.iter();
            let first = match iter.next() {
                Some(e) => collect_subjects_expr(inner, tenant_id, relation, e, object, visited)?,
                None => return Ok(HashSet::new()),
            };
            let mut result = first;
            for e in iter {
                let next = collect_subjects_expr(inner, tenant_id, relation, e, object, visited)?;
                result.retain(|s| next.contains(s));
            }
            Ok(result)
        }
        Expr::Exclusion(a, b) => {
            let mut include = collect_subjects_expr(inner, tenant_id, relation, a, object, visited)?;
            let exclude = collect_subjects_expr(inner, tenant_id, relation, b, object, visited)?;
            include.retain(|s| !exclude.contains(s));
            Ok(include)
        }
    }
}
