use std::collections::HashMap;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::error::{RebacError, Result};

/// One relation's definition (§4.5 "Namespace config"). `This` covers the
/// "direct" case from the spec: tuples of the containing relation apply
/// directly. The other variants compose relations together.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Expr {
    /// Tuples written directly against this relation.
    This,
    /// A computed userset: evaluate a sibling relation on the same object.
    Relation(String),
    /// "Arrow": follow every tuple of `tupleset` from the object to a
    /// related object, then evaluate `computed` there.
    TupleToUserset { tupleset: String, computed: String },
    /// Built-in hierarchical inheritance: evaluate `computed` on the
    /// object's path-parent, walking upward.
    Parent(String),
    Union(Vec<Expr>),
    Intersection(Vec<Expr>),
    Exclusion(Box<Expr>, Box<Expr>),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NamespaceConfig {
    pub object_type: String,
    pub relations: HashMap<String, Expr>,
}

impl NamespaceConfig {
    pub fn expr_for(&self, relation: &str) -> Result<&Expr> {
        self.relations.get(relation).ok_or_else(|| RebacError::UndefinedRelation {
            object_type: self.object_type.clone(),
            relation: relation.to_owned(),
        })
    }
}

/// Built-in namespace for `file` objects, matching the worked examples in
/// §8 (S3: inherited write via `parent`; S4-style intersections are
/// user-definable on top of this).
pub fn default_file_namespace() -> NamespaceConfig {
    let mut relations = HashMap::new();
    relations.insert("owner".to_owned(), Expr::This);
    relations.insert("direct_editor".to_owned(), Expr::This);
    relations.insert("reader".to_owned(), Expr::This);
    relations.insert(
        "write".to_owned(),
        Expr::Union(vec![Expr::Relation("owner".to_owned()), Expr::Relation("direct_editor".to_owned()), Expr::Parent("write".to_owned())]),
    );
    relations.insert(
        "read".to_owned(),
        Expr::Union(vec![
            Expr::Relation("owner".to_owned()),
            Expr::Relation("direct_editor".to_owned()),
            Expr::Relation("reader".to_owned()),
            Expr::Parent("read".to_owned()),
        ]),
    );
    relations.insert(
        "create".to_owned(),
        Expr::Union(vec![Expr::Relation("owner".to_owned()), Expr::Relation("direct_editor".to_owned()), Expr::Parent("create".to_owned())]),
    );
    relations.insert("delete".to_owned(), Expr::Union(vec![Expr::Relation("owner".to_owned()), Expr::Parent("delete".to_owned())]));
    NamespaceConfig {
        object_type: "file".to_owned(),
        relations,
    }
}

/// Holds one [`NamespaceConfig`] per object type. Seeded with the built-in
/// `file` namespace; callers register others via `namespace_create` (§4.8).
pub struct NamespaceRegistry {
    configs: RwLock<HashMap<String, NamespaceConfig>>,
}

impl NamespaceRegistry {
    pub fn new() -> Self {
        let mut configs = HashMap::new();
        configs.insert("file".to_owned(), default_file_namespace());
        Self { configs: RwLock::new(configs) }
    }

    pub fn create(&self, config: NamespaceConfig) -> Result<()> {
        let mut configs = self.configs.write();
        if configs.contains_key(&config.object_type) {
            return Err(RebacError::NamespaceExists(config.object_type));
        }
        configs.insert(config.object_type.clone(), config);
        Ok(())
    }

    pub fn get(&self, object_type: &str) -> Result<NamespaceConfig> {
        self.configs.read().get(object_type).cloned().ok_or_else(|| RebacError::NamespaceNotFound(object_type.to_owned()))
    }

    pub fn list(&self) -> Vec<NamespaceConfig> {
        self.configs.read().values().cloned().collect()
    }

    pub fn delete(&self, object_type: &str) -> Result<()> {
        self.configs
            .write()
            .remove(object_type)
            .map(|_| ())
            .ok_or_else(|| RebacError::NamespaceNotFound(object_type.to_owned()))
    }
}

impl Default for NamespaceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_namespace_defines_write_as_union_with_parent() {
        let registry = NamespaceRegistry::new();
        let file_ns = registry.get("file").unwrap();
        assert!(matches!(file_ns.expr_for("write").unwrap(), Expr::Union(_)));
    }

    #[test]
    fn duplicate_namespace_create_is_rejected() {
        let registry = NamespaceRegistry::new();
        let err = registry.create(default_file_namespace());
        assert!(matches!(err, Err(RebacError::NamespaceExists(_))));
    }

    #[test]
    fn delete_then_get_not_found() {
        let registry = NamespaceRegistry::new();
        registry.delete("file").unwrap();
        assert!(matches!(registry.get("file"), Err(RebacError::NamespaceNotFound(_))));
    }
}
