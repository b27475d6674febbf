use crate::store::Store;
use crate::types::EntityRecord;

impl Store {
    /// Registers or updates an entity's parent link, used by the
    /// hierarchical-parent rewrite rule in namespace configs (§4.5).
    pub fn upsert_entity(&self, record: EntityRecord) {
        let mut inner = self.inner.write();
        inner.entities.insert((record.entity_type.clone(), record.entity_id.clone()), record);
    }

    pub fn get_entity(&self, entity_type: &str, entity_id: &str) -> Option<EntityRecord> {
        self.inner.read().entities.get(&(entity_type.to_owned(), entity_id.to_owned())).cloned()
    }

    pub fn remove_entity(&self, entity_type: &str, entity_id: &str) {
        self.inner.write().entities.remove(&(entity_type.to_owned(), entity_id.to_owned()));
    }

    pub fn children_of(&self, parent_type: &str, parent_id: &str) -> Vec<EntityRecord> {
        self.inner
            .read()
            .entities
            .values()
            .filter(|e| e.parent_type.as_deref() == Some(parent_type) && e.parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_lookup_finds_children() {
        let store = Store::new();
        store.upsert_entity(EntityRecord {
            entity_type: "folder".into(),
            entity_id: "/a/b".into(),
            parent_type: Some("folder".into()),
            parent_id: Some("/a".into()),
        });
        let children = store.children_of("folder", "/a");
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].entity_id, "/a/b");
    }
}
