//! In-memory arena of categories

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Category, CategoryId, CategoryStore, NewCategory};
use crate::error::{CatTreeError, Result};

/// Flat id -> node map with parent ids and derived child lists
#[derive(Debug, Clone)]
pub struct CategoryForest {
    next_id: u64,
    nodes: BTreeMap<CategoryId, Category>,
    /// (parent scope, name) -> id
    scopes: HashMap<(Option<CategoryId>, String), CategoryId>,
}

impl Default for CategoryForest {
    fn default() -> Self {
        Self::new()
    }
}

impl CategoryForest {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            nodes: BTreeMap::new(),
            scopes: HashMap::new(),
        }
    }

    /// Rebuild a forest from persisted records.
    ///
    /// Rejects duplicate ids, dangling parents, cycles and duplicate siblings.
    pub fn from_file(file: ForestFile) -> Result<Self> {
        let mut forest = Self::new();

        for record in &file.categories {
            let id = CategoryId::new(record.id);
            if forest.nodes.contains_key(&id) {
                return Err(corrupt(format!("duplicate id {}", id)));
            }
            forest.nodes.insert(
                id,
                Category {
                    id,
                    name: record.name.clone(),
                    parent: record.parent.map(CategoryId::new),
                    children: Vec::new(),
                    created_at: record.created_at,
                },
            );
        }

        let links: Vec<(CategoryId, Option<CategoryId>, String)> = forest
            .nodes
            .values()
            .map(|c| (c.id, c.parent, c.name.clone()))
            .collect();

        for (id, parent, name) in links {
            if let Some(parent_id) = parent {
                if parent_id == id {
                    return Err(corrupt(format!("category {} is its own parent", id)));
                }
                match forest.nodes.get_mut(&parent_id) {
                    Some(p) => p.children.push(id),
                    None => {
                        return Err(corrupt(format!(
                            "category {} references missing parent {}",
                            id, parent_id
                        )))
                    }
                }
            }
            if forest.scopes.insert((parent, name.clone()), id).is_some() {
                return Err(corrupt(format!(
                    "duplicate sibling name '{}' under {}",
                    name,
                    parent.map_or("the top level".to_string(), |p| p.to_string())
                )));
            }
        }

        forest.check_acyclic()?;

        let max_id = forest.nodes.keys().next_back().map_or(0, |id| id.get());
        forest.next_id = file.next_id.max(max_id + 1);

        Ok(forest)
    }

    pub fn to_file(&self) -> ForestFile {
        ForestFile {
            next_id: self.next_id,
            categories: self
                .nodes
                .values()
                .map(|c| CategoryRecord {
                    id: c.id.get(),
                    name: c.name.clone(),
                    parent: c.parent.map(CategoryId::get),
                    created_at: c.created_at,
                })
                .collect(),
        }
    }

    pub fn get(&self, id: CategoryId) -> Option<&Category> {
        self.nodes.get(&id)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Walk every parent chain; a chain longer than the forest means a cycle
    fn check_acyclic(&self) -> Result<()> {
        let limit = self.nodes.len();
        for start in self.nodes.keys() {
            let mut steps = 0;
            let mut current = self.nodes.get(start).and_then(|c| c.parent);
            while let Some(id) = current {
                steps += 1;
                if steps > limit {
                    return Err(corrupt(format!("cycle through category {}", start)));
                }
                current = self.nodes.get(&id).and_then(|c| c.parent);
            }
        }
        Ok(())
    }

    fn collect(&self, ids: &[CategoryId]) -> Vec<Category> {
        ids.iter()
            .filter_map(|id| self.nodes.get(id))
            .cloned()
            .collect()
    }
}

impl CategoryStore for CategoryForest {
    fn find_root_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self
            .scopes
            .get(&(None, name.to_string()))
            .and_then(|id| self.nodes.get(id))
            .cloned())
    }

    fn find_child_by_name_and_parent(
        &self,
        name: &str,
        parent: CategoryId,
    ) -> Result<Option<Category>> {
        Ok(self
            .scopes
            .get(&(Some(parent), name.to_string()))
            .and_then(|id| self.nodes.get(id))
            .cloned())
    }

    fn find_all_roots(&self) -> Result<Vec<Category>> {
        Ok(self
            .nodes
            .values()
            .filter(|c| c.is_root())
            .cloned()
            .collect())
    }

    fn find_all_by_name(&self, name: &str) -> Result<Vec<Category>> {
        Ok(self
            .nodes
            .values()
            .filter(|c| c.name == name)
            .cloned()
            .collect())
    }

    fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>> {
        Ok(self.nodes.get(&id).cloned())
    }

    fn find_children(&self, parent: CategoryId) -> Result<Vec<Category>> {
        Ok(self
            .nodes
            .get(&parent)
            .map(|p| self.collect(&p.children))
            .unwrap_or_default())
    }

    fn find_all(&self) -> Result<Vec<Category>> {
        Ok(self.nodes.values().cloned().collect())
    }

    fn save(&mut self, category: NewCategory) -> Result<Category> {
        let scope_key = (category.parent, category.name.clone());

        if let Some(parent_id) = category.parent {
            if !self.nodes.contains_key(&parent_id) {
                return Err(corrupt(format!("parent {} does not exist", parent_id)));
            }
        }

        if self.scopes.contains_key(&scope_key) {
            let scope = match category.parent.and_then(|p| self.nodes.get(&p)) {
                Some(p) => format!("'{}'", p.name),
                None => "the top level".to_string(),
            };
            return Err(CatTreeError::DuplicateAtScope {
                name: category.name,
                scope,
            });
        }

        let id = CategoryId::new(self.next_id);
        self.next_id += 1;

        let saved = Category {
            id,
            name: category.name,
            parent: category.parent,
            children: Vec::new(),
            created_at: Utc::now(),
        };

        if let Some(parent) = saved.parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.push(id);
        }
        self.scopes.insert(scope_key, id);
        self.nodes.insert(id, saved.clone());

        Ok(saved)
    }

    fn delete(&mut self, id: CategoryId) -> Result<()> {
        let category = self
            .nodes
            .get(&id)
            .ok_or_else(|| CatTreeError::SegmentNotFound {
                segment: id.to_string(),
            })?;

        if category.has_children() {
            return Err(CatTreeError::HasChildren {
                path: category.name.clone(),
                count: category.children.len(),
            });
        }

        let scope_key = (category.parent, category.name.clone());
        let parent = category.parent;

        if let Some(parent) = parent.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.retain(|child| *child != id);
        }
        self.scopes.remove(&scope_key);
        self.nodes.remove(&id);

        Ok(())
    }

    fn count(&self) -> Result<usize> {
        Ok(self.nodes.len())
    }
}

fn corrupt(message: String) -> CatTreeError {
    CatTreeError::CorruptStore { message }
}

/// On-disk layout of a forest
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ForestFile {
    #[serde(default)]
    pub next_id: u64,
    #[serde(default)]
    pub categories: Vec<CategoryRecord>,
}

/// One persisted category; children are not stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRecord {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<u64>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: u64, name: &str, parent: Option<u64>) -> CategoryRecord {
        CategoryRecord {
            id,
            name: name.to_string(),
            parent,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn save_assigns_ids_and_links_children() {
        let mut forest = CategoryForest::new();
        let root = forest.save(NewCategory::root("root")).unwrap();
        let a = forest.save(NewCategory::child("a", root.id)).unwrap();
        let b = forest.save(NewCategory::child("b", root.id)).unwrap();

        assert_eq!(root.id.get(), 1);
        assert!(a.id < b.id);
        assert_eq!(forest.get(root.id).unwrap().children, vec![a.id, b.id]);

        let children: Vec<_> = forest
            .find_children(root.id)
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert_eq!(children, vec!["a", "b"]);
    }

    #[test]
    fn scope_lookups() {
        let mut forest = CategoryForest::new();
        let p1 = forest.save(NewCategory::root("p1")).unwrap();
        let p2 = forest.save(NewCategory::root("p2")).unwrap();
        let x1 = forest.save(NewCategory::child("x", p1.id)).unwrap();
        let x2 = forest.save(NewCategory::child("x", p2.id)).unwrap();

        assert!(forest.find_root_by_name("x").unwrap().is_none());
        assert!(!forest.exists_root_with_name("x").unwrap());
        assert_eq!(
            forest.find_child_by_name_and_parent("x", p2.id).unwrap().unwrap().id,
            x2.id
        );
        // global lookup returns the first match in id order
        assert_eq!(forest.find_by_name("x").unwrap().unwrap().id, x1.id);
        assert_eq!(forest.find_all_by_name("x").unwrap().len(), 2);
        assert_eq!(forest.find_all_roots().unwrap().len(), 2);
    }

    #[test]
    fn save_rejects_duplicate_sibling() {
        let mut forest = CategoryForest::new();
        let p = forest.save(NewCategory::root("p")).unwrap();
        forest.save(NewCategory::child("x", p.id)).unwrap();

        let err = forest.save(NewCategory::child("x", p.id)).unwrap_err();
        assert!(matches!(err, CatTreeError::DuplicateAtScope { ref scope, .. } if scope == "'p'"));

        let err = forest.save(NewCategory::root("p")).unwrap_err();
        assert!(matches!(err, CatTreeError::DuplicateAtScope { ref scope, .. } if scope == "the top level"));
        assert_eq!(forest.len(), 2);
    }

    #[test]
    fn save_rejects_missing_parent() {
        let mut forest = CategoryForest::new();
        let err = forest
            .save(NewCategory::child("x", CategoryId::new(42)))
            .unwrap_err();
        assert!(matches!(err, CatTreeError::CorruptStore { .. }));
        assert!(forest.is_empty());
    }

    #[test]
    fn delete_keeps_children_view_in_sync() {
        let mut forest = CategoryForest::new();
        let root = forest.save(NewCategory::root("root")).unwrap();
        let leaf = forest.save(NewCategory::child("leaf", root.id)).unwrap();

        let err = forest.delete(root.id).unwrap_err();
        assert!(matches!(err, CatTreeError::HasChildren { count: 1, .. }));

        forest.delete(leaf.id).unwrap();
        assert!(forest.get(root.id).unwrap().children.is_empty());
        assert!(forest
            .find_child_by_name_and_parent("leaf", root.id)
            .unwrap()
            .is_none());

        // name is free again in that scope
        forest.save(NewCategory::child("leaf", root.id)).unwrap();
        assert_eq!(forest.count().unwrap(), 2);
    }

    #[test]
    fn file_roundtrip_rebuilds_children() {
        let mut forest = CategoryForest::new();
        let root = forest.save(NewCategory::root("root")).unwrap();
        let child = forest.save(NewCategory::child("child", root.id)).unwrap();

        let restored = CategoryForest::from_file(forest.to_file()).unwrap();
        assert_eq!(restored.get(root.id).unwrap().children, vec![child.id]);
        assert_eq!(restored.len(), 2);

        // ids keep increasing after reload
        let mut restored = restored;
        let next = restored.save(NewCategory::root("other")).unwrap();
        assert_eq!(next.id.get(), 3);
    }

    #[test]
    fn from_file_rejects_cycles() {
        let file = ForestFile {
            next_id: 3,
            categories: vec![record(1, "a", Some(2)), record(2, "b", Some(1))],
        };
        let err = CategoryForest::from_file(file).unwrap_err();
        assert!(matches!(err, CatTreeError::CorruptStore { .. }));

        let file = ForestFile {
            next_id: 2,
            categories: vec![record(1, "a", Some(1))],
        };
        assert!(CategoryForest::from_file(file).is_err());
    }

    #[test]
    fn from_file_rejects_dangling_and_duplicates() {
        let dangling = ForestFile {
            next_id: 2,
            categories: vec![record(1, "a", Some(9))],
        };
        assert!(CategoryForest::from_file(dangling).is_err());

        let dup_sibling = ForestFile {
            next_id: 3,
            categories: vec![record(1, "a", None), record(2, "a", None)],
        };
        assert!(CategoryForest::from_file(dup_sibling).is_err());

        let dup_id = ForestFile {
            next_id: 3,
            categories: vec![record(1, "a", None), record(1, "b", None)],
        };
        assert!(CategoryForest::from_file(dup_id).is_err());
    }
}
