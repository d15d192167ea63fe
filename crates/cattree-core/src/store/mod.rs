//! # Store Module
//!
//! Persistence contract for the category hierarchy.
//!
//! The engine only talks to a [`CategoryStore`]; it never walks an object
//! graph. Every category is addressed by its [`CategoryId`], and the parent
//! and child links are ids held in an arena.
//!
//! ## Module layout
//!
//! - `forest`: in-memory arena (`CategoryForest`)
//! - `file`: arena persisted to a TOML file (`FileStore`)
//!
//! ## Example
//!
//! ```rust
//! use cattree_core::store::{CategoryForest, CategoryStore, NewCategory};
//!
//! let mut store = CategoryForest::new();
//! let root = store.save(NewCategory::root("books")).unwrap();
//! store.save(NewCategory::child("fiction", root.id)).unwrap();
//!
//! assert!(store.exists_root_with_name("books").unwrap());
//! assert_eq!(store.count().unwrap(), 2);
//! ```

mod file;
mod forest;

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Result;

pub use file::{FileStore, DEFAULT_STORE_FILE};
pub use forest::{CategoryForest, CategoryRecord, ForestFile};

/// Opaque category identifier, assigned by the store on first save
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(u64);

impl CategoryId {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A node of the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    /// Normalized (lower-cased) name
    pub name: String,
    /// `None` for roots
    pub parent: Option<CategoryId>,
    /// Derived from the `parent` links, in creation order
    pub children: Vec<CategoryId>,
    pub created_at: DateTime<Utc>,
}

impl Category {
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

/// A category that has not been saved yet
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCategory {
    pub name: String,
    pub parent: Option<CategoryId>,
}

impl NewCategory {
    pub fn root(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parent: None,
        }
    }

    pub fn child(name: impl Into<String>, parent: CategoryId) -> Self {
        Self {
            name: name.into(),
            parent: Some(parent),
        }
    }
}

/// Lookup and mutation contract the hierarchy engine depends on.
///
/// Names passed in are already normalized. Enumerations return categories
/// in id order, which is insertion order.
pub trait CategoryStore {
    fn find_root_by_name(&self, name: &str) -> Result<Option<Category>>;

    fn find_child_by_name_and_parent(
        &self,
        name: &str,
        parent: CategoryId,
    ) -> Result<Option<Category>>;

    fn exists_root_with_name(&self, name: &str) -> Result<bool> {
        Ok(self.find_root_by_name(name)?.is_some())
    }

    fn find_all_roots(&self) -> Result<Vec<Category>>;

    /// First category with this name at any depth
    fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        Ok(self.find_all_by_name(name)?.into_iter().next())
    }

    /// Every category with this name at any depth
    fn find_all_by_name(&self, name: &str) -> Result<Vec<Category>>;

    fn find_by_id(&self, id: CategoryId) -> Result<Option<Category>>;

    fn find_children(&self, parent: CategoryId) -> Result<Vec<Category>>;

    fn find_all(&self) -> Result<Vec<Category>>;

    /// Persist a new category and return it with its assigned id.
    ///
    /// Fails with `DuplicateAtScope` if a sibling already has the name.
    fn save(&mut self, category: NewCategory) -> Result<Category>;

    /// Delete a single category. Fails with `HasChildren` if it still has children.
    fn delete(&mut self, id: CategoryId) -> Result<()>;

    fn count(&self) -> Result<usize>;
}
