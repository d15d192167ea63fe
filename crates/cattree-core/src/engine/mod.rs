//! # Engine Module
//!
//! Path-driven mutations and views over a [`CategoryStore`].
//!
//! - `add_category` walks a path from the root scope (or below an explicit
//!   parent), reusing existing segments and creating the missing ones.
//! - `remove_category` resolves a path top-down and deletes the final node.
//! - `render_tree` prints the forest as an indented `- name` list.
//!
//! ```rust
//! use cattree_core::engine::HierarchyEngine;
//! use cattree_core::store::CategoryForest;
//!
//! let mut engine = HierarchyEngine::new(CategoryForest::new());
//! engine.add_category("Books/Fiction", None).unwrap();
//! engine.add_category("Books/Poetry", None).unwrap();
//!
//! assert_eq!(
//!     engine.render_tree().unwrap(),
//!     "- books\n  - fiction\n  - poetry\n"
//! );
//! ```

mod message;
mod path;
mod render;

use std::fmt;

use crate::config::{Config, RemovalPolicy};
use crate::error::{CatTreeError, Result};
use crate::store::{Category, CategoryId, CategoryStore, NewCategory};
use crate::validation::NameRules;

pub use message::ResultMessage;
pub use path::{join, CategoryPath, PATH_SEPARATOR};
pub use render::TreeNode;

/// Paths inserted by [`HierarchyEngine::seed_sample`], in order
pub const SAMPLE_PATHS: &[&str] = &[
    "Root",
    "Root/Child 1",
    "Root/Child 2",
    "Root/Child 1/SubChild 1",
];

/// Outcome of a successful insertion
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// Full normalized path of the final node
    pub path: String,
    /// Newly created categories, top-down
    pub created: Vec<Category>,
    /// Segments that already existed and were reused
    pub existing: usize,
}

impl fmt::Display for Added {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.created.len() {
            1 => write!(f, "Category '{}' added.", self.path),
            n => write!(f, "Category '{}' added ({} categories created).", self.path, n),
        }
    }
}

/// Outcome of a successful removal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Removed {
    /// The path as the caller wrote it
    pub path: String,
    /// Number of categories deleted, including descendants under cascade
    pub removed: usize,
}

impl fmt::Display for Removed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.removed {
            1 => write!(f, "Category '{}' removed.", self.path),
            n => write!(f, "Category '{}' removed with {} descendants.", self.path, n - 1),
        }
    }
}

/// Category hierarchy operations over a store
#[derive(Debug)]
pub struct HierarchyEngine<S> {
    store: S,
    rules: NameRules,
    removal: RemovalPolicy,
}

impl<S: CategoryStore> HierarchyEngine<S> {
    pub fn new(store: S) -> Self {
        Self {
            store,
            rules: NameRules::default(),
            removal: RemovalPolicy::default(),
        }
    }

    pub fn from_config(store: S, config: &Config) -> Self {
        Self::new(store)
            .with_rules(config.name_rules())
            .with_removal_policy(config.removal.policy)
    }

    pub fn with_rules(mut self, rules: NameRules) -> Self {
        self.rules = rules;
        self
    }

    pub fn with_removal_policy(mut self, policy: RemovalPolicy) -> Self {
        self.removal = policy;
        self
    }

    pub fn rules(&self) -> &NameRules {
        &self.rules
    }

    pub fn removal_policy(&self) -> RemovalPolicy {
        self.removal
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.store.count()? == 0)
    }

    /// Insert a category path.
    ///
    /// Without `parent` the walk starts at the root scope. With it, the walk
    /// starts below the resolved parent: a bare name prefers a root of that
    /// name and otherwise must match exactly one category; a name containing
    /// `/` is resolved as a full path from the root scope.
    ///
    /// Existing segments are reused. Fails with `DuplicateAtScope` when the
    /// whole path already exists.
    pub fn add_category(&mut self, path: &str, parent: Option<&str>) -> Result<Added> {
        let target = CategoryPath::parse(path)?;
        let segments = target.normalized(&self.rules)?;

        let parent_path = match parent.map(str::trim).filter(|p| !p.is_empty()) {
            Some(raw) => {
                let parsed = CategoryPath::parse(raw)?;
                let normalized = parsed.normalized(&self.rules)?;
                Some((parsed, normalized))
            }
            None => None,
        };

        // All names are valid from here on; the store is touched only now.
        let mut current = match parent_path {
            Some((parsed, normalized)) => Some(self.resolve_parent(&parsed, &normalized)?),
            None => None,
        };

        let mut names = match &current {
            Some(p) => self.ancestry_names(p)?,
            None => Vec::new(),
        };

        let mut created = Vec::new();
        let mut existing = 0;
        let last = segments.len() - 1;

        for (i, name) in segments.into_iter().enumerate() {
            let found = match &current {
                None => self.store.find_root_by_name(&name)?,
                Some(p) => self.store.find_child_by_name_and_parent(&name, p.id)?,
            };

            let node = match found {
                Some(_) if i == last => {
                    return Err(CatTreeError::DuplicateAtScope {
                        name,
                        scope: scope_label(current.as_ref()),
                    });
                }
                Some(node) => {
                    tracing::debug!(name = %node.name, id = %node.id, "reusing existing category");
                    existing += 1;
                    node
                }
                None => {
                    let new = NewCategory {
                        name,
                        parent: current.as_ref().map(|p| p.id),
                    };
                    let node = self.store.save(new)?;
                    tracing::info!(name = %node.name, id = %node.id, parent = ?node.parent, "category created");
                    created.push(node.clone());
                    node
                }
            };

            names.push(node.name.clone());
            current = Some(node);
        }

        Ok(Added {
            path: join(&names),
            created,
            existing,
        })
    }

    /// Remove the category at `path`, resolved top-down from the root scope.
    ///
    /// With the `Reject` policy a category with children is left in place and
    /// `HasChildren` is returned. With `Cascade` its descendants go first.
    pub fn remove_category(&mut self, path: &str) -> Result<Removed> {
        let target = CategoryPath::parse(path)?;
        let node = self.resolve_parsed(&target)?;

        let removed = if node.has_children() {
            match self.removal {
                RemovalPolicy::Reject => {
                    return Err(CatTreeError::HasChildren {
                        path: target.as_str().to_string(),
                        count: node.children.len(),
                    });
                }
                RemovalPolicy::Cascade => self.delete_subtree(&node)?,
            }
        } else {
            self.store.delete(node.id)?;
            1
        };

        tracing::info!(path = %target.as_str(), removed, "category removed");
        Ok(Removed {
            path: target.as_str().to_string(),
            removed,
        })
    }

    /// Resolve a path top-down from the root scope
    pub fn resolve(&self, path: &str) -> Result<Category> {
        let target = CategoryPath::parse(path)?;
        self.resolve_parsed(&target)
    }

    /// Names from the root down to `category` itself
    pub fn ancestry_names(&self, category: &Category) -> Result<Vec<String>> {
        let mut names = vec![category.name.clone()];
        let mut next = category.parent;
        while let Some(id) = next {
            let parent = self.find_existing(id)?;
            names.push(parent.name);
            next = parent.parent;
        }
        names.reverse();
        Ok(names)
    }

    pub fn render_tree(&self) -> Result<String> {
        render::render_tree(&self.store)
    }

    pub fn snapshot(&self) -> Result<Vec<TreeNode>> {
        render::snapshot(&self.store)
    }

    /// Insert the sample hierarchy if the store is empty.
    ///
    /// Returns whether anything was inserted.
    pub fn seed_sample(&mut self) -> Result<bool> {
        if !self.is_empty()? {
            return Ok(false);
        }
        for path in SAMPLE_PATHS {
            self.add_category(path, None)?;
        }
        tracing::info!(count = SAMPLE_PATHS.len(), "seeded sample categories");
        Ok(true)
    }

    fn resolve_parsed(&self, target: &CategoryPath) -> Result<Category> {
        let normalized = target.normalized(&self.rules)?;
        let mut current: Option<Category> = None;

        for (raw, name) in target.segments().iter().zip(&normalized) {
            let found = match &current {
                None => self.store.find_root_by_name(name)?,
                Some(p) => self.store.find_child_by_name_and_parent(name, p.id)?,
            };
            match found {
                Some(node) => current = Some(node),
                None => {
                    return Err(CatTreeError::SegmentNotFound {
                        segment: raw.clone(),
                    })
                }
            }
        }

        current.ok_or(CatTreeError::EmptyPath)
    }

    fn resolve_parent(&self, parsed: &CategoryPath, normalized: &[String]) -> Result<Category> {
        if parsed.is_qualified() {
            return self.resolve_parsed(parsed).map_err(|e| match e {
                CatTreeError::SegmentNotFound { .. } => CatTreeError::ParentNotFound {
                    name: parsed.as_str().to_string(),
                },
                other => other,
            });
        }

        let name = &normalized[0];
        if let Some(root) = self.store.find_root_by_name(name)? {
            return Ok(root);
        }

        let mut matches = self.store.find_all_by_name(name)?;
        match matches.len() {
            0 => Err(CatTreeError::ParentNotFound {
                name: parsed.as_str().to_string(),
            }),
            1 => Ok(matches.remove(0)),
            count => {
                tracing::warn!(name = %name, count, "ambiguous parent name");
                Err(CatTreeError::AmbiguousParent {
                    name: parsed.as_str().to_string(),
                    count,
                })
            }
        }
    }

    /// Delete `node` and every descendant, deepest first
    fn delete_subtree(&mut self, node: &Category) -> Result<usize> {
        let mut order = Vec::new();
        let mut stack = vec![node.id];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.find_existing(id)?.children);
        }

        for id in order.iter().rev() {
            self.store.delete(*id)?;
        }
        Ok(order.len())
    }

    fn find_existing(&self, id: CategoryId) -> Result<Category> {
        self.store
            .find_by_id(id)?
            .ok_or_else(|| CatTreeError::CorruptStore {
                message: format!("category {} is referenced but missing", id),
            })
    }
}

fn scope_label(parent: Option<&Category>) -> String {
    match parent {
        Some(p) => format!("'{}'", p.name),
        None => "the top level".to_string(),
    }
}
