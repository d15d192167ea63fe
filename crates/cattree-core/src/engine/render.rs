//! Text and nested views of the forest
//!
//! Both walks use an explicit stack so depth is bounded by memory, not by
//! the call stack.

use std::collections::HashMap;

use serde::Serialize;

use crate::error::Result;
use crate::store::{CategoryId, CategoryStore};

const INDENT: &str = "  ";
const BULLET: &str = "- ";

/// Nested, serializable view of one category and its descendants
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreeNode {
    pub id: u64,
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<TreeNode>,
}

struct Visit {
    id: CategoryId,
    depth: usize,
    name: String,
    children: Vec<CategoryId>,
}

/// Pre-order walk, roots in store order
fn preorder<S: CategoryStore>(store: &S) -> Result<Vec<Visit>> {
    let mut visited = Vec::new();
    let mut stack: Vec<(CategoryId, usize)> = store
        .find_all_roots()?
        .iter()
        .rev()
        .map(|c| (c.id, 0))
        .collect();

    while let Some((id, depth)) = stack.pop() {
        let Some(node) = store.find_by_id(id)? else {
            continue;
        };
        for child in node.children.iter().rev() {
            stack.push((*child, depth + 1));
        }
        visited.push(Visit {
            id: node.id,
            depth,
            name: node.name,
            children: node.children,
        });
    }

    Ok(visited)
}

/// `- name` lines, two spaces of indent per level
pub fn render_tree<S: CategoryStore>(store: &S) -> Result<String> {
    let mut out = String::new();
    for visit in preorder(store)? {
        for _ in 0..visit.depth {
            out.push_str(INDENT);
        }
        out.push_str(BULLET);
        out.push_str(&visit.name);
        out.push('\n');
    }
    Ok(out)
}

pub fn snapshot<S: CategoryStore>(store: &S) -> Result<Vec<TreeNode>> {
    let order = preorder(store)?;
    let mut built: HashMap<CategoryId, TreeNode> = HashMap::with_capacity(order.len());
    let mut roots = Vec::new();

    // reversed pre-order visits every child before its parent
    for visit in order.into_iter().rev() {
        let node = TreeNode {
            id: visit.id.get(),
            name: visit.name,
            children: visit
                .children
                .iter()
                .filter_map(|child| built.remove(child))
                .collect(),
        };
        if visit.depth == 0 {
            roots.push(node);
        } else {
            built.insert(visit.id, node);
        }
    }

    roots.reverse();
    Ok(roots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{CategoryForest, NewCategory};

    fn sample() -> CategoryForest {
        let mut store = CategoryForest::new();
        let root = store.save(NewCategory::root("root")).unwrap();
        let c1 = store.save(NewCategory::child("c1", root.id)).unwrap();
        store.save(NewCategory::child("c2", root.id)).unwrap();
        store.save(NewCategory::child("deep", c1.id)).unwrap();
        store.save(NewCategory::root("other")).unwrap();
        store
    }

    #[test]
    fn empty_store_renders_nothing() {
        assert_eq!(render_tree(&CategoryForest::new()).unwrap(), "");
        assert!(snapshot(&CategoryForest::new()).unwrap().is_empty());
    }

    #[test]
    fn renders_preorder_with_indent() {
        let text = render_tree(&sample()).unwrap();
        assert_eq!(text, "- root\n  - c1\n    - deep\n  - c2\n- other\n");
    }

    #[test]
    fn deep_chain_does_not_recurse() {
        let mut store = CategoryForest::new();
        let mut parent = store.save(NewCategory::root("n")).unwrap();
        for _ in 0..2_000 {
            parent = store.save(NewCategory::child("n", parent.id)).unwrap();
        }
        let text = render_tree(&store).unwrap();
        assert_eq!(text.lines().count(), 2_001);
        assert!(text.ends_with(&format!("{}- n\n", INDENT.repeat(2_000))));
    }

    #[test]
    fn snapshot_nests_children_in_order() {
        let nodes = snapshot(&sample()).unwrap();
        let names: Vec<_> = nodes.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["root", "other"]);

        let root = &nodes[0];
        let children: Vec<_> = root.children.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(children, vec!["c1", "c2"]);
        assert_eq!(root.children[0].children[0].name, "deep");
        assert!(nodes[1].children.is_empty());
    }
}
