//! # Tree Transform
//!
//! Flatten a hierarchy into a depth-annotated list in paint order. The output
//! is derived data: rebuilt on every call, never cached, never mutated in
//! place.
//!
//! ```text
//! A            A:0
//! ├── B        B:1
//! │   └── D →  D:2
//! └── C        C:1
//! ```

use crate::{NodeId, Page, PageId, Parent, SceneGraph};
use serde::{Deserialize, Serialize};

/// Anything that can answer "what are the children of this parent".
/// Unknown parents have no children.
pub trait Hierarchy {
    fn children(&self, parent: Parent) -> &[NodeId];

    fn contains(&self, id: NodeId) -> bool;

    /// Hidden nodes and their subtrees are skipped by [`linearize_visible`]
    fn is_visible(&self, _id: NodeId) -> bool {
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatNode {
    pub node: NodeId,
    pub depth: usize,
}

impl Hierarchy for SceneGraph {
    fn children(&self, parent: Parent) -> &[NodeId] {
        self.children_of(parent).unwrap_or(&[])
    }

    fn contains(&self, id: NodeId) -> bool {
        SceneGraph::contains(self, id)
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.get(id).is_some_and(|n| n.active)
    }
}

impl Hierarchy for Page {
    fn children(&self, parent: Parent) -> &[NodeId] {
        self.graph.children(parent)
    }

    fn contains(&self, id: NodeId) -> bool {
        self.graph.contains(id)
    }

    fn is_visible(&self, id: NodeId) -> bool {
        self.graph.is_visible(id)
    }
}

/// Depth-first pre-order walk from `root`.
///
/// Rooting at a node includes that node at depth 0; rooting at
/// [`Parent::Root`] puts the top-level nodes at depth 0. Uses an explicit
/// stack, so deep trees cannot overflow.
pub fn linearize<T: Hierarchy + ?Sized>(tree: &T, root: Parent) -> Vec<FlatNode> {
    walk(tree, root, false)
}

/// Like [`linearize`], skipping inactive nodes together with their subtrees
pub fn linearize_visible<T: Hierarchy + ?Sized>(tree: &T, root: Parent) -> Vec<FlatNode> {
    walk(tree, root, true)
}

fn walk<T: Hierarchy + ?Sized>(tree: &T, root: Parent, visible_only: bool) -> Vec<FlatNode> {
    let mut stack: Vec<(NodeId, usize)> = match root {
        Parent::Root => tree.children(Parent::Root).iter().rev().map(|id| (*id, 0)).collect(),
        Parent::Node(id) if tree.contains(id) => vec![(id, 0)],
        Parent::Node(_) => Vec::new(),
    };
    let mut out = Vec::with_capacity(stack.len());

    while let Some((id, depth)) = stack.pop() {
        if visible_only && !tree.is_visible(id) {
            continue;
        }
        out.push(FlatNode { node: id, depth });
        stack.extend(tree.children(Parent::Node(id)).iter().rev().map(|c| (*c, depth + 1)));
    }
    out
}

/// One row of a layer list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HierarchyRow {
    pub id: NodeId,
    pub depth: usize,
    pub name: String,
    pub kind: String,
    pub active: bool,
    pub locked: bool,
    pub has_children: bool,
}

/// Flattened view of a page for sidebars and layer panels
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageHierarchy {
    pub page: PageId,
    pub name: String,
    pub rows: Vec<HierarchyRow>,
}

impl PageHierarchy {
    pub fn build(page: &Page) -> Self {
        let rows = linearize(page, Parent::Root)
            .into_iter()
            .filter_map(|flat| {
                let node = page.graph.get(flat.node)?;
                Some(HierarchyRow {
                    id: node.id,
                    depth: flat.depth,
                    name: node.name.clone(),
                    kind: node.kind.name().to_string(),
                    active: node.active,
                    locked: node.locked,
                    has_children: !node.children.is_empty(),
                })
            })
            .collect();

        Self {
            page: page.id,
            name: page.name.clone(),
            rows,
        }
    }
}
