//! # Scene Graph
//!
//! Arena of nodes for one page. Nodes are stored behind `Arc` so a cloned graph
//! shares every node it has not modified since; an edit copies the id table and
//! the few nodes it touches.
//!
//! ## Operation Semantics
//!
//! Every operation validates completely before it changes anything. When an
//! error is returned the graph is exactly as it was.
//!
//! ### Insert
//! - Fails on a duplicate id, a missing parent, or a parent that cannot hold
//!   children
//! - The index is clamped to the parent's child count
//!
//! ### Move
//! - Fails if the new parent is the node itself or one of its descendants
//! - The index is read after the node is detached from its old parent
//!
//! ### Remove
//! - Removes the node and all descendants
//! - Returns everything needed to put the subtree back with [`SceneGraph::restore`]

use crate::{IdSource, Node, NodeId, NodePatch, NodeTree, Parent, StructuralResult, StructuralViolation};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(into = "GraphRepr", try_from = "GraphRepr")]
pub struct SceneGraph {
    nodes: HashMap<NodeId, Arc<Node>>,
    roots: Vec<NodeId>,
}

/// A subtree taken out of the graph, root first then descendants in pre-order
#[derive(Debug, Clone, PartialEq)]
pub struct RemovedSubtree {
    pub parent: Parent,
    pub index: usize,
    pub nodes: Vec<Arc<Node>>,
}

impl RemovedSubtree {
    pub fn root(&self) -> Option<NodeId> {
        self.nodes.first().map(|n| n.id)
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|n| n.id)
    }
}

impl SceneGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id).map(|n| n.as_ref())
    }

    /// Shared handle to a node, for callers that want to check sharing
    pub fn get_shared(&self, id: NodeId) -> Option<&Arc<Node>> {
        self.nodes.get(&id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Top-level nodes in paint order
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Nodes in no particular order
    pub fn nodes(&self) -> impl Iterator<Item = &Node> + '_ {
        self.nodes.values().map(|n| n.as_ref())
    }

    pub fn children_of(&self, parent: Parent) -> StructuralResult<&[NodeId]> {
        match parent {
            Parent::Root => Ok(&self.roots),
            Parent::Node(id) => self
                .get(id)
                .map(|n| n.children.as_slice())
                .ok_or(StructuralViolation::ParentNotFound(id)),
        }
    }

    pub fn parent_of(&self, id: NodeId) -> Option<Parent> {
        self.get(id).map(|n| n.parent)
    }

    /// Ancestors of `id`, nearest first
    pub fn ancestors(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut cursor = self.parent_of(id);
        while let Some(Parent::Node(pid)) = cursor {
            // A corrupt parent chain would loop forever
            if out.contains(&pid) || out.len() > self.nodes.len() {
                break;
            }
            out.push(pid);
            cursor = self.parent_of(pid);
        }
        out
    }

    /// True when `ancestor` is a strict ancestor of `node`
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        self.ancestors(node).contains(&ancestor)
    }

    /// Strict descendants of `id` in pre-order
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let Some(node) = self.get(id) else {
            return out;
        };
        let mut stack: Vec<NodeId> = node.children.iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            if let Some(child) = self.get(next) {
                stack.extend(child.children.iter().rev());
            }
        }
        out
    }

    pub fn index_in_parent(&self, id: NodeId) -> Option<usize> {
        let parent = self.parent_of(id)?;
        self.children_of(parent).ok()?.iter().position(|c| *c == id)
    }

    /// Insert a single node. Its `parent` and `children` fields are overwritten.
    pub fn insert(&mut self, parent: Parent, mut node: Node, index: Option<usize>) -> StructuralResult<NodeId> {
        let id = node.id;
        if self.contains(id) {
            return Err(StructuralViolation::DuplicateId(id));
        }
        self.check_container(parent)?;

        node.parent = parent;
        node.children.clear();
        self.nodes.insert(id, Arc::new(node));
        self.attach(id, parent, index)?;

        tracing::trace!(node = %id, ?parent, "inserted node");
        Ok(id)
    }

    /// Insert a detached tree, drawing fresh ids from `ids`.
    /// Returns the new ids in pre-order, root first.
    pub fn insert_tree(
        &mut self,
        parent: Parent,
        tree: &NodeTree,
        index: Option<usize>,
        ids: &mut IdSource,
    ) -> StructuralResult<Vec<NodeId>> {
        self.check_container(parent)?;

        let mut order: Vec<(NodeId, &NodeTree, Parent)> = Vec::new();
        let mut stack = vec![(tree, parent)];
        while let Some((level, level_parent)) = stack.pop() {
            let id = ids.next_node();
            if self.contains(id) {
                return Err(StructuralViolation::DuplicateId(id));
            }
            if !level.children.is_empty() && !level.kind.can_have_children() {
                return Err(StructuralViolation::CannotHaveChildren {
                    node: id,
                    kind: level.kind.name(),
                });
            }
            order.push((id, level, level_parent));
            for child in level.children.iter().rev() {
                stack.push((child, Parent::Node(id)));
            }
        }

        // Pre-order visits siblings in order, so appending keeps child order
        for (position, (id, level, level_parent)) in order.iter().enumerate() {
            let mut node = level.to_node(*id);
            node.parent = *level_parent;
            self.nodes.insert(*id, Arc::new(node));
            let at = if position == 0 { index } else { None };
            self.attach(*id, *level_parent, at)?;
        }

        let created: Vec<NodeId> = order.into_iter().map(|(id, ..)| id).collect();
        tracing::trace!(root = ?created.first(), count = created.len(), "inserted tree");
        Ok(created)
    }

    /// Reparent `id`. `index` counts positions after the node has been
    /// detached, and is clamped.
    pub fn move_node(&mut self, id: NodeId, new_parent: Parent, index: Option<usize>) -> StructuralResult<()> {
        let old_parent = self.parent_of(id).ok_or(StructuralViolation::NodeNotFound(id))?;
        self.check_container(new_parent)?;
        if let Parent::Node(pid) = new_parent {
            if pid == id || self.is_ancestor(id, pid) {
                return Err(StructuralViolation::CycleDetected { node: id, parent: pid });
            }
        }

        self.detach(id, old_parent)?;
        self.attach(id, new_parent, index)?;
        if let Some(node) = self.nodes.get_mut(&id) {
            Arc::make_mut(node).parent = new_parent;
        }

        tracing::trace!(node = %id, from = ?old_parent, to = ?new_parent, "moved node");
        Ok(())
    }

    /// Apply a patch and return the updated node
    pub fn update(&mut self, id: NodeId, patch: NodePatch) -> StructuralResult<&Node> {
        let current = self.get(id).ok_or(StructuralViolation::NodeNotFound(id))?;
        if let Some(kind) = &patch.kind {
            if !kind.same_variant(&current.kind) {
                return Err(StructuralViolation::KindMismatch {
                    node: id,
                    expected: current.kind.name(),
                    found: kind.name(),
                });
            }
        }

        let slot = self.nodes.get_mut(&id).ok_or(StructuralViolation::NodeNotFound(id))?;
        let node = Arc::make_mut(slot);
        patch.apply_to(node);
        Ok(node)
    }

    /// Remove `id` and its whole subtree
    pub fn remove(&mut self, id: NodeId) -> StructuralResult<RemovedSubtree> {
        let parent = self.parent_of(id).ok_or(StructuralViolation::NodeNotFound(id))?;
        let mut ids = vec![id];
        ids.extend(self.descendants(id));

        let index = self.detach(id, parent)?;
        let nodes: Vec<Arc<Node>> = ids.iter().filter_map(|i| self.nodes.remove(i)).collect();

        tracing::trace!(node = %id, count = nodes.len(), "removed subtree");
        Ok(RemovedSubtree { parent, index, nodes })
    }

    /// Put a removed subtree back with its original ids and position
    pub fn restore(&mut self, removed: RemovedSubtree) -> StructuralResult<NodeId> {
        let root = removed.root().ok_or(StructuralViolation::NodeNotFound(NodeId(0)))?;
        if let Some(taken) = removed.ids().find(|id| self.contains(*id)) {
            return Err(StructuralViolation::DuplicateId(taken));
        }
        self.check_container(removed.parent)?;

        for node in removed.nodes {
            self.nodes.insert(node.id, node);
        }
        self.attach(root, removed.parent, Some(removed.index))?;
        if let Some(node) = self.nodes.get_mut(&root) {
            if node.parent != removed.parent {
                Arc::make_mut(node).parent = removed.parent;
            }
        }
        Ok(root)
    }

    /// Full audit of the tree invariants
    pub fn check_integrity(&self) -> StructuralResult<()> {
        for (key, node) in &self.nodes {
            if *key != node.id {
                return Err(StructuralViolation::DuplicateId(node.id));
            }
            if !node.children.is_empty() && !node.kind.can_have_children() {
                return Err(StructuralViolation::CannotHaveChildren {
                    node: node.id,
                    kind: node.kind.name(),
                });
            }
            let siblings = self.children_of(node.parent)?;
            if siblings.iter().filter(|c| **c == node.id).count() != 1 {
                return Err(StructuralViolation::NodeNotFound(node.id));
            }
        }

        // Every listed child must exist and point back at its parent
        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut stack: Vec<(NodeId, Parent)> = self.roots.iter().map(|id| (*id, Parent::Root)).collect();
        while let Some((id, expected)) = stack.pop() {
            let node = self.get(id).ok_or(StructuralViolation::NodeNotFound(id))?;
            if node.parent != expected {
                return Err(StructuralViolation::ParentNotFound(id));
            }
            if !seen.insert(id) {
                let parent = expected.node().unwrap_or(id);
                return Err(StructuralViolation::CycleDetected { node: id, parent });
            }
            stack.extend(node.children.iter().map(|c| (*c, Parent::Node(id))));
        }

        // Anything not reachable from the roots hangs off a cycle
        if let Some(stray) = self.nodes.keys().find(|id| !seen.contains(id)) {
            let parent = self.parent_of(*stray).and_then(|p| p.node()).unwrap_or(*stray);
            return Err(StructuralViolation::CycleDetected { node: *stray, parent });
        }
        Ok(())
    }

    fn check_container(&self, parent: Parent) -> StructuralResult<()> {
        let Parent::Node(pid) = parent else {
            return Ok(());
        };
        let node = self.get(pid).ok_or(StructuralViolation::ParentNotFound(pid))?;
        if node.kind.can_have_children() {
            Ok(())
        } else {
            Err(StructuralViolation::CannotHaveChildren {
                node: pid,
                kind: node.kind.name(),
            })
        }
    }

    fn children_mut(&mut self, parent: Parent) -> StructuralResult<&mut Vec<NodeId>> {
        match parent {
            Parent::Root => Ok(&mut self.roots),
            Parent::Node(pid) => {
                let slot = self.nodes.get_mut(&pid).ok_or(StructuralViolation::ParentNotFound(pid))?;
                Ok(&mut Arc::make_mut(slot).children)
            }
        }
    }

    fn attach(&mut self, id: NodeId, parent: Parent, index: Option<usize>) -> StructuralResult<usize> {
        let children = self.children_mut(parent)?;
        let at = index.unwrap_or(children.len()).min(children.len());
        children.insert(at, id);
        Ok(at)
    }

    fn detach(&mut self, id: NodeId, parent: Parent) -> StructuralResult<usize> {
        let children = self.children_mut(parent)?;
        let at = children
            .iter()
            .position(|c| *c == id)
            .ok_or(StructuralViolation::NodeNotFound(id))?;
        children.remove(at);
        Ok(at)
    }
}

/// Serialized form: nodes sorted by id so output is stable
#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GraphRepr {
    roots: Vec<NodeId>,
    nodes: Vec<Node>,
}

impl From<SceneGraph> for GraphRepr {
    fn from(graph: SceneGraph) -> Self {
        let mut nodes: Vec<Node> = graph
            .nodes
            .into_values()
            .map(|n| Arc::try_unwrap(n).unwrap_or_else(|shared| (*shared).clone()))
            .collect();
        nodes.sort_by_key(|n| n.id);
        GraphRepr {
            roots: graph.roots,
            nodes,
        }
    }
}

impl TryFrom<GraphRepr> for SceneGraph {
    type Error = StructuralViolation;

    fn try_from(repr: GraphRepr) -> Result<Self, Self::Error> {
        let mut nodes = HashMap::with_capacity(repr.nodes.len());
        for node in repr.nodes {
            let id = node.id;
            if nodes.insert(id, Arc::new(node)).is_some() {
                return Err(StructuralViolation::DuplicateId(id));
            }
        }
        let graph = SceneGraph {
            nodes,
            roots: repr.roots,
        };
        graph.check_integrity()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::NodeKind;

    fn frame(id: u64) -> Node {
        Node::new(NodeId(id), NodeKind::container(100.0, 100.0))
    }

    fn rect(id: u64) -> Node {
        Node::new(NodeId(id), NodeKind::rectangle(10.0, 10.0))
    }

    /// A(1) → [B(2) → [D(4)], C(3)]
    fn sample() -> SceneGraph {
        let mut g = SceneGraph::new();
        g.insert(Parent::Root, frame(1), None).unwrap();
        g.insert(Parent::Node(NodeId(1)), frame(2), None).unwrap();
        g.insert(Parent::Node(NodeId(1)), rect(3), None).unwrap();
        g.insert(Parent::Node(NodeId(2)), rect(4), None).unwrap();
        g
    }

    #[test]
    fn test_insert_sets_structure() {
        let g = sample();

        assert_eq!(g.len(), 4);
        assert_eq!(g.roots(), &[NodeId(1)]);
        assert_eq!(g.children_of(Parent::Node(NodeId(1))).unwrap(), &[NodeId(2), NodeId(3)]);
        assert_eq!(g.parent_of(NodeId(4)), Some(Parent::Node(NodeId(2))));
        g.check_integrity().unwrap();
    }

    #[test]
    fn test_insert_rejects_duplicate_and_bad_parent() {
        let mut g = sample();
        let before = g.clone();

        assert_eq!(
            g.insert(Parent::Root, rect(3), None),
            Err(StructuralViolation::DuplicateId(NodeId(3)))
        );
        assert_eq!(
            g.insert(Parent::Node(NodeId(99)), rect(5), None),
            Err(StructuralViolation::ParentNotFound(NodeId(99)))
        );
        assert!(matches!(
            g.insert(Parent::Node(NodeId(3)), rect(5), None),
            Err(StructuralViolation::CannotHaveChildren { .. })
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_insert_clamps_index() {
        let mut g = sample();
        g.insert(Parent::Node(NodeId(1)), rect(5), Some(0)).unwrap();
        g.insert(Parent::Node(NodeId(1)), rect(6), Some(99)).unwrap();

        assert_eq!(
            g.children_of(Parent::Node(NodeId(1))).unwrap(),
            &[NodeId(5), NodeId(2), NodeId(3), NodeId(6)]
        );
    }

    #[test]
    fn test_move_rejects_cycles() {
        let mut g = sample();
        let before = g.clone();

        assert_eq!(
            g.move_node(NodeId(1), Parent::Node(NodeId(2)), None),
            Err(StructuralViolation::CycleDetected {
                node: NodeId(1),
                parent: NodeId(2)
            })
        );
        assert!(matches!(
            g.move_node(NodeId(2), Parent::Node(NodeId(2)), None),
            Err(StructuralViolation::CycleDetected { .. })
        ));
        assert_eq!(g, before);
    }

    #[test]
    fn test_move_index_is_after_detach() {
        let mut g = sample();
        g.insert(Parent::Node(NodeId(1)), rect(5), None).unwrap();
        // children of 1: [2, 3, 5]; moving 2 to index 1 lands between 3 and 5
        g.move_node(NodeId(2), Parent::Node(NodeId(1)), Some(1)).unwrap();

        assert_eq!(
            g.children_of(Parent::Node(NodeId(1))).unwrap(),
            &[NodeId(3), NodeId(2), NodeId(5)]
        );
        g.check_integrity().unwrap();
    }

    #[test]
    fn test_move_to_root() {
        let mut g = sample();
        g.move_node(NodeId(4), Parent::Root, Some(0)).unwrap();

        assert_eq!(g.roots(), &[NodeId(4), NodeId(1)]);
        assert_eq!(g.parent_of(NodeId(4)), Some(Parent::Root));
        assert!(g.children_of(Parent::Node(NodeId(2))).unwrap().is_empty());
    }

    #[test]
    fn test_update_keeps_kind() {
        let mut g = sample();

        let updated = g
            .update(
                NodeId(3),
                NodePatch {
                    name: Some("button".into()),
                    kind: Some(NodeKind::rectangle(40.0, 20.0)),
                    ..NodePatch::default()
                },
            )
            .unwrap();
        assert_eq!(updated.name, "button");

        let err = g
            .update(
                NodeId(3),
                NodePatch {
                    kind: Some(NodeKind::ellipse(1.0, 1.0)),
                    ..NodePatch::default()
                },
            )
            .unwrap_err();
        assert_eq!(
            err,
            StructuralViolation::KindMismatch {
                node: NodeId(3),
                expected: "rectangle",
                found: "ellipse"
            }
        );
    }

    #[test]
    fn test_remove_and_restore_round_trip() {
        let mut g = sample();
        let before = g.clone();

        let removed = g.remove(NodeId(2)).unwrap();
        assert_eq!(removed.parent, Parent::Node(NodeId(1)));
        assert_eq!(removed.index, 0);
        assert_eq!(removed.ids().collect::<Vec<_>>(), vec![NodeId(2), NodeId(4)]);
        assert!(!g.contains(NodeId(4)));
        g.check_integrity().unwrap();

        g.restore(removed).unwrap();
        assert_eq!(g, before);
    }

    #[test]
    fn test_insert_tree_assigns_fresh_ids() {
        let mut g = sample();
        let mut ids = IdSource::new();
        ids.reserve_node(NodeId(4));

        let tree = NodeTree::new(NodeKind::container(10.0, 10.0))
            .with_child(NodeTree::new(NodeKind::rectangle(1.0, 1.0)))
            .with_child(NodeTree::new(NodeKind::ellipse(1.0, 1.0)));
        let created = g.insert_tree(Parent::Node(NodeId(1)), &tree, Some(0), &mut ids).unwrap();

        assert_eq!(created, vec![NodeId(5), NodeId(6), NodeId(7)]);
        assert_eq!(g.index_in_parent(NodeId(5)), Some(0));
        assert_eq!(g.children_of(Parent::Node(NodeId(5))).unwrap(), &[NodeId(6), NodeId(7)]);
        g.check_integrity().unwrap();
    }

    #[test]
    fn test_insert_tree_rejects_leaf_with_children() {
        let mut g = sample();
        let before = g.clone();
        let mut ids = IdSource::new();
        ids.reserve_node(NodeId(4));

        let tree = NodeTree::new(NodeKind::rectangle(1.0, 1.0))
            .with_child(NodeTree::new(NodeKind::rectangle(1.0, 1.0)));

        assert!(g.insert_tree(Parent::Root, &tree, None, &mut ids).is_err());
        assert_eq!(g, before);
    }

    #[test]
    fn test_clone_shares_untouched_nodes() {
        let g = sample();
        let mut edited = g.clone();
        edited
            .update(
                NodeId(3),
                NodePatch {
                    locked: Some(true),
                    ..NodePatch::default()
                },
            )
            .unwrap();

        let shared = |id| Arc::ptr_eq(g.get_shared(id).unwrap(), edited.get_shared(id).unwrap());
        assert!(shared(NodeId(4)));
        assert!(!shared(NodeId(3)));
    }

    #[test]
    fn test_queries() {
        let g = sample();
        assert_eq!(g.ancestors(NodeId(4)), vec![NodeId(2), NodeId(1)]);
        assert!(g.is_ancestor(NodeId(1), NodeId(4)));
        assert!(!g.is_ancestor(NodeId(4), NodeId(1)));
        assert_eq!(g.descendants(NodeId(1)), vec![NodeId(2), NodeId(4), NodeId(3)]);
        assert_eq!(g.index_in_parent(NodeId(3)), Some(1));
    }

    #[test]
    fn test_serde_validates_structure() {
        let g = sample();
        let json = serde_json::to_string(&g).unwrap();
        let back: SceneGraph = serde_json::from_str(&json).unwrap();
        assert_eq!(back, g);

        // A node listed both as a root and as a child is rejected on load
        let mut value: serde_json::Value = serde_json::from_str(&json).unwrap();
        value["roots"] = serde_json::json!([1, 4]);
        assert!(serde_json::from_value::<SceneGraph>(value).is_err());
    }
}
