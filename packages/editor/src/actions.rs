//! # Actions
//!
//! Every document change goes through an [`Action`]. Actions are plain data:
//! they serialize as `{ "type": ..., "payload": ... }` so a UI or a script can
//! drive the editor over any channel.
//!
//! ## Semantics
//!
//! - Actions are applied to a scratch copy of the document; on error the copy
//!   is dropped, so a failed action changes nothing
//! - Node actions locate the page holding the node; insert actions default to
//!   the active page
//! - `move_node` rejects cycles and non-container parents
//! - `remove_node` removes the whole subtree
//! - `boolean_operation` replaces both operands with one vector node at the
//!   first operand's position

use crate::{EditorError, TemplateRegistry};
use kurbo::{Affine, BezPath, Ellipse, Point, Rect, RoundedRect, Shape};
use serde::{Deserialize, Serialize};
use vellum_core::{
    Document, Node, NodeId, NodeKind, NodePatch, NodeTree, PageId, Parent, SceneGraph, StructuralViolation,
    VectorGeometry,
};
use vellum_vn::{BooleanOp, VectorNetwork};

/// Flattening tolerance for curved primitives fed to boolean operations
const OUTLINE_TOLERANCE: f64 = 0.1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum Action {
    /// Insert a detached tree; ids are assigned on insert
    InsertNode {
        #[serde(default)]
        page: Option<PageId>,
        #[serde(default)]
        parent: Parent,
        tree: NodeTree,
        #[serde(default)]
        index: Option<usize>,
    },

    /// Build a registered template and insert the result
    InsertTemplate {
        #[serde(default)]
        page: Option<PageId>,
        #[serde(default)]
        parent: Parent,
        tag: String,
        #[serde(default)]
        props: serde_json::Value,
        #[serde(default)]
        index: Option<usize>,
    },

    MoveNode {
        node: NodeId,
        parent: Parent,
        #[serde(default)]
        index: Option<usize>,
    },

    UpdateNode {
        node: NodeId,
        patch: NodePatch,
    },

    RemoveNode {
        node: NodeId,
    },

    /// Combine two shapes into one vector node
    BooleanOperation {
        op: BooleanOp,
        target: NodeId,
        operand: NodeId,
    },

    Select {
        nodes: Vec<NodeId>,
    },

    AddPage {
        name: String,
    },

    RemovePage {
        page: PageId,
    },

    RenamePage {
        page: PageId,
        name: String,
    },

    /// Place `page` right after `after`, or first
    ReorderPage {
        page: PageId,
        #[serde(default)]
        after: Option<PageId>,
    },

    SetActivePage {
        page: PageId,
    },

    /// Replace the whole document
    LoadDocument {
        document: Document,
    },

    /// Append the pages of another document, typically an importer's output
    ImportPages {
        document: Document,
    },
}

/// What an action touched, for post-effects and callers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ActionOutcome {
    /// New node ids, pre-order, root first
    pub created: Vec<NodeId>,
    /// Roots of removed subtrees
    pub removed: Vec<NodeId>,
    /// Pages added by the action
    pub pages: Vec<PageId>,
}

impl ActionOutcome {
    fn created(created: Vec<NodeId>) -> Self {
        Self {
            created,
            ..Self::default()
        }
    }
}

/// Services an action may need while applying
#[derive(Debug, Clone, Copy)]
pub struct ActionContext<'a> {
    pub templates: &'a TemplateRegistry,
    pub vector_epsilon: f64,
}

impl Action {
    /// Wire name, also used as the undo label
    pub fn action_type(&self) -> &'static str {
        match self {
            Action::InsertNode { .. } => "insert_node",
            Action::InsertTemplate { .. } => "insert_template",
            Action::MoveNode { .. } => "move_node",
            Action::UpdateNode { .. } => "update_node",
            Action::RemoveNode { .. } => "remove_node",
            Action::BooleanOperation { .. } => "boolean_operation",
            Action::Select { .. } => "select",
            Action::AddPage { .. } => "add_page",
            Action::RemovePage { .. } => "remove_page",
            Action::RenamePage { .. } => "rename_page",
            Action::ReorderPage { .. } => "reorder_page",
            Action::SetActivePage { .. } => "set_active_page",
            Action::LoadDocument { .. } => "load_document",
            Action::ImportPages { .. } => "import_pages",
        }
    }

    /// Apply to `doc` in place. Callers wanting atomicity apply to a copy.
    pub fn apply(&self, doc: &mut Document, cx: ActionContext<'_>) -> Result<ActionOutcome, EditorError> {
        match self {
            Action::InsertNode {
                page,
                parent,
                tree,
                index,
            } => {
                let page = target_page(doc, *page)?;
                let created = doc.insert_tree(page, *parent, tree, *index)?;
                Ok(ActionOutcome::created(created))
            }

            Action::InsertTemplate {
                page,
                parent,
                tag,
                props,
                index,
            } => {
                let page = target_page(doc, *page)?;
                let tree = cx.templates.instantiate(tag, props)?;
                let created = doc.insert_tree(page, *parent, &tree, *index)?;
                tracing::debug!(tag = %tag, root = ?created.first(), "instantiated template");
                Ok(ActionOutcome::created(created))
            }

            Action::MoveNode { node, parent, index } => {
                let page = page_of(doc, *node)?;
                doc.move_node(page, *node, *parent, *index)?;
                Ok(ActionOutcome::default())
            }

            Action::UpdateNode { node, patch } => {
                let page = page_of(doc, *node)?;
                doc.update_node(page, *node, patch.clone())?;
                Ok(ActionOutcome::default())
            }

            Action::RemoveNode { node } => {
                let page = page_of(doc, *node)?;
                doc.remove_node(page, *node)?;
                Ok(ActionOutcome {
                    removed: vec![*node],
                    ..ActionOutcome::default()
                })
            }

            Action::BooleanOperation { op, target, operand } => {
                apply_boolean(doc, *op, *target, *operand, cx.vector_epsilon)
            }

            Action::Select { nodes } => {
                doc.set_selection(nodes.iter().copied())?;
                Ok(ActionOutcome::default())
            }

            Action::AddPage { name } => {
                let page = doc.add_page(name.clone());
                Ok(ActionOutcome {
                    pages: vec![page],
                    ..ActionOutcome::default()
                })
            }

            Action::RemovePage { page } => {
                doc.remove_page(*page)?;
                Ok(ActionOutcome::default())
            }

            Action::RenamePage { page, name } => {
                doc.rename_page(*page, name.clone())?;
                Ok(ActionOutcome::default())
            }

            Action::ReorderPage { page, after } => {
                doc.reorder_page(*page, *after)?;
                Ok(ActionOutcome::default())
            }

            Action::SetActivePage { page } => {
                doc.set_active_page(*page)?;
                Ok(ActionOutcome::default())
            }

            // Documents share pages through `Arc`, so these clones are shallow
            Action::LoadDocument { document } => {
                *doc = document.clone();
                Ok(ActionOutcome::default())
            }

            Action::ImportPages { document } => {
                let pages = doc.absorb(document.clone())?;
                Ok(ActionOutcome {
                    pages,
                    ..ActionOutcome::default()
                })
            }
        }
    }
}

fn target_page(doc: &Document, page: Option<PageId>) -> Result<PageId, EditorError> {
    page.or_else(|| doc.active_page_id()).ok_or(EditorError::NoActivePage)
}

fn page_of(doc: &Document, node: NodeId) -> Result<PageId, EditorError> {
    doc.find_node(node)
        .map(|(page, _)| page)
        .ok_or_else(|| StructuralViolation::NodeNotFound(node).into())
}

/// Node-to-page transform
fn world_transform(graph: &SceneGraph, id: NodeId) -> Affine {
    let mut transform = Affine::IDENTITY;
    let mut current = graph.get(id);
    while let Some(node) = current {
        transform = node.transform * transform;
        current = node.parent.node().and_then(|p| graph.get(p));
    }
    transform
}

fn parent_transform(graph: &SceneGraph, node: &Node) -> Affine {
    match node.parent {
        Parent::Root => Affine::IDENTITY,
        Parent::Node(parent) => world_transform(graph, parent),
    }
}

/// Outline of a shape node in its local space
fn outline(node: &Node) -> Option<BezPath> {
    match &node.kind {
        NodeKind::Rectangle { size, corner_radius } => {
            let rect = Rect::from_origin_size(Point::ZERO, *size);
            if *corner_radius > 0.0 {
                Some(RoundedRect::from_rect(rect, *corner_radius).to_path(OUTLINE_TOLERANCE))
            } else {
                Some(rect.to_path(OUTLINE_TOLERANCE))
            }
        }
        NodeKind::Ellipse { size } => {
            let rect = Rect::from_origin_size(Point::ZERO, *size);
            Some(Ellipse::from_rect(rect).to_path(OUTLINE_TOLERANCE))
        }
        NodeKind::Vector { geometry } => geometry.to_bez_path(),
        _ => None,
    }
}

fn apply_boolean(
    doc: &mut Document,
    op: BooleanOp,
    target: NodeId,
    operand: NodeId,
    epsilon: f64,
) -> Result<ActionOutcome, EditorError> {
    let page = page_of(doc, target)?;
    if page_of(doc, operand)? != page {
        return Err(StructuralViolation::NodeNotFound(operand).into());
    }

    let graph = &doc.page(page).ok_or(StructuralViolation::PageNotFound(page))?.graph;
    let node = graph.get(target).ok_or(StructuralViolation::NodeNotFound(target))?;
    let other = graph.get(operand).ok_or(StructuralViolation::NodeNotFound(operand))?;

    // Both operands are expressed in the target's parent space
    let space = parent_transform(graph, node).inverse();
    let network_of = |n: &Node| -> Result<VectorNetwork, EditorError> {
        let mut path = outline(n).ok_or(EditorError::NotAVector(n.id))?;
        path.apply_affine(space * world_transform(graph, n.id));
        Ok(VectorNetwork::from_bez_path(&path))
    };
    let a = network_of(node)?;
    let b = network_of(other)?;
    let combined = vellum_vn::boolean(&a, &b, op, epsilon);

    let parent = node.parent;
    let name = node.name.clone();
    let style = node.style.clone();
    let mut index = graph.index_in_parent(target);
    if operand != target && other.parent == parent {
        if let (Some(at), Some(other_at)) = (index, graph.index_in_parent(operand)) {
            if other_at < at {
                index = Some(at - 1);
            }
        }
    }

    doc.remove_node(page, target)?;
    if operand != target {
        doc.remove_node(page, operand)?;
    }

    let result = doc
        .new_node(NodeKind::Vector {
            geometry: VectorGeometry::Network { network: combined },
        })
        .with_name(name)
        .with_style(style);
    let created = doc.insert_node(page, parent, result, index)?;

    tracing::debug!(?op, %target, %operand, result = %created, "boolean operation");
    Ok(ActionOutcome {
        created: vec![created],
        removed: vec![target, operand],
        pages: Vec::new(),
    })
}
