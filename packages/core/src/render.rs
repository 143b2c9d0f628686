//! Render bridge: the per-node view a rasterizer consumes.
//!
//! Transforms are composed down the tree into world space and opacity is
//! multiplied through ancestors. Inactive nodes are left out with their
//! subtrees.

use crate::{NodeId, NodeKind, Page, Parent, Style};
use kurbo::Affine;

#[derive(Debug, Clone, PartialEq)]
pub struct RenderNode<'a> {
    pub id: NodeId,
    pub kind: &'a NodeKind,
    pub world_transform: Affine,
    /// Node style with ancestor opacity folded into `opacity`
    pub style: Style,
    pub children: &'a [NodeId],
    pub depth: usize,
}

/// Every visible node of `page` in paint order (parents before children,
/// earlier siblings first)
pub fn render_list(page: &Page) -> Vec<RenderNode<'_>> {
    let graph = &page.graph;
    let mut out = Vec::with_capacity(graph.len());
    let mut stack: Vec<(NodeId, Affine, f64, usize)> = graph
        .roots()
        .iter()
        .rev()
        .map(|id| (*id, Affine::IDENTITY, 1.0, 0))
        .collect();

    while let Some((id, parent_transform, parent_opacity, depth)) = stack.pop() {
        let Some(node) = graph.get(id) else {
            continue;
        };
        if !node.active {
            continue;
        }

        let world = parent_transform * node.transform;
        let opacity = parent_opacity * node.style.opacity;
        let mut style = node.style.clone();
        style.opacity = opacity;

        out.push(RenderNode {
            id,
            kind: &node.kind,
            world_transform: world,
            style,
            children: graph.children_of(Parent::Node(id)).unwrap_or(&[]),
            depth,
        });
        for child in node.children.iter().rev() {
            stack.push((*child, world, opacity, depth + 1));
        }
    }

    tracing::trace!(page = %page.id, nodes = out.len(), "built render list");
    out
}
