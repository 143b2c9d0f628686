//! # Nodes
//!
//! The atomic unit of a page. Structure (parent, children) is stored as id
//! references; the [`SceneGraph`](crate::SceneGraph) owns every node and keeps
//! those references consistent.

use crate::{FontRef, NodeId, Style, TextRun};
use kurbo::{Affine, BezPath, Size};
use serde::{Deserialize, Serialize};
use vellum_vn::VectorNetwork;

/// Where a node hangs: directly under the page, or under another node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Parent {
    #[default]
    Root,
    Node(NodeId),
}

impl Parent {
    pub fn node(&self) -> Option<NodeId> {
        match self {
            Parent::Root => None,
            Parent::Node(id) => Some(*id),
        }
    }
}

/// Geometry of a vector node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "camelCase")]
pub enum VectorGeometry {
    Path { path: BezPath },
    Network { network: VectorNetwork },
    /// Raw SVG markup kept as-is
    Svg { markup: String },
}

impl VectorGeometry {
    /// Path outline, when the geometry has one
    pub fn to_bez_path(&self) -> Option<BezPath> {
        match self {
            VectorGeometry::Path { path } => Some(path.clone()),
            VectorGeometry::Network { network } => Some(network.to_bez_path()),
            VectorGeometry::Svg { markup } => BezPath::from_svg(markup).ok(),
        }
    }

    /// Editable network view of the geometry
    pub fn to_network(&self) -> Option<VectorNetwork> {
        match self {
            VectorGeometry::Network { network } => Some(network.clone()),
            other => other.to_bez_path().map(|p| VectorNetwork::from_bez_path(&p)),
        }
    }
}

/// Type-specific payload. The variant is fixed for a node's lifetime.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum NodeKind {
    #[serde(rename_all = "camelCase")]
    Rectangle {
        size: Size,
        #[serde(default)]
        corner_radius: f64,
    },
    Ellipse {
        size: Size,
    },
    Line {
        length: f64,
    },
    Text {
        runs: Vec<TextRun>,
        /// Fixed layout width; `None` grows with content
        #[serde(default, skip_serializing_if = "Option::is_none")]
        width: Option<f64>,
    },
    RichText {
        markup: String,
    },
    Vector {
        geometry: VectorGeometry,
    },
    Container {
        size: Size,
        #[serde(default)]
        clip: bool,
    },
    Image {
        src: String,
        size: Size,
    },
    Instance {
        template: String,
        #[serde(default)]
        props: serde_json::Value,
    },
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::Rectangle { .. } => "rectangle",
            NodeKind::Ellipse { .. } => "ellipse",
            NodeKind::Line { .. } => "line",
            NodeKind::Text { .. } => "text",
            NodeKind::RichText { .. } => "richtext",
            NodeKind::Vector { .. } => "vector",
            NodeKind::Container { .. } => "container",
            NodeKind::Image { .. } => "image",
            NodeKind::Instance { .. } => "instance",
        }
    }

    /// Only frames and component instances own children
    pub fn can_have_children(&self) -> bool {
        matches!(self, NodeKind::Container { .. } | NodeKind::Instance { .. })
    }

    pub fn same_variant(&self, other: &NodeKind) -> bool {
        std::mem::discriminant(self) == std::mem::discriminant(other)
    }

    pub fn rectangle(width: f64, height: f64) -> Self {
        NodeKind::Rectangle {
            size: Size::new(width, height),
            corner_radius: 0.0,
        }
    }

    pub fn ellipse(width: f64, height: f64) -> Self {
        NodeKind::Ellipse {
            size: Size::new(width, height),
        }
    }

    pub fn container(width: f64, height: f64) -> Self {
        NodeKind::Container {
            size: Size::new(width, height),
            clip: false,
        }
    }

    pub fn text(text: impl Into<String>, font: FontRef) -> Self {
        NodeKind::Text {
            runs: vec![TextRun::new(text, font)],
            width: None,
        }
    }

    pub fn path(path: BezPath) -> Self {
        NodeKind::Vector {
            geometry: VectorGeometry::Path { path },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: NodeId,
    pub name: String,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default)]
    pub parent: Parent,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeId>,
    /// Relative to the parent's coordinate space
    #[serde(default = "identity")]
    pub transform: Affine,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default)]
    pub locked: bool,
    /// Id of the external node an importer mapped this node from
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
}

fn identity() -> Affine {
    Affine::IDENTITY
}

fn yes() -> bool {
    true
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            name: kind.name().to_string(),
            kind,
            parent: Parent::Root,
            children: Vec::new(),
            transform: Affine::IDENTITY,
            style: Style::default(),
            active: true,
            locked: false,
            origin: None,
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }
}

/// A detached subtree waiting for ids, produced by templates and importers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeTree {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
    #[serde(default = "identity")]
    pub transform: Affine,
    #[serde(default)]
    pub style: Style,
    #[serde(default = "yes")]
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<NodeTree>,
}

impl NodeTree {
    pub fn new(kind: NodeKind) -> Self {
        Self {
            name: None,
            kind,
            transform: Affine::IDENTITY,
            style: Style::default(),
            active: true,
            origin: None,
            children: Vec::new(),
        }
    }

    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    pub fn with_transform(mut self, transform: Affine) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_child(mut self, child: NodeTree) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in the subtree, this one included
    pub fn node_count(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            count += 1;
            stack.extend(tree.children.iter());
        }
        count
    }

    /// Materialize this tree level as a node with the given id. Children and
    /// parent are left for the graph to fill in.
    pub fn to_node(&self, id: NodeId) -> Node {
        let mut node = Node::new(id, self.kind.clone())
            .with_transform(self.transform)
            .with_style(self.style.clone());
        if let Some(name) = &self.name {
            node.name = name.clone();
        }
        node.active = self.active;
        node.origin = self.origin.clone();
        node
    }
}

/// Partial update for [`SceneGraph::update`](crate::SceneGraph::update).
/// A `kind` patch must keep the node's variant.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodePatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<NodeKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<Affine>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style: Option<Style>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl NodePatch {
    pub fn is_empty(&self) -> bool {
        self == &NodePatch::default()
    }

    pub(crate) fn apply_to(self, node: &mut Node) {
        if let Some(name) = self.name {
            node.name = name;
        }
        if let Some(kind) = self.kind {
            node.kind = kind;
        }
        if let Some(transform) = self.transform {
            node.transform = transform;
        }
        if let Some(style) = self.style {
            node.style = style;
        }
        if let Some(active) = self.active {
            node.active = active;
        }
        if let Some(locked) = self.locked {
            node.locked = locked;
        }
    }
}
