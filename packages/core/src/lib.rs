//! # Vellum Core
//!
//! Canonical scene model for the Vellum design engine.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ Document                                    │
//! │  - pages (Arc<Page>, ordered by sort key)   │
//! │  - active page, selection, id counters      │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ SceneGraph (one per page)                   │
//! │  - id arena of Arc<Node>                    │
//! │  - validated insert / move / update / remove│
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ Derived views                               │
//! │  - linearize: depth-annotated pre-order     │
//! │  - render_list: world transforms, opacity   │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **Ids, not pointers**: parent/child links are `NodeId`s owned by the arena
//! 2. **Validate, then apply**: a failed edit leaves the graph untouched
//! 3. **Cheap snapshots**: cloning a document shares every untouched page and node
//!
//! ## Usage
//!
//! ```rust
//! use vellum_core::{linearize, Document, NodeKind, Parent};
//!
//! let mut doc = Document::with_page("Home");
//! let page = doc.active_page_id().unwrap();
//!
//! let frame = doc.new_node(NodeKind::container(320.0, 200.0));
//! let frame_id = doc.insert_node(page, Parent::Root, frame, None)?;
//! let button = doc.new_node(NodeKind::rectangle(80.0, 32.0));
//! doc.insert_node(page, Parent::Node(frame_id), button, None)?;
//!
//! let rows = linearize(&doc.page(page).unwrap().graph, Parent::Root);
//! assert_eq!(rows.len(), 2);
//! assert_eq!(rows[1].depth, 1);
//! # Ok::<(), vellum_core::StructuralViolation>(())
//! ```

mod document;
mod error;
mod graph;
mod hierarchy;
mod ids;
mod node;
mod render;
mod style;

pub use document::{Document, Page};
pub use error::{StructuralResult, StructuralViolation};
pub use graph::{RemovedSubtree, SceneGraph};
pub use hierarchy::{linearize, linearize_visible, FlatNode, Hierarchy, HierarchyRow, PageHierarchy};
pub use ids::{IdSource, NodeId, PageId};
pub use node::{Node, NodeKind, NodePatch, NodeTree, Parent, VectorGeometry};
pub use render::{render_list, RenderNode};
pub use style::{BlendMode, Color, Effect, FontRef, GradientStop, ImageFit, Paint, Style, TextRun};

// Re-export geometry types used throughout the public API
pub use kurbo;
pub use vellum_vn as vn;
