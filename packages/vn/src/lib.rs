//! # Vellum Vector Network
//!
//! Graph-based vector path topology for editable vector nodes.
//!
//! ## Model
//!
//! ```text
//! vertices: VertexId → Point
//! edges:    EdgeId   → (a, b, optional cubic tangents)
//! faces:    implicit, found by walking closed edge loops
//! ```
//!
//! A network may be non-manifold while it is being edited (dangling edges,
//! vertices with many incident edges). [`VectorNetwork::resolve_paths`] turns it
//! into closed and open path descriptors for rendering, and the boolean
//! operations in [`boolean`] compose resolved paths back into a normalized
//! network.
//!
//! ## Usage
//!
//! ```rust
//! use kurbo::Point;
//! use vellum_vn::VectorNetwork;
//!
//! let mut vn = VectorNetwork::new();
//! let a = vn.add_vertex(Point::new(0.0, 0.0));
//! let b = vn.add_vertex(Point::new(10.0, 0.0));
//! let c = vn.add_vertex(Point::new(10.0, 10.0));
//! vn.add_edge(a, b, None).unwrap();
//! vn.add_edge(b, c, None).unwrap();
//! vn.add_edge(c, a, None).unwrap();
//!
//! let paths = vn.resolve_paths();
//! assert_eq!(paths.len(), 1);
//! assert!(paths[0].closed);
//! ```

pub mod boolean;
mod error;
mod network;
mod resolve;
mod shapes;

pub use boolean::{boolean, BooleanOp};
pub use error::{VnError, VnResult};
pub use network::{Curve, Edge, EdgeId, VectorNetwork, VertexId, DEFAULT_EPSILON};
pub use resolve::{PathStep, ResolvedPath};
