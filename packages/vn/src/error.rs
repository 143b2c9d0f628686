use crate::{EdgeId, VertexId};
use thiserror::Error;

pub type VnResult<T> = Result<T, VnError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum VnError {
    #[error("Vertex not found: {0}")]
    VertexNotFound(VertexId),

    #[error("Edge not found: {0}")]
    EdgeNotFound(EdgeId),

    #[error("Edge {edge} points at missing vertex {vertex}")]
    DanglingEdge { edge: EdgeId, vertex: VertexId },

    #[error("Straight edge from {0} to itself")]
    DegenerateEdge(VertexId),

    #[error("Cannot split edge {edge} at t={t}: t must be inside (0, 1)")]
    InvalidSplit { edge: EdgeId, t: f64 },
}
