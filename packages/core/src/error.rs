//! Error types for structural edits

use crate::{NodeId, PageId};
use thiserror::Error;

/// An edit that would break the tree invariants. The graph is left untouched
/// whenever one of these is returned.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StructuralViolation {
    #[error("Node not found: {0}")]
    NodeNotFound(NodeId),

    #[error("Parent not found: {0}")]
    ParentNotFound(NodeId),

    #[error("Page not found: {0}")]
    PageNotFound(PageId),

    #[error("Moving {node} under {parent} would create a cycle")]
    CycleDetected { node: NodeId, parent: NodeId },

    #[error("Duplicate node id: {0}")]
    DuplicateId(NodeId),

    #[error("Duplicate page id: {0}")]
    DuplicatePage(PageId),

    #[error("{kind} node {node} cannot have children")]
    CannotHaveChildren { node: NodeId, kind: &'static str },

    #[error("Cannot change {node} from {expected} to {found}")]
    KindMismatch {
        node: NodeId,
        expected: &'static str,
        found: &'static str,
    },

    #[error("Selection references {0}, which is not on the active page")]
    InvalidSelection(NodeId),
}

pub type StructuralResult<T> = Result<T, StructuralViolation>;
