//! Error types for the editor

use crate::templates::TemplateError;
use thiserror::Error;
use vellum_core::{NodeId, StructuralViolation};

#[derive(Error, Debug)]
pub enum EditorError {
    #[error("Structural violation: {0}")]
    Structural(#[from] StructuralViolation),

    #[error("Unknown template: {0}")]
    UnknownTemplate(String),

    #[error("Template `{tag}` failed: {source}")]
    TemplateError {
        tag: String,
        #[source]
        source: TemplateError,
    },

    #[error("Document has no active page")]
    NoActivePage,

    #[error("Transaction `{0}` is already open")]
    TransactionOpen(String),

    #[error("Node {0} has no vector outline")]
    NotAVector(NodeId),
}
