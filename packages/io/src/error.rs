//! Error types for importers

use std::ops::Range;
use thiserror::Error;
use vellum_core::StructuralViolation;

/// Result type for import operations
pub type ImportResult<T> = Result<T, ImportError>;

/// The input could not be imported at all. Recoverable problems are
/// [`Diagnostic`](crate::Diagnostic)s instead.
#[derive(Debug, Error)]
pub enum ImportError {
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Lexer error at {span:?}: {message}")]
    Lexer { span: Range<usize>, message: String },

    #[error("Malformed input: {0}")]
    Malformed(String),

    #[error("Imported tree violates document structure: {0}")]
    Structural(#[from] StructuralViolation),
}

impl ImportError {
    pub fn span(&self) -> Option<Range<usize>> {
        match self {
            ImportError::Lexer { span, .. } => Some(span.clone()),
            _ => None,
        }
    }
}
