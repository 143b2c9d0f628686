//! Non-fatal import findings

use serde::{Deserialize, Serialize};
use std::fmt;
use vellum_core::Document;

/// Something in the source that could not be mapped faithfully
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    /// Source-side reference: a Figma node id, or `#<n>` for the n-th PDF operation
    pub node_ref: Option<String>,
    pub reason: String,
}

impl Diagnostic {
    pub fn new(node_ref: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            node_ref,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.node_ref {
            Some(node) => write!(f, "{}: {}", node, self.reason),
            None => write!(f, "{}", self.reason),
        }
    }
}

/// Collects diagnostics, logging each one as it arrives
#[derive(Debug, Default)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, node_ref: Option<&str>, reason: impl Into<String>) {
        let diagnostic = Diagnostic::new(node_ref.map(str::to_string), reason);
        tracing::warn!(node = ?diagnostic.node_ref, reason = %diagnostic.reason, "import diagnostic");
        self.items.push(diagnostic);
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

/// A best-effort document plus everything that did not map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportOutput {
    pub document: Document,
    pub diagnostics: Vec<Diagnostic>,
}

impl ImportOutput {
    /// Whether anything was approximated or left out
    pub fn is_partial(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
