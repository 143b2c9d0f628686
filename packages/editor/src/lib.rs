//! # Vellum Editor
//!
//! Action dispatch, undo history and templates on top of `vellum-core`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────┐
//! │ UI / scripts / CLI: Action values (JSON)    │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ editor: dispatch → apply → effects → commit │
//! │  - Templates build detached node trees      │
//! │  - History keeps whole-document snapshots   │
//! │  - Transactions group steps for undo        │
//! └─────────────────────────────────────────────┘
//!                     ↓
//! ┌─────────────────────────────────────────────┐
//! │ core: documents, pages, scene graphs        │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! ## Core Principles
//!
//! 1. **One path for change**: only `dispatch` commits a new state
//! 2. **All or nothing**: a failed action leaves the state untouched
//! 3. **Snapshots, not inverses**: undo restores a shared-structure copy
//! 4. **Explicit registries**: the editor is handed its templates
//!
//! ## Usage
//!
//! ```rust
//! use vellum_core::{Document, NodeKind, NodeTree, Parent};
//! use vellum_editor::{Action, Editor, HistoryStep};
//!
//! let mut editor = Editor::with_document(Document::with_page("Page 1"));
//!
//! editor.dispatch(Action::InsertNode {
//!     page: None,
//!     parent: Parent::Root,
//!     tree: NodeTree::new(NodeKind::rectangle(100.0, 50.0)),
//!     index: None,
//! })?;
//! assert_eq!(editor.document().node_count(), 1);
//!
//! assert_eq!(editor.undo(), HistoryStep::Undone("insert_node".into()));
//! assert_eq!(editor.document().node_count(), 0);
//! # Ok::<(), vellum_editor::EditorError>(())
//! ```

mod actions;
mod config;
mod editor;
mod errors;
mod history;
mod post_effects;
mod templates;

pub use actions::{Action, ActionContext, ActionOutcome};
pub use config::EditorConfig;
pub use editor::{Editor, EditorState};
pub use errors::EditorError;
pub use history::{History, HistoryEntry, HistoryStep, DEFAULT_MAX_ENTRIES};
pub use post_effects::{PostEffect, PostEffectEngine, PruneSelection, SelectCreated};
pub use templates::{FnTemplate, Template, TemplateError, TemplateRegistry};

// Re-export common types for convenience
pub use vellum_core::Document;
pub use vellum_vn::BooleanOp;
