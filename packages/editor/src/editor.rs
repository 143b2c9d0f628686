//! # Editor
//!
//! Owns the undo history and is the only path from an [`Action`] to a new
//! document state:
//!
//! ```text
//! dispatch(action)
//!   → copy present state (page handles only)
//!   → action.apply(copy)        error: copy dropped, nothing changes
//!   → post-effects(copy)
//!   → history.commit(copy)
//! ```

use crate::actions::ActionContext;
use crate::{Action, ActionOutcome, EditorConfig, EditorError, History, HistoryStep, PostEffectEngine, TemplateRegistry};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::instrument;
use vellum_core::{Document, IdSource};

/// One snapshot in the history
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorState {
    pub document: Document,
    /// Number of actions applied to reach this state
    pub revision: u64,
}

#[derive(Debug)]
pub struct Editor {
    history: History<EditorState>,
    templates: Arc<TemplateRegistry>,
    effects: PostEffectEngine,
    config: EditorConfig,
    last_outcome: ActionOutcome,
    /// Highest ids handed out so far; undo does not roll this back
    issued: IdSource,
}

impl Editor {
    pub fn new(document: Document, templates: Arc<TemplateRegistry>, config: EditorConfig) -> Self {
        let issued = document.ids().clone();
        let state = EditorState { document, revision: 0 };
        Self {
            history: History::with_max_entries(state, config.history_limit),
            templates,
            effects: PostEffectEngine::new(),
            config,
            last_outcome: ActionOutcome::default(),
            issued,
        }
    }

    /// Editor over `document` backed by the process-wide template registry
    pub fn with_document(document: Document) -> Self {
        Self::new(document, TemplateRegistry::shared(), EditorConfig::default())
    }

    pub fn with_effects(mut self, effects: PostEffectEngine) -> Self {
        self.effects = effects;
        self
    }

    /// Apply `action` and record it as one undo step
    #[instrument(skip_all, fields(action = action.action_type()))]
    pub fn dispatch(&mut self, action: Action) -> Result<&EditorState, EditorError> {
        let action_type = action.action_type();
        let mut next = self.history.present().clone();
        next.document.reserve_ids(&self.issued);
        let cx = ActionContext {
            templates: &self.templates,
            vector_epsilon: self.config.vector_epsilon,
        };

        let outcome = action.apply(&mut next.document, cx).map_err(|err| {
            tracing::debug!(error = %err, "action rejected");
            err
        })?;
        self.effects.run(&action, &outcome, &mut next.document);
        // A loaded document brings its own counters
        next.document.reserve_ids(&self.issued);
        self.issued = next.document.ids().clone();

        next.revision += 1;
        tracing::debug!(revision = next.revision, created = outcome.created.len(), "action applied");
        self.history.commit(action_type, next);
        self.last_outcome = outcome;
        Ok(self.history.present())
    }

    pub fn undo(&mut self) -> HistoryStep {
        let step = self.history.undo();
        tracing::debug!(?step, "undo");
        step
    }

    pub fn redo(&mut self) -> HistoryStep {
        let step = self.history.redo();
        tracing::debug!(?step, "redo");
        step
    }

    pub fn begin_transaction(&mut self, label: impl Into<String>) -> Result<(), EditorError> {
        self.history.begin_transaction(label)
    }

    pub fn end_transaction(&mut self) -> bool {
        self.history.end_transaction()
    }

    pub fn cancel_transaction(&mut self) -> bool {
        self.history.cancel_transaction()
    }

    pub fn state(&self) -> &EditorState {
        self.history.present()
    }

    pub fn document(&self) -> &Document {
        &self.history.present().document
    }

    pub fn history(&self) -> &History<EditorState> {
        &self.history
    }

    pub fn templates(&self) -> &Arc<TemplateRegistry> {
        &self.templates
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    /// What the most recent successful dispatch touched
    pub fn last_outcome(&self) -> &ActionOutcome {
        &self.last_outcome
    }
}
