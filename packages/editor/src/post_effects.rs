//! # Post-Effect System
//!
//! Actions can leave derived state stale. Post-effects run after every
//! successful action, on the same scratch document, and repair it:
//!
//! - Removing a node drops it from the selection
//! - Inserting a node selects the new root, when it lands on the active page
//!
//! Effects are deterministic and see only the action and its outcome.

use crate::actions::{Action, ActionOutcome};
use vellum_core::Document;

pub trait PostEffect: std::fmt::Debug + Send + Sync {
    fn run(&self, action: &Action, outcome: &ActionOutcome, doc: &mut Document);
}

/// Drop selected ids that no longer exist on the active page
#[derive(Debug)]
pub struct PruneSelection;

impl PostEffect for PruneSelection {
    fn run(&self, _action: &Action, _outcome: &ActionOutcome, doc: &mut Document) {
        let dropped = doc.prune_selection();
        if !dropped.is_empty() {
            tracing::debug!(count = dropped.len(), "pruned stale selection");
        }
    }
}

/// Select what insert-like actions create
#[derive(Debug)]
pub struct SelectCreated;

impl PostEffect for SelectCreated {
    fn run(&self, action: &Action, outcome: &ActionOutcome, doc: &mut Document) {
        let inserts = matches!(
            action,
            Action::InsertNode { .. } | Action::InsertTemplate { .. } | Action::BooleanOperation { .. }
        );
        let Some(root) = outcome.created.first() else {
            return;
        };
        if inserts && doc.active_page().is_some_and(|p| p.graph.contains(*root)) {
            // Root is on the active page, so this cannot fail
            let _ = doc.set_selection([*root]);
        }
    }
}

#[derive(Debug)]
pub struct PostEffectEngine {
    effects: Vec<Box<dyn PostEffect>>,
}

impl PostEffectEngine {
    /// Create engine with default effects
    pub fn new() -> Self {
        Self {
            effects: vec![Box::new(PruneSelection), Box::new(SelectCreated)],
        }
    }

    /// Engine with no effects
    pub fn empty() -> Self {
        Self { effects: Vec::new() }
    }

    pub fn with_effect(mut self, effect: impl PostEffect + 'static) -> Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn run(&self, action: &Action, outcome: &ActionOutcome, doc: &mut Document) {
        for effect in &self.effects {
            effect.run(action, outcome, doc);
        }
    }
}

impl Default for PostEffectEngine {
    fn default() -> Self {
        Self::new()
    }
}
