//! # Undo/Redo History
//!
//! Snapshot history over any cloneable state.
//!
//! ## Design
//!
//! - `commit` pushes the current state onto `past` and makes the new state current
//! - `undo` moves the current state onto `future` and restores the last past entry
//! - `redo` does the reverse
//! - A new commit clears `future`
//! - `past` is bounded; the oldest entry is evicted silently
//! - Transactions collapse several commits into one undo step
//!
//! Snapshots are whole states. Cloning a [`Document`](vellum_core::Document)
//! copies page handles, not pages, so keeping a hundred of them is cheap.
//!
//! ## Example
//!
//! ```rust
//! use vellum_editor::{History, HistoryStep};
//!
//! let mut history = History::new(0);
//! history.commit("increment", 1);
//! history.commit("increment", 2);
//!
//! assert_eq!(history.undo(), HistoryStep::Undone("increment".into()));
//! assert_eq!(*history.present(), 1);
//! assert_eq!(history.redo(), HistoryStep::Redone("increment".into()));
//! assert_eq!(*history.present(), 2);
//! ```

use crate::EditorError;
use chrono::{DateTime, Utc};
use std::collections::VecDeque;

/// Default number of undo levels
pub const DEFAULT_MAX_ENTRIES: usize = 100;

/// A state snapshot together with the action that moved away from it
#[derive(Debug, Clone)]
pub struct HistoryEntry<S> {
    pub action_type: String,
    pub timestamp: DateTime<Utc>,
    pub snapshot: S,
}

impl<S> HistoryEntry<S> {
    fn new(action_type: impl Into<String>, snapshot: S) -> Self {
        Self {
            action_type: action_type.into(),
            timestamp: Utc::now(),
            snapshot,
        }
    }
}

/// Outcome of an undo or redo request. Running out of history is not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HistoryStep {
    Undone(String),
    Redone(String),
    NothingToUndo,
    NothingToRedo,
}

#[derive(Debug, Clone)]
struct Transaction<S> {
    label: String,
    base: S,
    dirty: bool,
}

#[derive(Debug, Clone)]
pub struct History<S: Clone> {
    /// Oldest first
    past: VecDeque<HistoryEntry<S>>,
    present: S,
    /// Most recently undone last
    future: Vec<HistoryEntry<S>>,
    /// Maximum number of undo levels (0 = unlimited)
    max_entries: usize,
    transaction: Option<Transaction<S>>,
}

impl<S: Clone> History<S> {
    /// Create a history with the default bound (100)
    pub fn new(initial: S) -> Self {
        Self::with_max_entries(initial, DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(initial: S, max_entries: usize) -> Self {
        Self {
            past: VecDeque::new(),
            present: initial,
            future: Vec::new(),
            max_entries,
            transaction: None,
        }
    }

    pub fn present(&self) -> &S {
        &self.present
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Make `new_state` current. Inside a transaction the step is folded into
    /// the transaction instead of getting its own undo entry.
    pub fn commit(&mut self, action_type: impl Into<String>, new_state: S) {
        let action_type = action_type.into();
        if let Some(transaction) = &mut self.transaction {
            transaction.dirty = true;
            self.present = new_state;
            tracing::trace!(action = %action_type, label = %transaction.label, "folded into transaction");
            return;
        }

        let previous = std::mem::replace(&mut self.present, new_state);
        self.push_past(HistoryEntry::new(action_type, previous));
        self.future.clear();
    }

    /// Undo the most recent step. An open transaction is closed first.
    pub fn undo(&mut self) -> HistoryStep {
        self.end_transaction();
        let Some(entry) = self.past.pop_back() else {
            return HistoryStep::NothingToUndo;
        };

        let current = std::mem::replace(&mut self.present, entry.snapshot);
        self.future.push(HistoryEntry::new(entry.action_type.clone(), current));
        HistoryStep::Undone(entry.action_type)
    }

    /// Redo the most recently undone step
    pub fn redo(&mut self) -> HistoryStep {
        self.end_transaction();
        let Some(entry) = self.future.pop() else {
            return HistoryStep::NothingToRedo;
        };

        let current = std::mem::replace(&mut self.present, entry.snapshot);
        self.push_past(HistoryEntry::new(entry.action_type.clone(), current));
        HistoryStep::Redone(entry.action_type)
    }

    /// Start grouping commits under `label`
    pub fn begin_transaction(&mut self, label: impl Into<String>) -> Result<(), EditorError> {
        if let Some(open) = &self.transaction {
            return Err(EditorError::TransactionOpen(open.label.clone()));
        }
        self.transaction = Some(Transaction {
            label: label.into(),
            base: self.present.clone(),
            dirty: false,
        });
        Ok(())
    }

    /// Close the open transaction. Returns whether an undo step was recorded;
    /// a transaction without commits leaves no trace.
    pub fn end_transaction(&mut self) -> bool {
        let Some(transaction) = self.transaction.take() else {
            return false;
        };
        if !transaction.dirty {
            return false;
        }
        self.push_past(HistoryEntry::new(transaction.label, transaction.base));
        self.future.clear();
        true
    }

    /// Drop the open transaction and restore the state captured when it began
    pub fn cancel_transaction(&mut self) -> bool {
        match self.transaction.take() {
            Some(transaction) => {
                self.present = transaction.base;
                true
            }
            None => false,
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.transaction.is_some()
    }

    fn push_past(&mut self, entry: HistoryEntry<S>) {
        self.past.push_back(entry);

        if self.max_entries > 0 && self.past.len() > self.max_entries {
            self.past.pop_front();
        }
    }

    pub fn can_undo(&self) -> bool {
        !self.past.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.future.is_empty()
    }

    pub fn undo_levels(&self) -> usize {
        self.past.len()
    }

    pub fn redo_levels(&self) -> usize {
        self.future.len()
    }

    /// Action type of the step `undo` would revert
    pub fn undo_label(&self) -> Option<&str> {
        self.past.back().map(|e| e.action_type.as_str())
    }

    /// Action type of the step `redo` would reapply
    pub fn redo_label(&self) -> Option<&str> {
        self.future.last().map(|e| e.action_type.as_str())
    }

    /// Past entries, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &HistoryEntry<S>> + '_ {
        self.past.iter()
    }

    /// Forget every past and future step, keeping the present state
    pub fn clear(&mut self) {
        self.past.clear();
        self.future.clear();
        self.transaction = None;
    }

    /// Replace the present without recording a step, dropping all history
    pub fn reset(&mut self, state: S) {
        self.clear();
        self.present = state;
    }
}

impl<S: Clone + Default> Default for History<S> {
    fn default() -> Self {
        Self::new(S::default())
    }
}
