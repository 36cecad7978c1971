//! Row-level dirty tracking with a commit state machine.
//!
//! ```text
//! Clean --edit--> Dirty --begin_commit--> Pending --ok--> Clean
//!                   ^                        |
//!                   +-- err (retain) / cancel +
//! ```

use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// Edits under this prefix touch the actuals record; anything else is ignored.
pub const ACTUALS_NAMESPACE: &str = "actuals.";

/// Strips the actuals prefix, returning the bare field name.
pub fn actuals_field(field_path: &str) -> Option<&str> {
    field_path
        .strip_prefix(ACTUALS_NAMESPACE)
        .filter(|field| !field.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RowState {
    Clean,
    Dirty,
    Pending,
    /// Last commit failed and the edit is queued again.
    Failed,
}

/// What to do with a row whose update call failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Report the failure and forget the edit.
    #[default]
    Discard,
    /// Put the row back into the dirty set so the next commit retries it.
    RetainDirty,
}

/// Set of row ids with unsaved edits, in first-edit order.
#[derive(Debug, Clone, Default)]
pub struct DirtyTracker {
    order: Vec<String>,
    dirty: HashSet<String>,
    pending: HashSet<String>,
    failed: HashMap<String, String>,
}

impl DirtyTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_dirty(&mut self, id: &str) {
        if self.dirty.insert(id.to_string()) {
            self.order.push(id.to_string());
        }
    }

    /// Marks `id` dirty when `field_path` is in the actuals namespace.
    /// Returns whether the set was touched.
    pub fn record_edit(&mut self, id: &str, field_path: &str) -> bool {
        if actuals_field(field_path).is_none() {
            return false;
        }
        self.mark_dirty(id);
        true
    }

    pub fn is_dirty(&self, id: &str) -> bool {
        self.dirty.contains(id)
    }

    pub fn len(&self) -> usize {
        self.dirty.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dirty.is_empty()
    }

    pub fn ids(&self) -> &[String] {
        &self.order
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn last_error(&self, id: &str) -> Option<&str> {
        self.failed.get(id).map(String::as_str)
    }

    pub fn state(&self, id: &str) -> RowState {
        if self.pending.contains(id) {
            RowState::Pending
        } else if self.failed.contains_key(id) && self.dirty.contains(id) {
            RowState::Failed
        } else if self.dirty.contains(id) {
            RowState::Dirty
        } else {
            RowState::Clean
        }
    }

    /// Drops every dirty mark and failure note. Rows in flight stay pending.
    pub fn clear_all(&mut self) {
        self.order.clear();
        self.dirty.clear();
        self.failed.clear();
    }

    /// Keeps dirty marks only for ids accepted by `keep`.
    pub fn retain(&mut self, keep: impl Fn(&str) -> bool) {
        self.order.retain(|id| keep(id));
        self.dirty.retain(|id| keep(id));
        self.failed.retain(|id, _| keep(id));
    }

    /// Moves every dirty id to pending and returns them in edit order.
    /// The dirty set is empty afterwards.
    pub fn begin_commit(&mut self) -> Vec<String> {
        let ids = std::mem::take(&mut self.order);
        self.dirty.clear();
        self.pending.extend(ids.iter().cloned());
        ids
    }

    /// Puts ids of an abandoned batch that never settled back into the
    /// dirty set, in batch order. Returns how many were restored.
    pub fn abort_commit(&mut self, ids: &[String]) -> usize {
        let mut restored = 0;
        for id in ids {
            if self.pending.remove(id) {
                self.mark_dirty(id);
                restored += 1;
            }
        }
        restored
    }

    pub fn settle_committed(&mut self, id: &str) {
        self.pending.remove(id);
        self.failed.remove(id);
    }

    /// Resolves a failed call. Under `RetainDirty` the row re-enters the
    /// dirty set unless it was edited again meanwhile (it is dirty already).
    pub fn settle_failed(&mut self, id: &str, error: String, policy: FailurePolicy) {
        self.pending.remove(id);
        match policy {
            FailurePolicy::RetainDirty => {
                self.mark_dirty(id);
                self.failed.insert(id.to_string(), error);
            }
            FailurePolicy::Discard => {
                self.failed.remove(id);
            }
        }
    }
}
