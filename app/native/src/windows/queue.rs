//! The per-window structural action queue.
//!
//! Slot 0 is the action being processed and is never touched. A new action
//! fills slot 1, or replaces whatever is waiting there, so a burst of
//! requests collapses into the one that was made last.

use smallvec::SmallVec;

/// A structural change to what a window shows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowAction {
    SwitchTab { tab_id: String, set_in_backend: bool },
    CreateTab { pinned: bool },
    CloseTab { tab_id: String },
    SwitchWorkspace { workspace_id: String },
}

impl WindowAction {
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SwitchTab { .. } => "switchtab",
            Self::CreateTab { .. } => "createtab",
            Self::CloseTab { .. } => "closetab",
            Self::SwitchWorkspace { .. } => "switchworkspace",
        }
    }
}

#[derive(Debug, Default)]
pub struct ActionQueue {
    entries: SmallVec<[WindowAction; 2]>,
}

impl ActionQueue {
    /// Queues `action`. Returns `true` when the queue was idle and the caller
    /// must start draining it.
    pub fn push(&mut self, action: WindowAction) -> bool {
        if self.entries.len() >= 2 {
            tracing::trace!(replaced = self.entries[1].name(), by = action.name(), "window: collapsing queued action");
            self.entries[1] = action;
            return false;
        }
        let was_empty = self.entries.is_empty();
        self.entries.push(action);
        was_empty
    }

    #[must_use]
    pub fn front(&self) -> Option<&WindowAction> { self.entries.first() }

    /// Drops the finished action at slot 0.
    pub fn pop_front(&mut self) -> Option<WindowAction> {
        if self.entries.is_empty() {
            return None;
        }
        Some(self.entries.remove(0))
    }

    pub fn clear(&mut self) { self.entries.clear(); }

    #[must_use]
    pub fn len(&self) -> usize { self.entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
