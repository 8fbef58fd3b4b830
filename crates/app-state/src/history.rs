//! Linear undo/redo history of applied commands.
//!
//! - Pushing applies the command, then either merges it into the top entry
//!   (interactive drags) or pushes a new entry and clears the redo stack.
//! - Macros group several commands into a single undo step; nothing merges
//!   across a macro boundary.
//! - A configurable maximum depth drops the oldest entries.
//!
//! # Usage
//!
//! ```
//! use splice_app_state::commands::AddTrackCommand;
//! use splice_app_state::{CommandHistory, EditSession};
//! use splice_common::TrackType;
//!
//! let mut session = EditSession::default();
//! let mut history = CommandHistory::new(50);
//!
//! history.push(&mut session, Box::new(AddTrackCommand::new(TrackType::Video)));
//! assert_eq!(session.timeline.track_count(), 1);
//!
//! assert!(history.undo(&mut session));
//! assert_eq!(session.timeline.track_count(), 0);
//! assert!(!history.undo(&mut session));
//! ```

use std::fmt;
use std::time::Instant;

use splice_common::EditConfig;

use crate::command::Command;
use crate::state::EditSession;

/// One undo step: a single command, or the commands of a macro.
pub struct HistoryEntry {
    /// Label shown in the undo history.
    pub label: String,
    commands: Vec<Box<dyn Command>>,
    grouped: bool,
    /// When this entry was created.
    pub timestamp: Instant,
}

impl HistoryEntry {
    fn single(command: Box<dyn Command>) -> Self {
        Self {
            label: command.text().to_string(),
            commands: vec![command],
            grouped: false,
            timestamp: Instant::now(),
        }
    }

    fn group(label: &str) -> Self {
        Self {
            label: label.to_string(),
            commands: Vec::new(),
            grouped: true,
            timestamp: Instant::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn is_macro(&self) -> bool {
        self.grouped
    }
}

impl fmt::Debug for HistoryEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HistoryEntry")
            .field("label", &self.label)
            .field("commands", &self.commands.len())
            .field("grouped", &self.grouped)
            .finish()
    }
}

/// Undo/redo stacks of applied commands.
pub struct CommandHistory {
    undo_stack: Vec<HistoryEntry>,
    redo_stack: Vec<HistoryEntry>,
    max_entries: usize,
    /// Entry collecting the commands of the open macro.
    open_macro: Option<HistoryEntry>,
    macro_depth: usize,
    /// Whether undo/redo is being applied right now.
    is_applying: bool,
}

impl fmt::Debug for CommandHistory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandHistory")
            .field("undo_depth", &self.undo_stack.len())
            .field("redo_depth", &self.redo_stack.len())
            .field("max_entries", &self.max_entries)
            .field("macro_depth", &self.macro_depth)
            .finish()
    }
}

impl Default for CommandHistory {
    fn default() -> Self {
        Self::with_config(&EditConfig::default())
    }
}

impl CommandHistory {
    /// Create a history keeping at most `max_entries` undo steps.
    pub fn new(max_entries: usize) -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_entries,
            open_macro: None,
            macro_depth: 0,
            is_applying: false,
        }
    }

    pub fn with_config(config: &EditConfig) -> Self {
        Self::new(config.history_limit)
    }

    /// Apply `command` and record it.
    ///
    /// Outside a macro the command is first offered to the top entry for
    /// merging when both share an [`UndoId`](crate::command::UndoId).
    pub fn push(&mut self, session: &mut EditSession, mut command: Box<dyn Command>) {
        self.is_applying = true;
        command.redo(session);
        self.is_applying = false;
        if command.is_obsolete() {
            tracing::debug!(command = command.text(), "Command had no effect, not recorded");
            return;
        }
        session.mark_dirty();
        self.redo_stack.clear();

        if let Some(group) = self.open_macro.as_mut() {
            tracing::debug!(command = command.text(), group = %group.label, "Command added to macro");
            group.commands.push(command);
            return;
        }

        if let Some(top) = self.undo_stack.last_mut() {
            if !top.grouped && top.commands.len() == 1 && command.id().is_some() {
                let last = &mut top.commands[0];
                if last.id() == command.id() && last.merge_with(command.as_ref()) {
                    tracing::debug!(command = command.text(), "Command merged into previous");
                    return;
                }
            }
        }

        tracing::debug!(
            command = command.text(),
            undo_depth = self.undo_stack.len() + 1,
            "Command pushed"
        );
        self.undo_stack.push(HistoryEntry::single(command));
        self.enforce_limit();
    }

    /// Undo the most recent entry. Returns `false` when there is nothing to undo.
    pub fn undo(&mut self, session: &mut EditSession) -> bool {
        if self.open_macro.is_some() {
            tracing::warn!("Ending stuck macro before undo");
            self.macro_depth = 1;
            self.end_macro();
        }

        let Some(mut entry) = self.undo_stack.pop() else {
            tracing::debug!("Nothing to undo");
            return false;
        };

        self.is_applying = true;
        for command in entry.commands.iter_mut().rev() {
            command.undo(session);
        }
        self.is_applying = false;
        session.mark_dirty();

        tracing::debug!(
            label = %entry.label,
            undo_depth = self.undo_stack.len(),
            redo_depth = self.redo_stack.len() + 1,
            "Undo applied"
        );
        self.redo_stack.push(entry);
        true
    }

    /// Redo the most recently undone entry. Returns `false` when there is
    /// nothing to redo.
    pub fn redo(&mut self, session: &mut EditSession) -> bool {
        if self.open_macro.is_some() {
            tracing::warn!("Ending stuck macro before redo");
            self.macro_depth = 1;
            self.end_macro();
        }

        let Some(mut entry) = self.redo_stack.pop() else {
            tracing::debug!("Nothing to redo");
            return false;
        };

        self.is_applying = true;
        for command in entry.commands.iter_mut() {
            command.redo(session);
        }
        self.is_applying = false;
        session.mark_dirty();

        tracing::debug!(
            label = %entry.label,
            undo_depth = self.undo_stack.len() + 1,
            redo_depth = self.redo_stack.len(),
            "Redo applied"
        );
        self.undo_stack.push(entry);
        true
    }

    /// Start grouping pushed commands into one undo step. Nested macros
    /// fold into the outermost one.
    pub fn begin_macro(&mut self, label: &str) {
        self.macro_depth += 1;
        if self.open_macro.is_none() {
            self.open_macro = Some(HistoryEntry::group(label));
            tracing::debug!(label, "Macro started");
        }
    }

    /// Close the current macro. The outermost close records the group as a
    /// single entry, unless it is empty.
    pub fn end_macro(&mut self) {
        if self.macro_depth == 0 {
            tracing::warn!("end_macro called without begin_macro");
            return;
        }
        self.macro_depth -= 1;
        if self.macro_depth > 0 {
            return;
        }

        let Some(group) = self.open_macro.take() else {
            return;
        };
        if group.commands.is_empty() {
            tracing::debug!(label = %group.label, "Empty macro discarded");
            return;
        }

        tracing::debug!(
            label = %group.label,
            commands = group.commands.len(),
            "Macro ended, entry pushed"
        );
        self.undo_stack.push(group);
        self.enforce_limit();
    }

    fn enforce_limit(&mut self) {
        while self.undo_stack.len() > self.max_entries {
            self.undo_stack.remove(0);
        }
    }

    pub fn is_in_macro(&self) -> bool {
        self.open_macro.is_some()
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    /// Label of the entry that would be undone next.
    pub fn undo_label(&self) -> Option<&str> {
        self.undo_stack.last().map(|e| e.label.as_str())
    }

    /// Label of the entry that would be redone next.
    pub fn redo_label(&self) -> Option<&str> {
        self.redo_stack.last().map(|e| e.label.as_str())
    }

    pub fn undo_count(&self) -> usize {
        self.undo_stack.len()
    }

    pub fn redo_count(&self) -> usize {
        self.redo_stack.len()
    }

    /// The entry that would be undone next.
    pub fn top(&self) -> Option<&HistoryEntry> {
        self.undo_stack.last()
    }

    /// Most recent command of the top entry, for inspecting merged state.
    pub fn top_command(&self) -> Option<&dyn Command> {
        self.undo_stack
            .last()
            .and_then(|e| e.commands.last())
            .map(|c| c.as_ref())
    }

    /// Whether undo/redo is being applied right now.
    pub fn is_applying(&self) -> bool {
        self.is_applying
    }

    /// Drop both stacks and any open macro.
    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.open_macro = None;
        self.macro_depth = 0;
        tracing::debug!("History cleared");
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Set the maximum depth, dropping the oldest entries if needed.
    pub fn set_max_entries(&mut self, max: usize) {
        self.max_entries = max;
        self.enforce_limit();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::UndoId;
    use std::any::Any;

    /// Adds `amount` audio tracks.
    struct Counter {
        label: &'static str,
        amount: usize,
        mergeable: bool,
    }

    impl Counter {
        fn boxed(label: &'static str, amount: usize, mergeable: bool) -> Box<dyn Command> {
            Box::new(Self {
                label,
                amount,
                mergeable,
            })
        }
    }

    impl Command for Counter {
        fn text(&self) -> &str {
            self.label
        }

        fn redo(&mut self, session: &mut EditSession) {
            for _ in 0..self.amount {
                session.timeline.add_track(splice_common::TrackType::Audio);
            }
        }

        fn undo(&mut self, session: &mut EditSession) {
            for _ in 0..self.amount {
                let last = session.timeline.track_count() - 1;
                session.timeline.remove_track(last).unwrap();
            }
        }

        fn id(&self) -> Option<UndoId> {
            self.mergeable.then_some(UndoId::FadeIn)
        }

        fn merge_with(&mut self, other: &dyn Command) -> bool {
            match other.as_any().downcast_ref::<Self>() {
                Some(other) => {
                    self.amount += other.amount;
                    true
                }
                None => false,
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn tracks(session: &EditSession) -> usize {
        session.timeline.track_count()
    }

    #[test]
    fn new_history_is_empty() {
        let h = CommandHistory::new(50);
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(h.undo_label().is_none());
        assert!(h.redo_label().is_none());
        assert_eq!(CommandHistory::default().max_entries(), 100);
    }

    #[test]
    fn push_undo_redo() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.push(&mut s, Counter::boxed("A", 1, false));
        h.push(&mut s, Counter::boxed("B", 2, false));
        assert_eq!(tracks(&s), 3);
        assert_eq!(h.undo_label(), Some("B"));
        assert!(s.is_dirty);

        assert!(h.undo(&mut s));
        assert_eq!(tracks(&s), 1);
        assert_eq!(h.redo_label(), Some("B"));
        assert!(h.redo(&mut s));
        assert_eq!(tracks(&s), 3);
        assert!(!h.redo(&mut s));
    }

    #[test]
    fn push_clears_redo_branch() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.push(&mut s, Counter::boxed("A", 1, false));
        h.undo(&mut s);
        assert!(h.can_redo());
        h.push(&mut s, Counter::boxed("B", 1, false));
        assert!(!h.can_redo());
        assert_eq!(h.undo_count(), 1);
    }

    #[test]
    fn mergeable_commands_coalesce() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.push(&mut s, Counter::boxed("Drag", 1, true));
        h.push(&mut s, Counter::boxed("Drag", 2, true));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(tracks(&s), 3);
        h.undo(&mut s);
        assert_eq!(tracks(&s), 0);
    }

    #[test]
    fn non_mergeable_commands_stay_separate() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.push(&mut s, Counter::boxed("A", 1, false));
        h.push(&mut s, Counter::boxed("B", 1, false));
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn macro_groups_into_one_step() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.begin_macro("Group");
        h.push(&mut s, Counter::boxed("A", 1, true));
        h.push(&mut s, Counter::boxed("A", 1, true));
        h.begin_macro("Inner");
        h.push(&mut s, Counter::boxed("B", 1, false));
        h.end_macro();
        assert!(h.is_in_macro());
        h.end_macro();

        assert_eq!(h.undo_count(), 1);
        assert_eq!(h.top().unwrap().len(), 3);
        assert!(h.top().unwrap().is_macro());
        assert_eq!(h.undo_label(), Some("Group"));
        h.undo(&mut s);
        assert_eq!(tracks(&s), 0);
        h.redo(&mut s);
        assert_eq!(tracks(&s), 3);
    }

    #[test]
    fn nothing_merges_into_a_macro_entry() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.begin_macro("Group");
        h.push(&mut s, Counter::boxed("A", 1, true));
        h.end_macro();
        h.push(&mut s, Counter::boxed("A", 1, true));
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn stuck_macro_is_closed_by_undo() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.begin_macro("Stuck");
        h.push(&mut s, Counter::boxed("A", 2, false));
        assert!(h.undo(&mut s));
        assert!(!h.is_in_macro());
        assert_eq!(tracks(&s), 0);
    }

    #[test]
    fn empty_macro_is_discarded() {
        let mut h = CommandHistory::new(50);
        h.begin_macro("Nothing");
        h.end_macro();
        assert!(!h.can_undo());
        h.end_macro();
        assert!(!h.is_in_macro());
    }

    #[test]
    fn limit_drops_oldest() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(2);
        h.push(&mut s, Counter::boxed("A", 1, false));
        h.push(&mut s, Counter::boxed("B", 1, false));
        h.push(&mut s, Counter::boxed("C", 1, false));
        assert_eq!(h.undo_count(), 2);
        h.undo(&mut s);
        h.undo(&mut s);
        assert!(!h.can_undo());
        assert_eq!(tracks(&s), 1);

        h.redo(&mut s);
        assert_eq!(h.undo_count(), 1);
        h.set_max_entries(0);
        assert_eq!(h.undo_count(), 0);
    }

    #[test]
    fn clear_resets_everything() {
        let mut s = EditSession::default();
        let mut h = CommandHistory::new(50);
        h.push(&mut s, Counter::boxed("A", 1, false));
        h.undo(&mut s);
        h.begin_macro("M");
        h.clear();
        assert!(!h.can_undo());
        assert!(!h.can_redo());
        assert!(!h.is_in_macro());
        assert!(!h.is_applying());
    }
}
