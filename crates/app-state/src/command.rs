//! The command trait and the apply/undo lifecycle shared by every command.
//!
//! A command is constructed when a user gesture commits, applied once by
//! [`CommandHistory::push`](crate::history::CommandHistory::push), then
//! inverted and re-applied any number of times by undo and redo.

use std::any::Any;

use splice_common::TimelineResult;

use crate::state::EditSession;

/// Merge key of a command kind. Commands without one never merge.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum UndoId {
    TrimClipIn,
    TrimClipOut,
    FadeIn,
    FadeOut,
    TrimTransitionIn,
    TrimTransitionOut,
    Filter,
    KeyFrame,
}

/// One undoable user action.
pub trait Command: Send {
    /// Label shown in the undo history.
    fn text(&self) -> &str;

    fn redo(&mut self, session: &mut EditSession);

    fn undo(&mut self, session: &mut EditSession);

    fn id(&self) -> Option<UndoId> {
        None
    }

    /// Absorb `other`, which was applied right after `self` and has the same
    /// [`UndoId`]. Returning `false` keeps `other` as its own history entry.
    fn merge_with(&mut self, _other: &dyn Command) -> bool {
        false
    }

    /// Whether the first apply was rejected and left the timeline untouched.
    /// History drops such a command instead of recording it.
    fn is_obsolete(&self) -> bool {
        false
    }

    fn as_any(&self) -> &dyn Any;
}

/// Where a command is in its apply/undo cycle.
///
/// `Applied { replay: true }` holds exactly when the command was undone at
/// least once before this apply. The first apply is the user's own gesture,
/// whose neighbor notifications the timeline view already produced.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Phase {
    #[default]
    Constructed,
    Applied { replay: bool },
    Undone,
}

impl Phase {
    /// Enter the applied state. Returns whether this apply is a replay.
    pub fn enter_applied(&mut self) -> bool {
        let replay = match *self {
            Self::Constructed => false,
            Self::Undone => true,
            Self::Applied { replay } => {
                tracing::warn!("Command applied twice without undo");
                replay
            }
        };
        *self = Self::Applied { replay };
        replay
    }

    pub fn enter_undone(&mut self) {
        if !matches!(self, Self::Applied { .. }) {
            tracing::warn!(phase = ?self, "Command undone while not applied");
        }
        *self = Self::Undone;
    }

    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Callback run after a command applied or inverted a value.
pub type Hook<T> = Box<dyn Fn(&T) + Send>;

/// Log a rejected primitive and turn it into `None`.
pub(crate) fn checked<T>(command: &str, result: TimelineResult<T>) -> Option<T> {
    match result {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(command, %err, "Edit rejected");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_common::TimelineError;

    #[test]
    fn first_apply_is_not_a_replay() {
        let mut phase = Phase::default();
        assert!(!phase.enter_applied());
        assert!(phase.is_applied());
        phase.enter_undone();
        assert_eq!(phase, Phase::Undone);
        assert!(phase.enter_applied());
        phase.enter_undone();
        assert!(phase.enter_applied());
    }

    #[test]
    fn checked_swallows_errors() {
        assert_eq!(checked("Test", Ok::<_, TimelineError>(3)), Some(3));
        let err: TimelineResult<u8> = Err(TimelineError::TrackLocked { track: 1 });
        assert_eq!(checked("Test", err), None);
    }
}
