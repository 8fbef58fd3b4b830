//! Transition commands.
//!
//! Adding or removing a transition by drag has side effects on both
//! neighbors and on the blanks around them, so those commands undo through a
//! snapshot. The trim-based commands are exact inverses of each other and
//! undo through the timeline primitives. They hold entry ids rather than
//! indices so a replay finds its clip even after unrelated edits.

use std::any::Any;

use splice_common::Frames;
use splice_timeline::{EntryId, SnapshotScope, Timeline};

use crate::command::{checked, Command, Phase, UndoId};
use crate::snapshot::UndoHelper;
use crate::state::EditSession;

/// Handle of the entry at `(track, index)`, or `None` with a warning.
fn entry_handle(timeline: &Timeline, track: usize, index: usize, command: &str) -> Option<EntryId> {
    checked(command, timeline.entry_id(track, index))
}

/// Current index of a held entry, or `None` with a warning.
fn resolve(timeline: &Timeline, track: usize, id: Option<EntryId>, command: &str) -> Option<usize> {
    let index = id.and_then(|id| timeline.index_of(track, id));
    if index.is_none() {
        tracing::warn!(command, track, "Target entry no longer on track");
    }
    index
}

// ---------------------------------------------------------------------------
// Drag-created transitions
// ---------------------------------------------------------------------------

/// Turn the overlap made by dragging a clip onto its neighbor into a
/// transition.
pub struct AddTransitionCommand {
    track: usize,
    clip: usize,
    position: Frames,
    transition: Option<usize>,
    undo_helper: UndoHelper,
}

impl AddTransitionCommand {
    pub fn new(track: usize, clip: usize, position: Frames) -> Self {
        Self {
            track,
            clip,
            position,
            transition: None,
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }

    /// Index of the created transition, `None` when there was no overlap.
    pub fn transition_index(&self) -> Option<usize> {
        self.transition
    }
}

impl Command for AddTransitionCommand {
    fn text(&self) -> &str {
        "Add transition"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, position = self.position, "Add transition");
        self.undo_helper.record_before_state(&session.timeline);
        self.transition = checked(
            self.text(),
            session.timeline.add_transition(self.track, self.clip, self.position),
        );
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Undo add transition");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn is_obsolete(&self) -> bool {
        self.transition.is_none()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a transition; the previous clip takes its frames.
pub struct RemoveTransitionCommand {
    track: usize,
    transition: usize,
    undo_helper: UndoHelper,
}

impl RemoveTransitionCommand {
    pub fn new(track: usize, transition: usize) -> Self {
        Self {
            track,
            transition,
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for RemoveTransitionCommand {
    fn text(&self) -> &str {
        "Remove transition"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, transition = self.transition, "Remove transition");
        self.undo_helper.record_before_state(&session.timeline);
        checked(
            self.text(),
            session.timeline.remove_transition(self.track, self.transition),
        );
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, transition = self.transition, "Undo remove transition");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove the transitions on both sides of a clip.
pub struct RemoveTransitionsOnClipCommand {
    track: usize,
    clip: usize,
    undo_helper: UndoHelper,
}

impl RemoveTransitionsOnClipCommand {
    pub fn new(track: usize, clip: usize) -> Self {
        Self {
            track,
            clip,
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for RemoveTransitionsOnClipCommand {
    fn text(&self) -> &str {
        "Remove transition"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Remove transitions on clip");
        self.undo_helper.record_before_state(&session.timeline);
        checked(
            self.text(),
            session.timeline.remove_transitions_on_clip(self.track, self.clip),
        );
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Undo remove transitions on clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Transition trims
// ---------------------------------------------------------------------------

/// Move the in-point of the transition before a clip.
///
/// A replay notifies the clip's in-point; the first apply does not, since
/// the view issuing the trim already did.
pub struct TrimTransitionInCommand {
    track: usize,
    /// Clip after the transition.
    clip: Option<EntryId>,
    delta: Frames,
    /// Whether the last apply was accepted by the timeline.
    applied: bool,
    phase: Phase,
}

impl TrimTransitionInCommand {
    pub fn new(session: &EditSession, track: usize, clip: usize, delta: Frames) -> Self {
        Self {
            track,
            clip: entry_handle(&session.timeline, track, clip, "Trim transition in point"),
            delta,
            applied: false,
            phase: Phase::default(),
        }
    }

    pub fn delta(&self) -> Frames {
        self.delta
    }
}

impl Command for TrimTransitionInCommand {
    fn text(&self) -> &str {
        "Trim transition in point"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let replay = self.phase.enter_applied();
        self.applied = false;
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, replay, "Trim transition in");
        self.applied = checked(
            self.text(),
            session.timeline.trim_transition_in(self.track, clip, self.delta),
        )
        .is_some();
        if replay && self.applied {
            checked(self.text(), session.timeline.notify_clip_in(self.track, clip));
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.phase.enter_undone();
        if !self.applied {
            return;
        }
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, "Undo trim transition in");
        checked(
            self.text(),
            session.timeline.trim_transition_in(self.track, clip, -self.delta),
        );
        checked(self.text(), session.timeline.notify_clip_in(self.track, clip));
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::TrimTransitionIn)
    }

    fn is_obsolete(&self) -> bool {
        !self.applied
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(that)
                if self.applied
                    && that.applied
                    && that.track == self.track
                    && that.clip.is_some()
                    && that.clip == self.clip =>
            {
                self.delta += that.delta;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move the out-point of the transition after a clip.
pub struct TrimTransitionOutCommand {
    track: usize,
    /// Clip before the transition.
    clip: Option<EntryId>,
    delta: Frames,
    /// Whether the last apply was accepted by the timeline.
    applied: bool,
    phase: Phase,
}

impl TrimTransitionOutCommand {
    pub fn new(session: &EditSession, track: usize, clip: usize, delta: Frames) -> Self {
        Self {
            track,
            clip: entry_handle(&session.timeline, track, clip, "Trim transition out point"),
            delta,
            applied: false,
            phase: Phase::default(),
        }
    }

    pub fn delta(&self) -> Frames {
        self.delta
    }
}

impl Command for TrimTransitionOutCommand {
    fn text(&self) -> &str {
        "Trim transition out point"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let replay = self.phase.enter_applied();
        self.applied = false;
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, replay, "Trim transition out");
        self.applied = checked(
            self.text(),
            session.timeline.trim_transition_out(self.track, clip, self.delta),
        )
        .is_some();
        if replay && self.applied {
            checked(self.text(), session.timeline.notify_clip_out(self.track, clip));
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.phase.enter_undone();
        if !self.applied {
            return;
        }
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, "Undo trim transition out");
        checked(
            self.text(),
            session.timeline.trim_transition_out(self.track, clip, -self.delta),
        );
        checked(self.text(), session.timeline.notify_clip_out(self.track, clip));
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::TrimTransitionOut)
    }

    fn is_obsolete(&self) -> bool {
        !self.applied
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(that)
                if self.applied
                    && that.applied
                    && that.track == self.track
                    && that.clip.is_some()
                    && that.clip == self.clip =>
            {
                self.delta += that.delta;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Trim-created transitions
// ---------------------------------------------------------------------------

/// Drag a clip's in-point back over the previous clip, creating a
/// transition between them.
pub struct AddTransitionByTrimInCommand {
    track: usize,
    /// Clip after the new transition.
    clip: Option<EntryId>,
    delta: Frames,
    transition: Option<EntryId>,
    phase: Phase,
}

impl AddTransitionByTrimInCommand {
    pub fn new(session: &EditSession, track: usize, clip: usize, delta: Frames) -> Self {
        Self {
            track,
            clip: entry_handle(&session.timeline, track, clip, "Add transition"),
            delta,
            transition: None,
            phase: Phase::default(),
        }
    }

    /// Handle of the transition created by the last apply.
    pub fn transition(&self) -> Option<EntryId> {
        self.transition
    }
}

impl Command for AddTransitionByTrimInCommand {
    fn text(&self) -> &str {
        "Add transition"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let replay = self.phase.enter_applied();
        self.transition = None;
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, "Add transition by trim in");
        let timeline = &mut session.timeline;
        let Some(index) = checked(
            self.text(),
            timeline.add_transition_by_trim_in(self.track, clip, self.delta),
        ) else {
            return;
        };
        self.transition = entry_handle(timeline, self.track, index, self.text());
        if replay && index > 0 {
            checked(self.text(), timeline.notify_clip_out(self.track, index - 1));
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.phase.enter_undone();
        let Some(index) = resolve(&session.timeline, self.track, self.transition, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, transition = index, "Undo add transition by trim in");
        checked(
            self.text(),
            session.timeline.remove_transition_by_trim_in(self.track, index),
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Drag a clip's out-point over the next clip, creating a transition between
/// them.
pub struct AddTransitionByTrimOutCommand {
    track: usize,
    /// Clip before the new transition.
    clip: Option<EntryId>,
    delta: Frames,
    transition: Option<EntryId>,
    phase: Phase,
}

impl AddTransitionByTrimOutCommand {
    pub fn new(session: &EditSession, track: usize, clip: usize, delta: Frames) -> Self {
        Self {
            track,
            clip: entry_handle(&session.timeline, track, clip, "Add transition"),
            delta,
            transition: None,
            phase: Phase::default(),
        }
    }

    pub fn transition(&self) -> Option<EntryId> {
        self.transition
    }
}

impl Command for AddTransitionByTrimOutCommand {
    fn text(&self) -> &str {
        "Add transition"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let replay = self.phase.enter_applied();
        self.transition = None;
        let Some(clip) = resolve(&session.timeline, self.track, self.clip, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, clip, delta = self.delta, "Add transition by trim out");
        let timeline = &mut session.timeline;
        let Some(index) = checked(
            self.text(),
            timeline.add_transition_by_trim_out(self.track, clip, self.delta),
        ) else {
            return;
        };
        self.transition = entry_handle(timeline, self.track, index, self.text());
        if replay {
            checked(self.text(), timeline.notify_clip_in(self.track, index + 1));
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.phase.enter_undone();
        let Some(index) = resolve(&session.timeline, self.track, self.transition, self.text()) else {
            return;
        };
        tracing::debug!(track = self.track, transition = index, "Undo add transition by trim out");
        checked(
            self.text(),
            session.timeline.remove_transition_by_trim_out(self.track, index),
        );
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
