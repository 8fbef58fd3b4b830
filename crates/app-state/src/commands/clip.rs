//! Clip commands: adding, removing, moving, trimming, splitting and fading.

use std::any::Any;
use std::sync::Arc;

use splice_common::Frames;
use splice_timeline::{MediaGraph, SnapshotHints, SnapshotScope};

use super::materialize;
use crate::command::{checked, Command, Phase, UndoId};
use crate::snapshot::UndoHelper;
use crate::state::EditSession;

// ---------------------------------------------------------------------------
// Adding content
// ---------------------------------------------------------------------------

/// Append a clip, given as media-graph text, to the end of a track.
pub struct AppendCommand {
    graph: Arc<dyn MediaGraph>,
    track: usize,
    content: String,
    undo_helper: UndoHelper,
}

impl AppendCommand {
    pub fn new(graph: Arc<dyn MediaGraph>, track: usize, content: impl Into<String>) -> Self {
        Self {
            graph,
            track,
            content: content.into(),
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for AppendCommand {
    fn text(&self) -> &str {
        "Append to track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, "Append clip");
        self.undo_helper.record_before_state(&session.timeline);
        if let Some(clip) = materialize(self.graph.as_ref(), &self.content, self.text()) {
            checked(self.text(), session.timeline.append_clip(self.track, clip));
        }
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, "Undo append clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Insert a clip at a position, pushing later content right.
pub struct InsertCommand {
    graph: Arc<dyn MediaGraph>,
    track: usize,
    position: Frames,
    content: String,
    undo_helper: UndoHelper,
}

impl InsertCommand {
    pub fn new(graph: Arc<dyn MediaGraph>, track: usize, position: Frames, content: impl Into<String>) -> Self {
        Self {
            graph,
            track,
            position,
            content: content.into(),
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for InsertCommand {
    fn text(&self) -> &str {
        "Insert into track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, position = self.position, "Insert clip");
        self.undo_helper.record_before_state(&session.timeline);
        if let Some(clip) = materialize(self.graph.as_ref(), &self.content, self.text()) {
            checked(
                self.text(),
                session.timeline.insert_clip(self.track, clip, self.position),
            );
        }
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, position = self.position, "Undo insert clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Overwrite the range a clip covers when placed at a position.
pub struct OverwriteCommand {
    graph: Arc<dyn MediaGraph>,
    track: usize,
    position: Frames,
    content: String,
    undo_helper: UndoHelper,
}

impl OverwriteCommand {
    pub fn new(graph: Arc<dyn MediaGraph>, track: usize, position: Frames, content: impl Into<String>) -> Self {
        Self {
            graph,
            track,
            position,
            content: content.into(),
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for OverwriteCommand {
    fn text(&self) -> &str {
        "Overwrite onto track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, position = self.position, "Overwrite clip");
        self.undo_helper.record_before_state(&session.timeline);
        if let Some(clip) = materialize(self.graph.as_ref(), &self.content, self.text()) {
            checked(
                self.text(),
                session.timeline.overwrite(self.track, clip, self.position),
            );
        }
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, position = self.position, "Undo overwrite");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Replace a clip with new content placed at `position` (clip properties
/// edited outside the timeline).
///
/// The before-state is recorded at construction, while the clip still has
/// its old content, and recorded again on every redo after an undo.
pub struct UpdateCommand {
    graph: Arc<dyn MediaGraph>,
    track: usize,
    clip: usize,
    position: Frames,
    content: String,
    phase: Phase,
    undo_helper: UndoHelper,
}

impl UpdateCommand {
    pub fn new(
        session: &EditSession,
        graph: Arc<dyn MediaGraph>,
        track: usize,
        clip: usize,
        position: Frames,
        content: impl Into<String>,
    ) -> Self {
        let mut undo_helper = UndoHelper::new(SnapshotScope::track(track));
        undo_helper.record_before_state(&session.timeline);
        Self {
            graph,
            track,
            clip,
            position,
            content: content.into(),
            phase: Phase::default(),
            undo_helper,
        }
    }
}

impl Command for UpdateCommand {
    fn text(&self) -> &str {
        "Change clip properties"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(
            track = self.track,
            clip = self.clip,
            position = self.position,
            "Update clip"
        );
        if self.phase.enter_applied() {
            self.undo_helper.record_before_state(&session.timeline);
        }
        if let Some(clip) = materialize(self.graph.as_ref(), &self.content, self.text()) {
            let removed = checked(self.text(), session.timeline.remove_clip(self.track, self.clip));
            if removed.is_some() {
                checked(
                    self.text(),
                    session.timeline.insert_clip(self.track, clip, self.position),
                );
            }
        }
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Undo update clip");
        self.undo_helper.undo_changes(&mut session.timeline);
        session.selection.prune(&session.timeline);
        self.phase.enter_undone();
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Removing and moving
// ---------------------------------------------------------------------------

/// Replace a clip with a blank.
pub struct LiftCommand {
    track: usize,
    clip: usize,
    undo_helper: UndoHelper,
}

impl LiftCommand {
    pub fn new(track: usize, clip: usize) -> Self {
        Self {
            track,
            clip,
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for LiftCommand {
    fn text(&self) -> &str {
        "Lift from track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Lift clip");
        self.undo_helper.record_before_state(&session.timeline);
        checked(self.text(), session.timeline.lift_clip(self.track, self.clip));
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Undo lift clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ripple-delete a clip or blank.
pub struct RemoveCommand {
    track: usize,
    clip: usize,
    undo_helper: UndoHelper,
}

impl RemoveCommand {
    pub fn new(track: usize, clip: usize) -> Self {
        Self {
            track,
            clip,
            undo_helper: UndoHelper::new(SnapshotScope::track(track)),
        }
    }
}

impl Command for RemoveCommand {
    fn text(&self) -> &str {
        "Remove from track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Remove clip");
        self.undo_helper.record_before_state(&session.timeline);
        checked(self.text(), session.timeline.remove_clip(self.track, self.clip));
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, "Undo remove clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Lift a clip and overwrite it at a position, possibly on another track.
pub struct MoveClipCommand {
    from_track: usize,
    to_track: usize,
    clip: usize,
    position: Frames,
    new_index: Option<usize>,
    undo_helper: UndoHelper,
}

impl MoveClipCommand {
    pub fn new(from_track: usize, to_track: usize, clip: usize, position: Frames) -> Self {
        Self {
            from_track,
            to_track,
            clip,
            position,
            new_index: None,
            undo_helper: UndoHelper::new(SnapshotScope::Tracks(vec![from_track, to_track])),
        }
    }

    /// Index of the clip on the target track after the last apply.
    pub fn new_index(&self) -> Option<usize> {
        self.new_index
    }
}

impl Command for MoveClipCommand {
    fn text(&self) -> &str {
        "Move clip"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(
            from_track = self.from_track,
            to_track = self.to_track,
            clip = self.clip,
            position = self.position,
            "Move clip"
        );
        self.undo_helper.record_before_state(&session.timeline);
        self.new_index = checked(
            self.text(),
            session
                .timeline
                .move_clip(self.from_track, self.to_track, self.clip, self.position),
        );
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(from_track = self.from_track, to_track = self.to_track, "Undo move clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn is_obsolete(&self) -> bool {
        self.new_index.is_none()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Ripple-remove a clip and insert it at a position.
pub struct MoveInsertClipCommand {
    from_track: usize,
    to_track: usize,
    clip: usize,
    position: Frames,
    new_index: Option<usize>,
    undo_helper: UndoHelper,
}

impl MoveInsertClipCommand {
    pub fn new(from_track: usize, to_track: usize, clip: usize, position: Frames) -> Self {
        Self {
            from_track,
            to_track,
            clip,
            position,
            new_index: None,
            undo_helper: UndoHelper::new(SnapshotScope::Tracks(vec![from_track, to_track])),
        }
    }

    pub fn new_index(&self) -> Option<usize> {
        self.new_index
    }
}

impl Command for MoveInsertClipCommand {
    fn text(&self) -> &str {
        "Move clip"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(
            from_track = self.from_track,
            to_track = self.to_track,
            clip = self.clip,
            position = self.position,
            "Move-insert clip"
        );
        self.undo_helper.record_before_state(&session.timeline);
        self.new_index = checked(
            self.text(),
            session
                .timeline
                .move_insert_clip(self.from_track, self.to_track, self.clip, self.position),
        );
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(from_track = self.from_track, to_track = self.to_track, "Undo move-insert clip");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn is_obsolete(&self) -> bool {
        self.new_index.is_none()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Trims
// ---------------------------------------------------------------------------

/// Move a clip's in-point. Consecutive trims of the same clip merge.
pub struct TrimClipInCommand {
    track: usize,
    /// Index of the clip before the first apply.
    original_clip: usize,
    /// Index of the clip after the last apply.
    clip: usize,
    delta: Frames,
    ripple: bool,
    /// Whether the last apply was accepted by the timeline.
    applied: bool,
    undo_helper: UndoHelper,
}

impl TrimClipInCommand {
    pub fn new(track: usize, clip: usize, delta: Frames, ripple: bool) -> Self {
        let mut undo_helper = UndoHelper::new(SnapshotScope::track(track));
        if !ripple {
            undo_helper.set_hints(SnapshotHints {
                positions_only: true,
            });
        }
        Self {
            track,
            original_clip: clip,
            clip,
            delta,
            ripple,
            applied: false,
            undo_helper,
        }
    }

    pub fn clip_index(&self) -> usize {
        self.clip
    }

    pub fn delta(&self) -> Frames {
        self.delta
    }
}

impl Command for TrimClipInCommand {
    fn text(&self) -> &str {
        "Trim clip in point"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(
            track = self.track,
            clip = self.original_clip,
            delta = self.delta,
            ripple = self.ripple,
            "Trim clip in"
        );
        self.undo_helper.record_before_state(&session.timeline);
        let result = session
            .timeline
            .trim_clip_in(self.track, self.original_clip, self.delta, self.ripple);
        self.applied = match checked(self.text(), result) {
            Some(index) => {
                self.clip = index;
                true
            }
            None => false,
        };
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, delta = self.delta, "Undo trim clip in");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::TrimClipIn)
    }

    fn is_obsolete(&self) -> bool {
        !self.applied
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(that) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if !self.applied
            || !that.applied
            || that.track != self.track
            || that.ripple != self.ripple
            || (that.original_clip != self.clip && that.original_clip != self.original_clip)
        {
            return false;
        }
        self.delta += that.delta;
        self.clip = that.clip;
        self.undo_helper.adopt_after_state(&that.undo_helper);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move a clip's out-point. Consecutive trims of the same clip merge.
pub struct TrimClipOutCommand {
    track: usize,
    original_clip: usize,
    clip: usize,
    delta: Frames,
    ripple: bool,
    /// Whether the last apply was accepted by the timeline.
    applied: bool,
    undo_helper: UndoHelper,
}

impl TrimClipOutCommand {
    pub fn new(track: usize, clip: usize, delta: Frames, ripple: bool) -> Self {
        let mut undo_helper = UndoHelper::new(SnapshotScope::track(track));
        if !ripple {
            undo_helper.set_hints(SnapshotHints {
                positions_only: true,
            });
        }
        Self {
            track,
            original_clip: clip,
            clip,
            delta,
            ripple,
            applied: false,
            undo_helper,
        }
    }

    pub fn clip_index(&self) -> usize {
        self.clip
    }

    pub fn delta(&self) -> Frames {
        self.delta
    }
}

impl Command for TrimClipOutCommand {
    fn text(&self) -> &str {
        "Trim clip out point"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(
            track = self.track,
            clip = self.original_clip,
            delta = self.delta,
            ripple = self.ripple,
            "Trim clip out"
        );
        self.undo_helper.record_before_state(&session.timeline);
        let result = session
            .timeline
            .trim_clip_out(self.track, self.original_clip, self.delta, self.ripple);
        self.applied = match checked(self.text(), result) {
            Some(index) => {
                self.clip = index;
                true
            }
            None => false,
        };
        self.undo_helper.record_after_state(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, delta = self.delta, "Undo trim clip out");
        self.undo_helper.undo_changes(&mut session.timeline);
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::TrimClipOut)
    }

    fn is_obsolete(&self) -> bool {
        !self.applied
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(that) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if !self.applied
            || !that.applied
            || that.track != self.track
            || that.ripple != self.ripple
            || (that.original_clip != self.clip && that.original_clip != self.original_clip)
        {
            return false;
        }
        self.delta += that.delta;
        self.clip = that.clip;
        self.undo_helper.adopt_after_state(&that.undo_helper);
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

// ---------------------------------------------------------------------------
// Split and fades
// ---------------------------------------------------------------------------

/// Split a clip at an absolute position. Undo joins the two parts.
#[derive(Debug)]
pub struct SplitCommand {
    track: usize,
    clip: usize,
    position: Frames,
}

impl SplitCommand {
    pub fn new(track: usize, clip: usize, position: Frames) -> Self {
        Self {
            track,
            clip,
            position,
        }
    }
}

impl Command for SplitCommand {
    fn text(&self) -> &str {
        "Split clip"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, position = self.position, "Split clip");
        checked(
            self.text(),
            session.timeline.split_clip(self.track, self.clip, self.position),
        );
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, position = self.position, "Join clips");
        checked(self.text(), session.timeline.join_clips(self.track, self.clip));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set a clip's fade-in. Consecutive edits of the same clip merge.
#[derive(Debug)]
pub struct FadeInCommand {
    track: usize,
    clip: usize,
    duration: Frames,
    previous: Frames,
}

impl FadeInCommand {
    /// Reads the current fade-in as the undo value.
    pub fn new(session: &EditSession, track: usize, clip: usize, duration: Frames) -> Self {
        let previous = match session.timeline.clip(track, clip) {
            Ok(c) => c.fade_in,
            Err(err) => {
                tracing::warn!(track, clip, %err, "Fade in target is not a clip");
                0
            }
        };
        Self {
            track,
            clip,
            duration,
            previous,
        }
    }

    pub fn duration(&self) -> Frames {
        self.duration
    }
}

impl Command for FadeInCommand {
    fn text(&self) -> &str {
        "Adjust fade in"
    }

    fn redo(&mut self, session: &mut EditSession) {
        checked(
            self.text(),
            session.timeline.fade_in(self.track, self.clip, self.duration),
        );
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, duration = self.duration, "Undo fade in");
        checked(
            self.text(),
            session.timeline.fade_in(self.track, self.clip, self.previous),
        );
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::FadeIn)
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(that) if that.track == self.track && that.clip == self.clip => {
                self.duration = that.duration;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Set a clip's fade-out. Consecutive edits of the same clip merge.
#[derive(Debug)]
pub struct FadeOutCommand {
    track: usize,
    clip: usize,
    duration: Frames,
    previous: Frames,
}

impl FadeOutCommand {
    pub fn new(session: &EditSession, track: usize, clip: usize, duration: Frames) -> Self {
        let previous = match session.timeline.clip(track, clip) {
            Ok(c) => c.fade_out,
            Err(err) => {
                tracing::warn!(track, clip, %err, "Fade out target is not a clip");
                0
            }
        };
        Self {
            track,
            clip,
            duration,
            previous,
        }
    }

    pub fn duration(&self) -> Frames {
        self.duration
    }
}

impl Command for FadeOutCommand {
    fn text(&self) -> &str {
        "Adjust fade out"
    }

    fn redo(&mut self, session: &mut EditSession) {
        checked(
            self.text(),
            session.timeline.fade_out(self.track, self.clip, self.duration),
        );
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, clip = self.clip, duration = self.duration, "Undo fade out");
        checked(
            self.text(),
            session.timeline.fade_out(self.track, self.clip, self.previous),
        );
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::FadeOut)
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(that) if that.track == self.track && that.clip == self.clip => {
                self.duration = that.duration;
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CommandHistory;
    use splice_common::TrackType;
    use splice_timeline::{ClipEntry, JsonGraph, Node};

    fn graph() -> Arc<dyn MediaGraph> {
        Arc::new(JsonGraph)
    }

    fn text_of(clip: ClipEntry) -> String {
        JsonGraph.serialize(&Node::Clip(clip)).unwrap()
    }

    fn layout(session: &EditSession, track: usize) -> Vec<(&'static str, Frames)> {
        session
            .timeline
            .track(track)
            .unwrap()
            .entries()
            .iter()
            .map(|id| {
                let e = session.timeline.entry_by_id(*id).unwrap();
                (e.kind_name(), e.length())
            })
            .collect()
    }

    fn session_with(lengths: &[Frames]) -> (EditSession, usize) {
        let mut session = EditSession::default();
        let t = session.timeline.add_track(TrackType::Video);
        for (i, len) in lengths.iter().enumerate() {
            session
                .timeline
                .append_clip(t, ClipEntry::whole(format!("clip{i}.mp4"), *len))
                .unwrap();
        }
        (session, t)
    }

    #[test]
    fn append_and_undo() {
        let (mut s, t) = session_with(&[10]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(AppendCommand::new(graph(), t, text_of(ClipEntry::whole("b.mp4", 20)))));
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 20)]);
        h.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 10)]);
        h.redo(&mut s);
        assert_eq!(s.timeline.clip(t, 1).unwrap().source.resource, "b.mp4");
    }

    #[test]
    fn bad_content_is_a_no_op() {
        let (mut s, t) = session_with(&[10]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(AppendCommand::new(graph(), t, "not a clip")));
        assert_eq!(layout(&s, t), vec![("clip", 10)]);
        assert!(h.undo(&mut s));
        assert_eq!(layout(&s, t), vec![("clip", 10)]);
    }

    #[test]
    fn insert_splits_and_undo_rejoins() {
        let (mut s, t) = session_with(&[30]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(InsertCommand::new(graph(), t, 10, text_of(ClipEntry::whole("x", 5)))));
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 5), ("clip", 20)]);
        h.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 30)]);
        assert_eq!(s.timeline.clip(t, 0).unwrap().source.out_point, 30);
    }

    #[test]
    fn overwrite_past_end_pads_with_blank() {
        let (mut s, t) = session_with(&[10]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(OverwriteCommand::new(graph(), t, 15, text_of(ClipEntry::whole("x", 5)))));
        assert_eq!(layout(&s, t), vec![("clip", 10), ("blank", 5), ("clip", 5)]);
        h.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 10)]);
    }

    #[test]
    fn lift_and_remove() {
        let (mut s, t) = session_with(&[10, 20, 30]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(LiftCommand::new(t, 1)));
        assert_eq!(layout(&s, t), vec![("clip", 10), ("blank", 20), ("clip", 30)]);
        h.push(&mut s, Box::new(RemoveCommand::new(t, 1)));
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 30)]);
        h.undo(&mut s);
        h.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 20), ("clip", 30)]);
    }

    #[test]
    fn move_between_tracks_undoes_both() {
        let (mut s, _) = session_with(&[10, 20]);
        // Video tracks stack on top, pushing the filled track to index 1.
        let other = s.timeline.add_track(TrackType::Video);
        let t = 1;
        let mut cmd = MoveClipCommand::new(t, other, 1, 5);
        cmd.redo(&mut s);
        assert_eq!(cmd.new_index(), Some(1));
        assert_eq!(layout(&s, t), vec![("clip", 10)]);
        assert_eq!(layout(&s, other), vec![("blank", 5), ("clip", 20)]);
        cmd.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 20)]);
        assert!(s.timeline.track(other).unwrap().is_empty());
    }

    #[test]
    fn move_insert_ripples() {
        let (mut s, t) = session_with(&[10, 20, 30]);
        let mut cmd = MoveInsertClipCommand::new(t, t, 2, 0);
        cmd.redo(&mut s);
        assert_eq!(cmd.new_index(), Some(0));
        assert_eq!(layout(&s, t), vec![("clip", 30), ("clip", 10), ("clip", 20)]);
        cmd.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 20), ("clip", 30)]);
    }

    #[test]
    fn update_replaces_clip_and_reapplies() {
        let (mut s, t) = session_with(&[10, 20]);
        let mut h = CommandHistory::new(10);
        let cmd = UpdateCommand::new(&s, graph(), t, 0, 0, text_of(ClipEntry::whole("new.mp4", 10)));
        h.push(&mut s, Box::new(cmd));
        assert_eq!(s.timeline.clip(t, 0).unwrap().source.resource, "new.mp4");
        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().source.resource, "clip0.mp4");
        h.redo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().source.resource, "new.mp4");
        assert_eq!(layout(&s, t), vec![("clip", 10), ("clip", 20)]);
        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().source.resource, "clip0.mp4");
    }

    #[test]
    fn trims_merge_and_undo_together() {
        let mut s = EditSession::default();
        let t = s.timeline.add_track(TrackType::Video);
        s.timeline
            .append_clip(t, ClipEntry::from_range("a", 0, 50, 100))
            .unwrap();
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(TrimClipOutCommand::new(t, 0, -5, true)));
        h.push(&mut s, Box::new(TrimClipOutCommand::new(t, 0, -7, true)));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(s.timeline.clip(t, 0).unwrap().length(), 62);
        let top = h.top_command().unwrap();
        let trim = top.as_any().downcast_ref::<TrimClipOutCommand>().unwrap();
        assert_eq!(trim.delta(), -12);

        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().length(), 50);
        h.redo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().length(), 62);
    }

    #[test]
    fn trims_of_different_clips_do_not_merge() {
        let (mut s, t) = session_with(&[10, 20]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(TrimClipInCommand::new(t, 0, 2, true)));
        h.push(&mut s, Box::new(TrimClipInCommand::new(t, 1, 2, true)));
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn rejected_trim_is_not_recorded_or_merged() {
        let (mut s, t) = session_with(&[100]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(TrimClipInCommand::new(t, 0, 10, false)));
        assert_eq!(layout(&s, t), vec![("blank", 10), ("clip", 90)]);

        // Extending past the 10-frame blank is rejected.
        let mut wide = TrimClipInCommand::new(t, 1, -15, false);
        wide.redo(&mut s);
        assert!(wide.is_obsolete());
        h.push(&mut s, Box::new(TrimClipInCommand::new(t, 1, -15, false)));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(layout(&s, t), vec![("blank", 10), ("clip", 90)]);

        h.undo(&mut s);
        assert_eq!(layout(&s, t), vec![("clip", 100)]);
        h.redo(&mut s);
        assert_eq!(layout(&s, t), vec![("blank", 10), ("clip", 90)]);
    }

    #[test]
    fn rejected_trim_out_keeps_redo_stack() {
        let (mut s, t) = session_with(&[40, 20]);
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(TrimClipOutCommand::new(t, 0, 5, true)));
        h.undo(&mut s);
        // A whole-source clip cannot be extended past its end.
        h.push(&mut s, Box::new(TrimClipOutCommand::new(t, 0, -5, true)));
        assert_eq!(h.undo_count(), 0);
        assert_eq!(h.redo_count(), 1);
        assert_eq!(layout(&s, t), vec![("clip", 40), ("clip", 20)]);
    }

    #[test]
    fn split_then_undo_joins() {
        let (mut s, t) = session_with(&[40]);
        let before = s.timeline.clip(t, 0).unwrap().clone();
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(SplitCommand::new(t, 0, 15)));
        assert_eq!(layout(&s, t), vec![("clip", 15), ("clip", 25)]);
        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap(), &before);
    }

    #[test]
    fn fades_merge_and_restore_previous() {
        let (mut s, t) = session_with(&[40]);
        s.timeline.fade_out(t, 0, 3).unwrap();
        let mut h = CommandHistory::new(10);
        let first = FadeOutCommand::new(&s, t, 0, 10);
        h.push(&mut s, Box::new(first));
        let second = FadeOutCommand::new(&s, t, 0, 12);
        h.push(&mut s, Box::new(second));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(s.timeline.clip(t, 0).unwrap().fade_out, 12);
        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().fade_out, 3);

        let fade = FadeInCommand::new(&s, t, 0, 100);
        h.push(&mut s, Box::new(fade));
        assert_eq!(s.timeline.clip(t, 0).unwrap().fade_in, 40);
        h.undo(&mut s);
        assert_eq!(s.timeline.clip(t, 0).unwrap().fade_in, 0);
    }
}
