//! Before/after snapshots around compound edits.
//!
//! `UndoHelper` wraps any sequence of timeline primitives so that one
//! [`UndoHelper::undo_changes`] call reverses all of their cascading effects
//! (blanks merged, transitions dissolved, entries split). The command's own
//! redo re-runs the primitives, so only the undo path restores a snapshot.
//!
//! # Usage
//!
//! ```
//! use splice_app_state::UndoHelper;
//! use splice_common::TrackType;
//! use splice_timeline::{ClipEntry, SnapshotScope, Timeline};
//!
//! let mut timeline = Timeline::default();
//! let track = timeline.add_track(TrackType::Video);
//! let mut helper = UndoHelper::new(SnapshotScope::track(track));
//!
//! helper.record_before_state(&timeline);
//! timeline.append_clip(track, ClipEntry::whole("a.mp4", 50)).unwrap();
//! helper.record_after_state(&timeline);
//!
//! assert!(helper.undo_changes(&mut timeline));
//! assert_eq!(timeline.entry_count(track).unwrap(), 0);
//! ```

use splice_timeline::{SnapshotHints, SnapshotScope, Timeline, TimelineSnapshot};

/// Records the state of a timeline region before and after an edit.
#[derive(Clone, Debug)]
pub struct UndoHelper {
    scope: SnapshotScope,
    hints: SnapshotHints,
    before: Option<TimelineSnapshot>,
    after: Option<TimelineSnapshot>,
}

impl UndoHelper {
    pub fn new(scope: SnapshotScope) -> Self {
        Self {
            scope,
            hints: SnapshotHints::default(),
            before: None,
            after: None,
        }
    }

    /// Helper covering every track (edits whose effects cross tracks).
    pub fn whole_timeline() -> Self {
        Self::new(SnapshotScope::Timeline)
    }

    pub fn scope(&self) -> &SnapshotScope {
        &self.scope
    }

    pub fn hints(&self) -> SnapshotHints {
        self.hints
    }

    /// Narrow what later recordings copy. Takes effect on the next
    /// [`record_before_state`](Self::record_before_state).
    pub fn set_hints(&mut self, hints: SnapshotHints) {
        self.hints = hints;
    }

    pub fn record_before_state(&mut self, timeline: &Timeline) {
        let snapshot = TimelineSnapshot::capture(timeline, self.scope.clone(), self.hints);
        tracing::debug!(
            scope = ?self.scope,
            bytes = snapshot.estimated_size(),
            "Recorded before-state"
        );
        self.before = Some(snapshot);
        self.after = None;
    }

    pub fn record_after_state(&mut self, timeline: &Timeline) {
        if self.before.is_none() {
            tracing::error!(scope = ?self.scope, "After-state recorded without a before-state");
        }
        self.after = Some(TimelineSnapshot::capture(timeline, self.scope.clone(), self.hints));
    }

    /// Take over the after-state of a command merged into this one.
    pub fn adopt_after_state(&mut self, other: &UndoHelper) {
        self.after = other.after.clone();
    }

    pub fn has_before_state(&self) -> bool {
        self.before.is_some()
    }

    /// Restore the before-state. Returns `false` (and changes nothing) when
    /// no before-state was recorded.
    pub fn undo_changes(&self, timeline: &mut Timeline) -> bool {
        let Some(before) = &self.before else {
            tracing::error!(scope = ?self.scope, "undo_changes called without a before-state");
            return false;
        };
        if let Some(after) = &self.after {
            let current = TimelineSnapshot::capture(timeline, after.scope.clone(), self.hints);
            if &current != after {
                tracing::warn!(
                    scope = ?self.scope,
                    "Timeline diverged from the recorded after-state"
                );
            }
        }
        before.restore(timeline);
        true
    }

    /// Rough memory held by the recorded snapshots, in bytes.
    pub fn estimated_size(&self) -> usize {
        self.before.as_ref().map_or(0, TimelineSnapshot::estimated_size)
            + self.after.as_ref().map_or(0, TimelineSnapshot::estimated_size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_common::TrackType;
    use splice_timeline::{ClipEntry, Entry};

    fn timeline_with_clips() -> (Timeline, usize) {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, ClipEntry::whole("a.mp4", 100)).unwrap();
        tl.append_clip(t, ClipEntry::whole("b.mp4", 100)).unwrap();
        (tl, t)
    }

    #[test]
    fn undo_without_before_state_is_refused() {
        let (mut tl, t) = timeline_with_clips();
        let helper = UndoHelper::new(SnapshotScope::track(t));
        assert!(!helper.has_before_state());
        assert!(!helper.undo_changes(&mut tl));
        assert_eq!(tl.entry_count(t).unwrap(), 2);
    }

    #[test]
    fn undo_restores_cascading_edit() {
        let (mut tl, t) = timeline_with_clips();
        let ids: Vec<_> = tl.track(t).unwrap().entries().to_vec();
        let mut helper = UndoHelper::new(SnapshotScope::track(t));
        helper.record_before_state(&tl);
        tl.add_transition(t, 1, 80).unwrap();
        tl.split_clip(t, 0, 40).unwrap();
        helper.record_after_state(&tl);
        assert_eq!(tl.entry_count(t).unwrap(), 4);

        assert!(helper.undo_changes(&mut tl));
        assert_eq!(tl.track(t).unwrap().entries(), ids.as_slice());
        assert_eq!(tl.clip(t, 0).unwrap().length(), 100);
        assert_eq!(tl.clip(t, 1).unwrap().source.in_point, 0);
    }

    #[test]
    fn positions_only_restores_trim() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, ClipEntry::from_range("a.mp4", 10, 60, 100)).unwrap();
        let mut helper = UndoHelper::new(SnapshotScope::track(t));
        helper.set_hints(SnapshotHints {
            positions_only: true,
        });
        helper.record_before_state(&tl);
        let index = tl.trim_clip_in(t, 0, 5, false).unwrap();
        helper.record_after_state(&tl);
        assert_eq!(index, 1);
        assert!(tl.entry(t, 0).unwrap().is_blank());

        helper.undo_changes(&mut tl);
        assert_eq!(tl.entry_count(t).unwrap(), 1);
        assert_eq!(tl.clip(t, 0).unwrap().source.in_point, 10);
    }

    #[test]
    fn merged_helper_takes_later_after_state() {
        let (mut tl, t) = timeline_with_clips();
        let mut first = UndoHelper::new(SnapshotScope::track(t));
        first.record_before_state(&tl);
        tl.fade_in(t, 0, 10).unwrap();
        first.record_after_state(&tl);

        let mut second = UndoHelper::new(SnapshotScope::track(t));
        second.record_before_state(&tl);
        tl.fade_in(t, 0, 20).unwrap();
        second.record_after_state(&tl);

        first.adopt_after_state(&second);
        assert!(first.undo_changes(&mut tl));
        match tl.entry(t, 0).unwrap() {
            Entry::Clip(c) => assert_eq!(c.fade_in, 0),
            other => panic!("expected clip, got {}", other.kind_name()),
        }
        assert!(first.estimated_size() > 0);
    }
}
