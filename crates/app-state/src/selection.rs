//! Clip, track, and keyframe selection state, and the undoable selection
//! command.
//!
//! Clips are selected by `(track, clip)` index pair. Indices go stale after
//! structural edits; [`SelectionState::prune`] drops the ones that no longer
//! point at a clip.

use std::any::Any;

use serde::{Deserialize, Serialize};
use splice_timeline::{FilterId, Timeline};

use crate::command::Command;
use crate::state::EditSession;

/// Tracks which clips, tracks, and keyframes are currently selected.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SelectionState {
    selected_clips: Vec<(usize, usize)>,
    selected_tracks: Vec<usize>,
    /// Keyframe selection: (filter, keyframe_index) pairs.
    selected_keyframes: Vec<(FilterId, usize)>,
    /// Whether multi-select mode is active (e.g., Shift or Ctrl held).
    multi_select: bool,
}

impl SelectionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Select a clip. If `multi` is false, clears previous clip selection first.
    pub fn select_clip(&mut self, track: usize, clip: usize, multi: bool) {
        if !multi {
            self.selected_clips.clear();
        }
        if !self.selected_clips.contains(&(track, clip)) {
            self.selected_clips.push((track, clip));
        }
        self.multi_select = multi;
    }

    pub fn deselect_clip(&mut self, track: usize, clip: usize) {
        self.selected_clips.retain(|c| *c != (track, clip));
    }

    /// Replace the clip selection.
    pub fn set_clips(&mut self, clips: Vec<(usize, usize)>) {
        self.multi_select = clips.len() > 1;
        self.selected_clips = clips;
        self.selected_clips.dedup();
    }

    /// Select a track. If `multi` is false, clears previous track selection first.
    pub fn select_track(&mut self, track: usize, multi: bool) {
        if !multi {
            self.selected_tracks.clear();
        }
        if !self.selected_tracks.contains(&track) {
            self.selected_tracks.push(track);
        }
        self.multi_select = multi;
    }

    pub fn deselect_track(&mut self, track: usize) {
        self.selected_tracks.retain(|t| *t != track);
    }

    /// Select a keyframe of a filter.
    pub fn select_keyframe(&mut self, filter: FilterId, keyframe_index: usize, multi: bool) {
        if !multi {
            self.selected_keyframes.clear();
        }
        let entry = (filter, keyframe_index);
        if !self.selected_keyframes.contains(&entry) {
            self.selected_keyframes.push(entry);
        }
        self.multi_select = multi;
    }

    pub fn deselect_keyframe(&mut self, filter: FilterId, keyframe_index: usize) {
        self.selected_keyframes
            .retain(|(f, idx)| !(*f == filter && *idx == keyframe_index));
    }

    /// Clear all selections (clips, tracks, and keyframes).
    pub fn clear(&mut self) {
        self.selected_clips.clear();
        self.selected_tracks.clear();
        self.selected_keyframes.clear();
        self.multi_select = false;
    }

    /// Drop selected items that no longer exist in `timeline`.
    pub fn prune(&mut self, timeline: &Timeline) {
        let before = self.count();
        self.selected_clips
            .retain(|(track, clip)| timeline.clip(*track, *clip).is_ok());
        self.selected_tracks
            .retain(|track| *track < timeline.track_count());
        self.selected_keyframes.retain(|(filter, index)| {
            timeline
                .filter(*filter)
                .is_some_and(|f| *index < f.keyframes.len())
        });
        let dropped = before - self.count();
        if dropped > 0 {
            tracing::debug!(dropped, "Stale selection pruned");
        }
    }

    pub fn selected_clips(&self) -> &[(usize, usize)] {
        &self.selected_clips
    }

    pub fn selected_tracks(&self) -> &[usize] {
        &self.selected_tracks
    }

    pub fn selected_keyframes(&self) -> &[(FilterId, usize)] {
        &self.selected_keyframes
    }

    pub fn is_clip_selected(&self, track: usize, clip: usize) -> bool {
        self.selected_clips.contains(&(track, clip))
    }

    pub fn is_track_selected(&self, track: usize) -> bool {
        self.selected_tracks.contains(&track)
    }

    pub fn is_keyframe_selected(&self, filter: FilterId, keyframe_index: usize) -> bool {
        self.selected_keyframes.contains(&(filter, keyframe_index))
    }

    pub fn is_multi_select(&self) -> bool {
        self.multi_select
    }

    /// Returns true if nothing is selected.
    pub fn is_empty(&self) -> bool {
        self.selected_clips.is_empty()
            && self.selected_tracks.is_empty()
            && self.selected_keyframes.is_empty()
    }

    /// Total number of selected items across all categories.
    pub fn count(&self) -> usize {
        self.selected_clips.len() + self.selected_tracks.len() + self.selected_keyframes.len()
    }
}

/// Undoable change of the clip selection.
#[derive(Debug)]
pub struct ClipsSelectCommand {
    new_selection: Vec<(usize, usize)>,
    old_selection: Vec<(usize, usize)>,
}

impl ClipsSelectCommand {
    /// Capture the current clip selection of `session` as the undo state.
    pub fn new(session: &EditSession, clips: Vec<(usize, usize)>) -> Self {
        Self {
            new_selection: clips,
            old_selection: session.selection.selected_clips().to_vec(),
        }
    }
}

impl Command for ClipsSelectCommand {
    fn text(&self) -> &str {
        "Select clips"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(clips = self.new_selection.len(), "Select clips");
        session.selection.set_clips(self.new_selection.clone());
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(clips = self.old_selection.len(), "Restore clip selection");
        session.selection.set_clips(self.old_selection.clone());
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_common::TrackType;
    use splice_timeline::{ClipEntry, Filter};

    #[test]
    fn new_selection_is_empty() {
        let sel = SelectionState::new();
        assert!(sel.is_empty());
        assert_eq!(sel.count(), 0);
        assert!(!sel.is_multi_select());
    }

    #[test]
    fn select_clip_single_and_multi() {
        let mut sel = SelectionState::new();
        sel.select_clip(0, 1, false);
        sel.select_clip(0, 2, false);
        assert!(!sel.is_clip_selected(0, 1));
        assert!(sel.is_clip_selected(0, 2));

        sel.select_clip(1, 0, true);
        sel.select_clip(1, 0, true);
        assert_eq!(sel.selected_clips(), &[(0, 2), (1, 0)]);
        assert!(sel.is_multi_select());

        sel.deselect_clip(0, 2);
        assert_eq!(sel.selected_clips(), &[(1, 0)]);
    }

    #[test]
    fn select_track_and_keyframe() {
        let mut sel = SelectionState::new();
        sel.select_track(2, false);
        sel.select_track(3, true);
        assert!(sel.is_track_selected(2) && sel.is_track_selected(3));
        sel.deselect_track(2);
        assert_eq!(sel.selected_tracks(), &[3]);

        sel.select_keyframe(FilterId(4), 0, false);
        sel.select_keyframe(FilterId(4), 2, true);
        assert!(sel.is_keyframe_selected(FilterId(4), 2));
        sel.deselect_keyframe(FilterId(4), 0);
        assert_eq!(sel.selected_keyframes(), &[(FilterId(4), 2)]);
        assert_eq!(sel.count(), 2);

        sel.clear();
        assert!(sel.is_empty());
        assert!(!sel.is_multi_select());
    }

    #[test]
    fn prune_drops_stale_items() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, ClipEntry::whole("a.mp4", 10)).unwrap();
        let filter = tl.attach_track_filter(t, Filter::new("blur")).unwrap();

        let mut sel = SelectionState::new();
        sel.select_clip(t, 0, true);
        sel.select_clip(t, 5, true);
        sel.select_track(t, true);
        sel.select_track(9, true);
        sel.select_keyframe(filter, 0, true);
        sel.prune(&tl);
        assert_eq!(sel.selected_clips(), &[(t, 0)]);
        assert_eq!(sel.selected_tracks(), &[t]);
        assert!(sel.selected_keyframes().is_empty());
    }

    #[test]
    fn select_command_round_trip() {
        let mut session = EditSession::default();
        session.selection.select_clip(0, 0, false);
        let mut cmd = ClipsSelectCommand::new(&session, vec![(1, 1), (1, 2)]);
        cmd.redo(&mut session);
        assert_eq!(session.selection.selected_clips(), &[(1, 1), (1, 2)]);
        assert!(session.selection.is_multi_select());
        cmd.undo(&mut session);
        assert_eq!(session.selection.selected_clips(), &[(0, 0)]);
    }

    #[test]
    fn serialize_deserialize_roundtrip() {
        let mut sel = SelectionState::new();
        sel.select_clip(0, 3, false);
        sel.select_keyframe(FilterId(7), 1, true);
        let json = serde_json::to_string(&sel).unwrap();
        let restored: SelectionState = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, sel);
    }
}
