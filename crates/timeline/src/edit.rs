//! Clip-level structural primitives: append, insert, overwrite, lift, remove,
//! move, trim, split, join and fades.
//!
//! Index effects, for commands that track positions:
//! - `insert_clip` / `append_clip` shift every later entry by one (two when
//!   the insertion point splits an entry).
//! - `lift_clip` keeps the indices of earlier entries; later entries may move
//!   down when the new blank merges with a neighbor blank.
//! - `remove_clip` shifts later entries down by one or more.
//! - `trim_clip_in` without ripple may move the clip one index up or down
//!   when a blank before it is created or consumed; the new index is returned.
//! - `split_clip` shifts every later entry by one; `join_clips` by minus one.

use splice_common::{Frames, TimelineError, TimelineResult};

use crate::arena::EntryId;
use crate::entry::{ClipEntry, Entry};
use crate::event::TimelineEvent;
use crate::model::Timeline;
use crate::snapshot::{SnapshotHints, SnapshotScope, TimelineSnapshot};

impl Timeline {
    // -----------------------------------------------------------------------
    // Sequence helpers
    // -----------------------------------------------------------------------

    /// Run a multi-step edit over `tracks`. When a later step fails, the
    /// tracks are put back as they were before the first step.
    fn all_or_nothing<T>(
        &mut self,
        tracks: &[usize],
        edit: impl FnOnce(&mut Self) -> TimelineResult<T>,
    ) -> TimelineResult<T> {
        let before = TimelineSnapshot::capture(self, SnapshotScope::Tracks(tracks.to_vec()), SnapshotHints::default());
        let result = edit(self);
        if let Err(err) = &result {
            tracing::debug!(?tracks, %err, "Rolling back partial edit");
            before.restore(self);
        }
        result
    }

    fn blank_len_mut(&mut self, track: usize, index: usize) -> Option<&mut Frames> {
        let id = *self.tracks.get(track)?.entries.get(index)?;
        match self.arena.get_mut(id)? {
            Entry::Blank { length } => Some(length),
            _ => None,
        }
    }

    /// Ensure an entry boundary at `position` and return the index of the
    /// entry starting there (the entry count when `position` is the end).
    /// Positions past the end are padded with a blank.
    pub(crate) fn split_at(&mut self, track: usize, position: Frames) -> TimelineResult<usize> {
        if position < 0 {
            return Err(TimelineError::InvalidPosition(position));
        }
        let length = self.track_length(track)?;
        if position >= length {
            if position > length {
                let pad = self.arena.insert(Entry::blank(position - length));
                self.tracks[track].entries.push(pad);
            }
            return Ok(self.tracks[track].entries.len());
        }

        let index = self
            .entry_at(track, position)?
            .ok_or(TimelineError::InvalidPosition(position))?;
        let start = self.entry_start(track, index)?;
        if start == position {
            return Ok(index);
        }
        let offset = position - start;
        let id = self.entry_id(track, index)?;
        let blank_len = match self.resolve(id)? {
            Entry::Blank { length } => Some(*length),
            Entry::Clip(_) => None,
            Entry::Transition(_) => return Err(TimelineError::InvalidPosition(position)),
        };
        match blank_len {
            Some(total) => {
                if let Some(len) = self.blank_len_mut(track, index) {
                    *len = offset;
                }
                let tail = self.arena.insert(Entry::blank(total - offset));
                self.tracks[track].entries.insert(index + 1, tail);
            }
            None => {
                self.split_entry(track, index, offset)?;
            }
        }
        Ok(index + 1)
    }

    /// Index of the entry starting exactly at `position`.
    fn boundary_index(&self, track: usize, position: Frames) -> TimelineResult<usize> {
        let t = self.track(track)?;
        let mut start = 0;
        for (i, id) in t.entries.iter().enumerate() {
            if start == position {
                return Ok(i);
            }
            start += self.resolve(*id)?.length();
        }
        if start == position {
            Ok(t.entries.len())
        } else {
            Err(TimelineError::InvalidPosition(position))
        }
    }

    /// Split the clip at `index` `offset` frames after its start. The right
    /// part gets a new id and copies of the filters with new filter ids.
    /// Fade-in stays on the left part, fade-out moves to the right part.
    fn split_entry(&mut self, track: usize, index: usize, offset: Frames) -> TimelineResult<EntryId> {
        let id = self.entry_id(track, index)?;
        let original = self.clip(track, index)?.clone();
        if offset <= 0 || offset >= original.length() {
            return Err(TimelineError::InvalidSplit {
                track,
                index,
                position: offset,
            });
        }
        let cut = original.source.in_point + offset;

        let mut left = original.clone();
        left.source.out_point = cut;
        left.fade_out = 0;

        let mut right = original;
        right.source.in_point = cut;
        right.fade_in = 0;
        for filter in &mut right.filters {
            filter.id = self.fresh_filter_id();
        }

        *self.resolve_mut(id)? = Entry::Clip(left);
        let right_id = self.arena.insert(Entry::Clip(right));
        self.tracks[track].entries.insert(index + 1, right_id);
        Ok(right_id)
    }

    /// Insert an already stored entry at `position`, splitting whatever is there.
    pub(crate) fn place_insert(&mut self, track: usize, id: EntryId, position: Frames) -> TimelineResult<usize> {
        self.dissolve_touching(track, position, position)?;
        let at = self.split_at(track, position)?;
        self.tracks[track].entries.insert(at, id);
        self.normalize(track);
        let index = self
            .index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))?;
        self.emit(TimelineEvent::TrackReset { track });
        Ok(index)
    }

    /// Place an already stored entry over `[position, position + len)`,
    /// replacing what was there.
    pub(crate) fn place_overwrite(&mut self, track: usize, id: EntryId, position: Frames) -> TimelineResult<usize> {
        let end = position + self.resolve(id)?.length();
        self.dissolve_touching(track, position, end)?;
        self.split_at(track, end)?;
        let first = self.split_at(track, position)?;
        let last = self.boundary_index(track, end)?;

        let removed: Vec<EntryId> = self.tracks[track]
            .entries
            .splice(first..last, [id])
            .collect();
        self.free_entries(&removed);
        self.normalize(track);
        let index = self
            .index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))?;
        self.emit(TimelineEvent::TrackReset { track });
        Ok(index)
    }

    /// Replace the clip at `index` with a blank of the same length and return
    /// its id, leaving the clip stored in the arena.
    fn detach_with_blank(&mut self, track: usize, index: usize) -> TimelineResult<EntryId> {
        let id = self.entry_id(track, index)?;
        let length = self.resolve(id)?.length();
        let blank = self.arena.insert(Entry::blank(length));
        self.tracks[track].entries[index] = blank;
        self.normalize(track);
        Ok(id)
    }

    // -----------------------------------------------------------------------
    // Adding content
    // -----------------------------------------------------------------------

    /// Append a clip at the end of a track. Returns its index.
    pub fn append_clip(&mut self, track: usize, clip: ClipEntry) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        Self::validate_clip(&clip)?;
        let id = self.alloc_clip(clip);
        self.tracks[track].entries.push(id);
        let index = self.tracks[track].entries.len() - 1;
        tracing::debug!(track, clip = index, "Clip appended");
        self.emit(TimelineEvent::ClipInserted { track, clip: index });
        Ok(index)
    }

    /// Insert a clip at `position`, pushing everything after it later by the
    /// clip's length. A clip or blank under `position` is split; a transition
    /// under or touching it is dissolved first. Returns the clip's index.
    pub fn insert_clip(&mut self, track: usize, clip: ClipEntry, position: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        Self::validate_clip(&clip)?;
        if position < 0 {
            return Err(TimelineError::InvalidPosition(position));
        }
        let id = self.alloc_clip(clip);
        match self.all_or_nothing(&[track], |tl| tl.place_insert(track, id, position)) {
            Ok(index) => {
                tracing::debug!(track, clip = index, position, "Clip inserted");
                Ok(index)
            }
            Err(e) => {
                self.arena.remove(id);
                Err(e)
            }
        }
    }

    /// Overwrite `[position, position + len)` with a clip. Returns its index.
    pub fn overwrite(&mut self, track: usize, clip: ClipEntry, position: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        Self::validate_clip(&clip)?;
        if position < 0 {
            return Err(TimelineError::InvalidPosition(position));
        }
        let id = self.alloc_clip(clip);
        match self.all_or_nothing(&[track], |tl| tl.place_overwrite(track, id, position)) {
            Ok(index) => {
                tracing::debug!(track, clip = index, position, "Clip overwritten");
                Ok(index)
            }
            Err(e) => {
                self.arena.remove(id);
                Err(e)
            }
        }
    }

    // -----------------------------------------------------------------------
    // Removing and moving content
    // -----------------------------------------------------------------------

    /// Replace a clip with a blank, keeping every other entry in place.
    pub fn lift_clip(&mut self, track: usize, clip: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        self.clip(track, clip)?;
        let index = self.remove_transitions_on_clip(track, clip)?;
        let id = self.detach_with_blank(track, index)?;
        self.arena.remove(id);
        tracing::debug!(track, clip = index, "Clip lifted");
        self.emit(TimelineEvent::TrackReset { track });
        Ok(())
    }

    /// Ripple-delete a clip or blank: later entries move earlier.
    pub fn remove_clip(&mut self, track: usize, clip: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        let index = match self.entry(track, clip)? {
            Entry::Clip(_) => self.remove_transitions_on_clip(track, clip)?,
            Entry::Blank { .. } => clip,
            Entry::Transition(_) => {
                return Err(TimelineError::WrongKind {
                    track,
                    index: clip,
                    expected: "clip or blank",
                })
            }
        };
        let id = self.tracks[track].entries.remove(index);
        self.arena.remove(id);
        self.normalize(track);
        tracing::debug!(track, clip = index, "Clip removed");
        self.emit(TimelineEvent::TrackReset { track });
        Ok(())
    }

    /// Lift a clip and overwrite it at `position` on `to_track`. The clip keeps
    /// its id. Returns its new index.
    pub fn move_clip(
        &mut self,
        from_track: usize,
        to_track: usize,
        clip: usize,
        position: Frames,
    ) -> TimelineResult<usize> {
        self.check_unlocked(from_track)?;
        self.check_unlocked(to_track)?;
        self.clip(from_track, clip)?;
        if position < 0 {
            return Err(TimelineError::InvalidPosition(position));
        }
        let new_index = self.all_or_nothing(&[from_track, to_track], |tl| {
            let index = tl.remove_transitions_on_clip(from_track, clip)?;
            let id = tl.detach_with_blank(from_track, index)?;
            tl.emit(TimelineEvent::TrackReset { track: from_track });
            tl.place_overwrite(to_track, id, position)
        })?;
        tracing::debug!(from_track, to_track, clip, position, new_index, "Clip moved");
        Ok(new_index)
    }

    /// Ripple-remove a clip and insert it at `position` on `to_track`.
    /// `position` is interpreted after the removal. Returns the new index.
    pub fn move_insert_clip(
        &mut self,
        from_track: usize,
        to_track: usize,
        clip: usize,
        position: Frames,
    ) -> TimelineResult<usize> {
        self.check_unlocked(from_track)?;
        self.check_unlocked(to_track)?;
        self.clip(from_track, clip)?;
        if position < 0 {
            return Err(TimelineError::InvalidPosition(position));
        }
        let new_index = self.all_or_nothing(&[from_track, to_track], |tl| {
            let index = tl.remove_transitions_on_clip(from_track, clip)?;
            let id = tl.tracks[from_track].entries.remove(index);
            tl.normalize(from_track);
            tl.emit(TimelineEvent::TrackReset { track: from_track });
            tl.place_insert(to_track, id, position)
        })?;
        tracing::debug!(from_track, to_track, clip, position, new_index, "Clip move-inserted");
        Ok(new_index)
    }

    // -----------------------------------------------------------------------
    // Trims
    // -----------------------------------------------------------------------

    /// Move a clip's in-point by `delta` (positive shortens the clip).
    ///
    /// With `ripple` the later entries follow the clip's new end. Without it
    /// the blank before the clip absorbs the change: it grows (and is created
    /// if missing), shrinks, or disappears when it reaches zero. Extending
    /// past the available blank fails. Returns the clip's new index.
    pub fn trim_clip_in(&mut self, track: usize, clip: usize, delta: Frames, ripple: bool) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        let source = self.clip(track, clip)?.source.clone();
        if delta == 0 {
            return Ok(clip);
        }
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: clip,
            delta,
            reason,
        };
        if clip > 0 && self.is_kind(track, clip - 1, Entry::is_transition) {
            return Err(reject("adjacent transition"));
        }
        let new_in = source.in_point + delta;
        if new_in < 0 || new_in >= source.out_point {
            return Err(reject("source bounds"));
        }

        let id = self.entry_id(track, clip)?;
        let count = self.entry_count(track)?;
        if !ripple {
            let prev_blank = clip > 0 && self.is_kind(track, clip - 1, Entry::is_blank);
            if delta > 0 {
                if prev_blank {
                    if let Some(len) = self.blank_len_mut(track, clip - 1) {
                        *len += delta;
                    }
                } else {
                    let blank = self.arena.insert(Entry::blank(delta));
                    self.tracks[track].entries.insert(clip, blank);
                }
            } else {
                if !prev_blank {
                    return Err(reject("no blank before clip"));
                }
                let available = self.entry(track, clip - 1)?.length();
                if available < -delta {
                    return Err(reject("blank too short"));
                }
                if let Some(len) = self.blank_len_mut(track, clip - 1) {
                    *len += delta;
                }
            }
        }

        if let Some(c) = self.resolve_mut(id)?.as_clip_mut() {
            c.source.in_point = new_in;
        }
        self.normalize(track);
        let index = self
            .index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))?;
        tracing::debug!(track, clip = index, delta, ripple, "Trim clip in");
        self.emit(TimelineEvent::ClipChanged { track, clip: index });
        if ripple || self.entry_count(track)? != count {
            self.emit(TimelineEvent::TrackReset { track });
        }
        Ok(index)
    }

    /// Move a clip's out-point by `delta` (positive shortens the clip).
    ///
    /// Without `ripple` the blank after the clip absorbs the change. The last
    /// clip of a track needs no blank. Returns the clip's index, which does
    /// not change.
    pub fn trim_clip_out(&mut self, track: usize, clip: usize, delta: Frames, ripple: bool) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        let source = self.clip(track, clip)?.source.clone();
        if delta == 0 {
            return Ok(clip);
        }
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: clip,
            delta,
            reason,
        };
        let count = self.entry_count(track)?;
        let has_next = clip + 1 < count;
        if has_next && self.is_kind(track, clip + 1, Entry::is_transition) {
            return Err(reject("adjacent transition"));
        }
        let new_out = source.out_point - delta;
        if new_out <= source.in_point || new_out > source.duration {
            return Err(reject("source bounds"));
        }

        let id = self.entry_id(track, clip)?;
        if !ripple && has_next {
            let next_blank = self.is_kind(track, clip + 1, Entry::is_blank);
            if delta > 0 {
                if next_blank {
                    if let Some(len) = self.blank_len_mut(track, clip + 1) {
                        *len += delta;
                    }
                } else {
                    let blank = self.arena.insert(Entry::blank(delta));
                    self.tracks[track].entries.insert(clip + 1, blank);
                }
            } else {
                if !next_blank {
                    return Err(reject("no blank after clip"));
                }
                let available = self.entry(track, clip + 1)?.length();
                if available < -delta {
                    return Err(reject("blank too short"));
                }
                if let Some(len) = self.blank_len_mut(track, clip + 1) {
                    *len += delta;
                }
            }
        }

        if let Some(c) = self.resolve_mut(id)?.as_clip_mut() {
            c.source.out_point = new_out;
        }
        self.normalize(track);
        let index = self
            .index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))?;
        tracing::debug!(track, clip = index, delta, ripple, "Trim clip out");
        self.emit(TimelineEvent::ClipChanged { track, clip: index });
        if ripple || self.entry_count(track)? != count {
            self.emit(TimelineEvent::TrackReset { track });
        }
        Ok(index)
    }

    // -----------------------------------------------------------------------
    // Split / join
    // -----------------------------------------------------------------------

    /// Split a clip at the absolute timeline `position`, which must fall
    /// strictly inside it. Returns the index of the right part.
    pub fn split_clip(&mut self, track: usize, clip: usize, position: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        let length = self.clip(track, clip)?.length();
        let start = self.entry_start(track, clip)?;
        if position <= start || position >= start + length {
            return Err(TimelineError::InvalidSplit {
                track,
                index: clip,
                position,
            });
        }
        self.split_entry(track, clip, position - start)?;
        tracing::debug!(track, clip, position, "Clip split");
        self.emit(TimelineEvent::ClipChanged { track, clip });
        self.emit(TimelineEvent::ClipInserted {
            track,
            clip: clip + 1,
        });
        Ok(clip + 1)
    }

    /// Join a clip with the next entry, which must be a clip continuing the
    /// same source range. The left part keeps its id, filters and fade-in and
    /// takes the fade-out of the right part.
    pub fn join_clips(&mut self, track: usize, clip: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        let invalid = TimelineError::InvalidJoin { track, index: clip };
        let left = self.clip(track, clip).map_err(|_| invalid.clone())?;
        let right = self.clip(track, clip + 1).map_err(|_| invalid.clone())?;
        if left.source.resource != right.source.resource
            || left.source.out_point != right.source.in_point
        {
            return Err(invalid);
        }
        let out_point = right.source.out_point;
        let fade_out = right.fade_out;

        let left = self.clip_mut_at(track, clip)?;
        left.source.out_point = out_point;
        left.fade_out = fade_out;

        let right_id = self.tracks[track].entries.remove(clip + 1);
        self.arena.remove(right_id);
        tracing::debug!(track, clip, "Clips joined");
        self.emit(TimelineEvent::ClipChanged { track, clip });
        self.emit(TimelineEvent::ClipRemoved {
            track,
            clip: clip + 1,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Fades and notifications
    // -----------------------------------------------------------------------

    /// Set the fade-in duration, clamped to `[0, clip length]`. Returns the
    /// applied duration.
    pub fn fade_in(&mut self, track: usize, clip: usize, duration: Frames) -> TimelineResult<Frames> {
        self.check_unlocked(track)?;
        let c = self.clip_mut_at(track, clip)?;
        let applied = duration.clamp(0, c.length());
        c.fade_in = applied;
        tracing::debug!(track, clip, duration = applied, "Fade in");
        self.emit(TimelineEvent::ClipChanged { track, clip });
        Ok(applied)
    }

    /// Set the fade-out duration, clamped to `[0, clip length]`.
    pub fn fade_out(&mut self, track: usize, clip: usize, duration: Frames) -> TimelineResult<Frames> {
        self.check_unlocked(track)?;
        let c = self.clip_mut_at(track, clip)?;
        let applied = duration.clamp(0, c.length());
        c.fade_out = applied;
        tracing::debug!(track, clip, duration = applied, "Fade out");
        self.emit(TimelineEvent::ClipChanged { track, clip });
        Ok(applied)
    }

    /// Tell observers the in-point of `clip` moved.
    pub fn notify_clip_in(&self, track: usize, clip: usize) -> TimelineResult<()> {
        self.entry(track, clip)?;
        self.emit(TimelineEvent::ClipInChanged { track, clip });
        Ok(())
    }

    /// Tell observers the out-point of `clip` moved.
    pub fn notify_clip_out(&self, track: usize, clip: usize) -> TimelineResult<()> {
        self.entry(track, clip)?;
        self.emit(TimelineEvent::ClipOutChanged { track, clip });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::Filter;
    use splice_common::TrackType;

    fn clip(len: Frames) -> ClipEntry {
        ClipEntry::whole("media.mp4", len)
    }

    /// Entry layout of a track as (kind, length) pairs.
    fn layout(tl: &Timeline, track: usize) -> Vec<(&'static str, Frames)> {
        tl.track(track)
            .unwrap()
            .entries()
            .iter()
            .map(|id| {
                let e = tl.entry_by_id(*id).unwrap();
                (e.kind_name(), e.length())
            })
            .collect()
    }

    /// Track 0: one 30-frame clip. Track 1: A (80) T (20) B (80), where B's
    /// source start no longer leaves room to take the transition back.
    fn mover_and_stuck_transition() -> (Timeline, usize, usize) {
        let mut tl = Timeline::default();
        let to = tl.add_track(TrackType::Video);
        tl.append_clip(to, ClipEntry::from_range("a.mp4", 0, 100, 200)).unwrap();
        tl.append_clip(to, ClipEntry::from_range("b.mp4", 50, 150, 200)).unwrap();
        tl.add_transition(to, 1, 80).unwrap();
        tl.clip_mut_at(to, 2).unwrap().source.in_point = 5;
        let from = tl.add_track(TrackType::Video);
        tl.append_clip(from, clip(30)).unwrap();
        (tl, from, to + 1)
    }

    fn whole(tl: &Timeline) -> TimelineSnapshot {
        TimelineSnapshot::capture(tl, SnapshotScope::Timeline, SnapshotHints::default())
    }

    #[test]
    fn failed_move_leaves_both_tracks_untouched() {
        let (mut tl, from, to) = mover_and_stuck_transition();
        let before = whole(&tl);
        assert!(tl.move_clip(from, to, 0, 80).is_err());
        assert_eq!(whole(&tl), before);
        assert!(tl.move_insert_clip(from, to, 0, 80).is_err());
        assert_eq!(whole(&tl), before);
        assert_eq!(layout(&tl, from), vec![("clip", 30)]);
    }

    #[test]
    fn failed_insert_and_overwrite_leave_track_untouched() {
        let (mut tl, _, to) = mover_and_stuck_transition();
        let before = whole(&tl);
        let arena_len = tl.arena.len();
        assert!(tl.insert_clip(to, clip(10), 80).is_err());
        assert!(tl.overwrite(to, clip(10), 80).is_err());
        assert_eq!(whole(&tl), before);
        assert_eq!(tl.arena.len(), arena_len);
    }

    fn two_clips_with_gap() -> (Timeline, usize) {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(100)).unwrap();
        tl.insert_clip(t, clip(50), 120).unwrap();
        (tl, t)
    }

    #[test]
    fn insert_past_end_pads_with_blank() {
        let (tl, t) = two_clips_with_gap();
        assert_eq!(layout(&tl, t), vec![("clip", 100), ("blank", 20), ("clip", 50)]);
        assert_eq!(tl.entry_start(t, 2).unwrap(), 120);
    }

    #[test]
    fn insert_inside_clip_splits_it() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(100)).unwrap();
        let index = tl.insert_clip(t, clip(10), 40).unwrap();
        assert_eq!(index, 1);
        assert_eq!(layout(&tl, t), vec![("clip", 40), ("clip", 10), ("clip", 60)]);
        assert_eq!(tl.clip(t, 2).unwrap().source.in_point, 40);
    }

    #[test]
    fn insert_into_blank_splits_blank() {
        let (mut tl, t) = two_clips_with_gap();
        let index = tl.insert_clip(t, clip(5), 110).unwrap();
        assert_eq!(index, 2);
        assert_eq!(
            layout(&tl, t),
            vec![("clip", 100), ("blank", 10), ("clip", 5), ("blank", 10), ("clip", 50)]
        );
    }

    #[test]
    fn overwrite_replaces_range() {
        let (mut tl, t) = two_clips_with_gap();
        // covers the last 10 frames of clip 0, the gap, and 10 of clip 2
        let index = tl.overwrite(t, clip(40), 90).unwrap();
        assert_eq!(index, 1);
        assert_eq!(layout(&tl, t), vec![("clip", 90), ("clip", 40), ("clip", 40)]);
        assert_eq!(tl.track_length(t).unwrap(), 170);
        assert_eq!(tl.clip(t, 2).unwrap().source.in_point, 10);
    }

    #[test]
    fn overwrite_past_end() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        assert_eq!(tl.overwrite(t, clip(5), 20).unwrap(), 2);
        assert_eq!(layout(&tl, t), vec![("clip", 10), ("blank", 10), ("clip", 5)]);
    }

    #[test]
    fn lift_merges_blanks_and_drops_trailing() {
        let (mut tl, t) = two_clips_with_gap();
        tl.lift_clip(t, 0).unwrap();
        assert_eq!(layout(&tl, t), vec![("blank", 120), ("clip", 50)]);
        tl.lift_clip(t, 1).unwrap();
        assert!(layout(&tl, t).is_empty());
        assert_eq!(tl.arena.len(), 0);
    }

    #[test]
    fn remove_ripples() {
        let (mut tl, t) = two_clips_with_gap();
        tl.remove_clip(t, 0).unwrap();
        assert_eq!(layout(&tl, t), vec![("blank", 20), ("clip", 50)]);
        tl.remove_clip(t, 0).unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 50)]);
    }

    #[test]
    fn move_clip_keeps_id() {
        let mut tl = Timeline::default();
        tl.add_track(TrackType::Video);
        tl.add_track(TrackType::Video);
        tl.append_clip(0, clip(30)).unwrap();
        let id = tl.entry_id(0, 0).unwrap();
        let index = tl.move_clip(0, 1, 0, 10).unwrap();
        assert_eq!(index, 1);
        assert!(layout(&tl, 0).is_empty());
        assert_eq!(layout(&tl, 1), vec![("blank", 10), ("clip", 30)]);
        assert_eq!(tl.entry_id(1, 1).unwrap(), id);
    }

    #[test]
    fn move_insert_on_same_track() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        tl.append_clip(t, ClipEntry::whole("b.mp4", 20)).unwrap();
        let index = tl.move_insert_clip(t, t, 0, 20).unwrap();
        assert_eq!(index, 1);
        assert_eq!(tl.clip(t, 0).unwrap().source.resource, "b.mp4");
    }

    #[test]
    fn trim_in_without_ripple_grows_blank() {
        let (mut tl, t) = two_clips_with_gap();
        let index = tl.trim_clip_in(t, 2, 10, false).unwrap();
        assert_eq!(index, 2);
        assert_eq!(layout(&tl, t), vec![("clip", 100), ("blank", 30), ("clip", 40)]);
        assert_eq!(tl.entry_start(t, 2).unwrap(), 130);
    }

    #[test]
    fn trim_in_without_ripple_checks_room() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        tl.insert_clip(t, ClipEntry::from_range("b.mp4", 20, 70, 100), 15)
            .unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 10), ("blank", 5), ("clip", 50)]);

        let err = tl.trim_clip_in(t, 2, -10, false).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidTrim { reason: "blank too short", .. }));
        let err = tl.trim_clip_in(t, 0, -1, false).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidTrim { reason: "source bounds", .. }));
        assert_eq!(layout(&tl, t), vec![("clip", 10), ("blank", 5), ("clip", 50)]);
    }

    #[test]
    fn trim_in_removes_zero_blank() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(100)).unwrap();
        tl.append_clip(t, ClipEntry::from_range("b.mp4", 20, 70, 100)).unwrap();
        tl.trim_clip_in(t, 1, 20, false).unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 100), ("blank", 20), ("clip", 30)]);
        let index = tl.trim_clip_in(t, 2, -20, false).unwrap();
        assert_eq!(index, 1);
        assert_eq!(layout(&tl, t), vec![("clip", 100), ("clip", 50)]);
    }

    #[test]
    fn trim_in_ripple_shifts_followers() {
        let (mut tl, t) = two_clips_with_gap();
        tl.trim_clip_in(t, 0, 25, true).unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 75), ("blank", 20), ("clip", 50)]);
        assert_eq!(tl.entry_start(t, 2).unwrap(), 95);
    }

    #[test]
    fn trim_out_last_clip_needs_no_blank() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, ClipEntry::from_range("a", 0, 50, 100)).unwrap();
        assert_eq!(tl.trim_clip_out(t, 0, -20, false).unwrap(), 0);
        assert_eq!(tl.clip(t, 0).unwrap().length(), 70);
        tl.trim_clip_out(t, 0, 30, false).unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 40)]);
    }

    #[test]
    fn trim_out_needs_room() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, ClipEntry::from_range("a", 0, 50, 100)).unwrap();
        tl.append_clip(t, clip(10)).unwrap();
        let err = tl.trim_clip_out(t, 0, -5, false).unwrap_err();
        assert!(matches!(err, TimelineError::InvalidTrim { .. }));
        tl.trim_clip_out(t, 0, 10, false).unwrap();
        assert_eq!(layout(&tl, t), vec![("clip", 40), ("blank", 10), ("clip", 10)]);
    }

    #[test]
    fn zero_delta_is_noop() {
        let (mut tl, t) = two_clips_with_gap();
        let before = layout(&tl, t);
        assert_eq!(tl.trim_clip_in(t, 2, 0, false).unwrap(), 2);
        assert_eq!(tl.trim_clip_out(t, 0, 0, true).unwrap(), 0);
        assert_eq!(layout(&tl, t), before);
    }

    #[test]
    fn split_then_join_is_exact() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        let mut c = ClipEntry::from_range("a.mp4", 10, 110, 200)
            .with_filter(Filter::new("brightness").with_property("level", 0.5));
        c.fade_in = 5;
        c.fade_out = 7;
        tl.append_clip(t, c).unwrap();
        let original = tl.clip(t, 0).unwrap().clone();
        let id = tl.entry_id(t, 0).unwrap();

        assert_eq!(tl.split_clip(t, 0, 30).unwrap(), 1);
        let left = tl.clip(t, 0).unwrap();
        let right = tl.clip(t, 1).unwrap();
        assert_eq!((left.source.in_point, left.source.out_point), (10, 40));
        assert_eq!((right.source.in_point, right.source.out_point), (40, 110));
        assert_eq!((left.fade_in, left.fade_out), (5, 0));
        assert_eq!((right.fade_in, right.fade_out), (0, 7));
        assert_ne!(left.filters[0].id, right.filters[0].id);

        tl.join_clips(t, 0).unwrap();
        assert_eq!(tl.clip(t, 0).unwrap(), &original);
        assert_eq!(tl.entry_id(t, 0).unwrap(), id);
        assert_eq!(tl.entry_count(t).unwrap(), 1);
    }

    #[test]
    fn split_outside_clip_fails() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        assert!(tl.split_clip(t, 0, 0).is_err());
        assert!(tl.split_clip(t, 0, 10).is_err());
    }

    #[test]
    fn join_requires_contiguous_source() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        tl.append_clip(t, clip(10)).unwrap();
        assert_eq!(
            tl.join_clips(t, 0).unwrap_err(),
            TimelineError::InvalidJoin { track: t, index: 0 }
        );
    }

    #[test]
    fn fades_are_clamped() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        assert_eq!(tl.fade_in(t, 0, 25).unwrap(), 10);
        assert_eq!(tl.fade_out(t, 0, -3).unwrap(), 0);
    }

    #[test]
    fn locked_track_rejects_edits() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        tl.append_clip(t, clip(10)).unwrap();
        tl.set_track_lock(t, true).unwrap();
        assert_eq!(
            tl.append_clip(t, clip(5)).unwrap_err(),
            TimelineError::TrackLocked { track: t }
        );
        assert!(tl.lift_clip(t, 0).is_err());
    }

    #[test]
    fn invalid_source_rejected() {
        let mut tl = Timeline::default();
        let t = tl.add_track(TrackType::Video);
        let err = tl
            .append_clip(t, ClipEntry::from_range("a", 5, 5, 10))
            .unwrap_err();
        assert!(matches!(err, TimelineError::InvalidSource { .. }));
    }
}
