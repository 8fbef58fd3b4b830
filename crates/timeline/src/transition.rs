//! Transition primitives.
//!
//! A transition entry sits between two clips, A before it and B after it.
//! Its `a` range is the tail of A's source that plays under the blend, its
//! `b` range the head of B's source. Removing a transition gives its frames
//! back to one of the two clips ([`Absorb`]), so positions never move.

use splice_common::{Frames, PropertyValue, TimelineError, TimelineResult};

use crate::arena::EntryId;
use crate::entry::{Entry, Service, SourceRef, TransitionEntry};
use crate::event::TimelineEvent;
use crate::model::Timeline;

/// Which neighbor takes over the frames of a dissolved transition.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Absorb {
    /// Clip A extends its out-point over the transition.
    Previous,
    /// Clip B extends its in-point back over the transition.
    Next,
}

impl Timeline {
    fn transition_at(&self, track: usize, index: usize) -> TimelineResult<&TransitionEntry> {
        self.entry(track, index)?
            .as_transition()
            .ok_or(TimelineError::WrongKind {
                track,
                index,
                expected: "transition",
            })
    }

    fn new_transition(&self, a: SourceRef, b: SourceRef) -> TransitionEntry {
        TransitionEntry {
            a,
            b,
            service: Service {
                name: self.transition_preset.service.clone(),
                properties: self.transition_preset.properties.clone(),
            },
        }
    }

    fn insert_transition(&mut self, track: usize, index: usize, transition: TransitionEntry) -> EntryId {
        let id = self.arena.insert(Entry::Transition(transition));
        self.tracks[track].entries.insert(index, id);
        id
    }

    // -----------------------------------------------------------------------
    // Creating by drag
    // -----------------------------------------------------------------------

    /// Turn the overlap created by dragging `clip` to `position` into a
    /// transition with its neighbor.
    ///
    /// Dragging left overlaps the previous clip (a single blank between them
    /// is allowed); dragging right overlaps the next clip. The overlap must be
    /// shorter than both clips. Returns the transition's index, or
    /// `NoOverlap` when no valid overlap exists.
    pub fn add_transition(&mut self, track: usize, clip: usize, position: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        self.clip(track, clip)?;
        let start = self.entry_start(track, clip)?;
        let result = if position < start {
            self.add_transition_left(track, clip, position)
        } else if position > start {
            self.add_transition_right(track, clip, position)
        } else {
            Err(TimelineError::NoOverlap { track, clip })
        };
        match &result {
            Ok(index) => {
                tracing::debug!(track, clip, position, transition = index, "Transition added");
                self.emit(TimelineEvent::TrackReset { track });
            }
            Err(_) => tracing::warn!(track, clip, position, "No overlap for a transition"),
        }
        result
    }

    fn add_transition_left(&mut self, track: usize, b: usize, position: Frames) -> TimelineResult<usize> {
        let no_overlap = TimelineError::NoOverlap { track, clip: b };
        let count = self.entry_count(track)?;
        if b + 1 < count && self.is_kind(track, b + 1, Entry::is_transition) {
            return Err(no_overlap);
        }
        let (a, gap) = if b >= 1 && self.is_kind(track, b - 1, Entry::is_clip) {
            (b - 1, 0)
        } else if b >= 2
            && self.is_kind(track, b - 1, Entry::is_blank)
            && self.is_kind(track, b - 2, Entry::is_clip)
        {
            (b - 2, self.entry(track, b - 1)?.length())
        } else {
            return Err(no_overlap);
        };

        let a_len = self.clip(track, a)?.length();
        let b_len = self.clip(track, b)?.length();
        let a_end = self.entry_start(track, b)? - gap;
        let d = a_end - position;
        if d <= 0 || d >= a_len || d >= b_len {
            return Err(no_overlap);
        }
        let has_followers = b + 1 < count;

        let tail = {
            let clip_a = self.clip_mut_at(track, a)?;
            clip_a.source.out_point -= d;
            let mut tail = clip_a.source.clone();
            tail.in_point = tail.out_point;
            tail.out_point += d;
            tail
        };
        let head = {
            let clip_b = self.clip_mut_at(track, b)?;
            let mut head = clip_b.source.clone();
            head.out_point = head.in_point + d;
            clip_b.source.in_point += d;
            head
        };

        if gap > 0 {
            let blank = self.tracks[track].entries.remove(a + 1);
            self.arena.remove(blank);
        }
        let transition = self.new_transition(tail, head);
        let id = self.insert_transition(track, a + 1, transition);
        if has_followers {
            let filler = self.arena.insert(Entry::blank(gap + d));
            self.tracks[track].entries.insert(a + 3, filler);
        }
        self.normalize(track);
        self.index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))
    }

    fn add_transition_right(&mut self, track: usize, a: usize, position: Frames) -> TimelineResult<usize> {
        let no_overlap = TimelineError::NoOverlap { track, clip: a };
        if a >= 1 && self.is_kind(track, a - 1, Entry::is_transition) {
            return Err(no_overlap);
        }
        let (b, gap) = if self.is_kind(track, a + 1, Entry::is_clip) {
            (a + 1, 0)
        } else if self.is_kind(track, a + 1, Entry::is_blank)
            && self.is_kind(track, a + 2, Entry::is_clip)
        {
            (a + 2, self.entry(track, a + 1)?.length())
        } else {
            return Err(no_overlap);
        };

        let a_len = self.clip(track, a)?.length();
        let b_len = self.clip(track, b)?.length();
        let shift = position - self.entry_start(track, a)?;
        let d = shift - gap;
        if d <= 0 || d >= a_len || d >= b_len {
            return Err(no_overlap);
        }

        let tail = {
            let clip_a = self.clip_mut_at(track, a)?;
            clip_a.source.out_point -= d;
            let mut tail = clip_a.source.clone();
            tail.in_point = tail.out_point;
            tail.out_point += d;
            tail
        };
        let head = {
            let clip_b = self.clip_mut_at(track, b)?;
            let mut head = clip_b.source.clone();
            head.out_point = head.in_point + d;
            clip_b.source.in_point += d;
            head
        };

        if gap > 0 {
            let blank = self.tracks[track].entries.remove(a + 1);
            self.arena.remove(blank);
        }
        let transition = self.new_transition(tail, head);
        let id = self.insert_transition(track, a + 1, transition);

        // The blank before A grows by the drag distance.
        let grown = a >= 1 && self.is_kind(track, a - 1, Entry::is_blank);
        if grown {
            let blank_id = self.entry_id(track, a - 1)?;
            if let Entry::Blank { length } = self.resolve_mut(blank_id)? {
                *length += shift;
            }
        } else {
            let filler = self.arena.insert(Entry::blank(shift));
            self.tracks[track].entries.insert(a, filler);
        }
        self.normalize(track);
        self.index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))
    }

    // -----------------------------------------------------------------------
    // Removing
    // -----------------------------------------------------------------------

    /// Remove the transition at `index`; the previous clip takes its frames.
    pub fn remove_transition(&mut self, track: usize, index: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        self.dissolve_transition(track, index, Absorb::Previous)
    }

    /// Check that the transition at `index` can be dissolved into `absorb`
    /// without changing anything.
    fn check_dissolve(&self, track: usize, index: usize, absorb: Absorb) -> TimelineResult<()> {
        let d = self.transition_at(track, index)?.length();
        let a = index.checked_sub(1).ok_or(TimelineError::InvalidClip { track, index })?;
        let clip_a = self.clip(track, a)?;
        let clip_b = self.clip(track, index + 1)?;
        let fits = match absorb {
            Absorb::Previous => clip_a.source.out_point + d <= clip_a.source.duration,
            Absorb::Next => clip_b.source.in_point - d >= 0,
        };
        if !fits {
            return Err(TimelineError::InvalidTrim {
                track,
                index,
                delta: d,
                reason: "source bounds",
            });
        }
        Ok(())
    }

    /// Remove the transition at `index`, giving its frames to one neighbor.
    pub fn dissolve_transition(&mut self, track: usize, index: usize, absorb: Absorb) -> TimelineResult<()> {
        self.check_dissolve(track, index, absorb)?;
        let d = self.transition_at(track, index)?.length();
        let a = index - 1;
        let b = index + 1;
        match absorb {
            Absorb::Previous => self.clip_mut_at(track, a)?.source.out_point += d,
            Absorb::Next => self.clip_mut_at(track, b)?.source.in_point -= d,
        }

        let id = self.tracks[track].entries.remove(index);
        self.arena.remove(id);
        tracing::debug!(track, transition = index, ?absorb, "Transition dissolved");
        self.emit(TimelineEvent::ClipRemoved { track, clip: index });
        let absorber = match absorb {
            Absorb::Previous => a,
            Absorb::Next => index,
        };
        self.emit(TimelineEvent::ClipChanged {
            track,
            clip: absorber,
        });
        Ok(())
    }

    /// Dissolve the transitions on both sides of a clip; the clip takes their
    /// frames. Returns the clip's new index.
    pub fn remove_transitions_on_clip(&mut self, track: usize, clip: usize) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        self.clip(track, clip)?;
        let id = self.entry_id(track, clip)?;
        let count = self.entry_count(track)?;
        let after = clip + 1 < count && self.is_kind(track, clip + 1, Entry::is_transition);
        let before = clip >= 1 && self.is_kind(track, clip - 1, Entry::is_transition);
        // The two dissolves touch different source points, so both can be
        // checked up front.
        if after {
            self.check_dissolve(track, clip + 1, Absorb::Previous)?;
        }
        if before {
            self.check_dissolve(track, clip - 1, Absorb::Next)?;
        }
        if after {
            self.dissolve_transition(track, clip + 1, Absorb::Previous)?;
        }
        if before {
            self.dissolve_transition(track, clip - 1, Absorb::Next)?;
        }
        self.index_of(track, id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))
    }

    /// Dissolve every transition overlapping or touching `[start, end]`.
    /// A transition starting before `start` goes to its previous clip, any
    /// other to its next clip, so no transition borders the range afterwards.
    pub(crate) fn dissolve_touching(&mut self, track: usize, start: Frames, end: Frames) -> TimelineResult<()> {
        let mut pending = Vec::new();
        let mut pos = 0;
        for id in &self.track(track)?.entries {
            let entry = self.resolve(*id)?;
            let len = entry.length();
            if entry.is_transition() && pos <= end && pos + len >= start {
                let absorb = if pos < start {
                    Absorb::Previous
                } else {
                    Absorb::Next
                };
                pending.push((*id, absorb));
            }
            pos += len;
        }
        for (id, absorb) in &pending {
            if let Some(index) = self.index_of(track, *id) {
                self.check_dissolve(track, index, *absorb)?;
            }
        }
        for (id, absorb) in pending {
            if let Some(index) = self.index_of(track, id) {
                self.dissolve_transition(track, index, absorb)?;
            }
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Trimming
    // -----------------------------------------------------------------------

    /// Move the in-point of the transition before `clip` (B) right by `delta`.
    /// The previous clip grows by `delta` and the transition shrinks.
    pub fn trim_transition_in(&mut self, track: usize, clip: usize, delta: Frames) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        let t_index = clip.checked_sub(1).ok_or(TimelineError::InvalidClip { track, index: clip })?;
        let transition = self.transition_at(track, t_index)?.clone();
        let a = t_index.checked_sub(1).ok_or(TimelineError::InvalidClip { track, index: t_index })?;
        let source_a = self.clip(track, a)?.source.clone();
        if delta == 0 {
            return Ok(());
        }
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: t_index,
            delta,
            reason,
        };
        if transition.length() - delta <= 0 {
            return Err(reject("transition too short"));
        }
        let new_out = source_a.out_point + delta;
        if new_out <= source_a.in_point || new_out > source_a.duration {
            return Err(reject("source bounds"));
        }
        if transition.a.in_point + delta < 0 || transition.b.in_point + delta < 0 {
            return Err(reject("source bounds"));
        }

        self.clip_mut_at(track, a)?.source.out_point = new_out;
        let t_id = self.entry_id(track, t_index)?;
        if let Some(t) = self.resolve_mut(t_id)?.as_transition_mut() {
            t.a.in_point += delta;
            t.b.in_point += delta;
        }
        tracing::debug!(track, clip, delta, "Trim transition in");
        self.emit(TimelineEvent::ClipChanged { track, clip: a });
        self.emit(TimelineEvent::ClipChanged {
            track,
            clip: t_index,
        });
        Ok(())
    }

    /// Move the out-point of the transition after `clip` (A) left by `delta`.
    /// The next clip grows by `delta` and the transition shrinks.
    pub fn trim_transition_out(&mut self, track: usize, clip: usize, delta: Frames) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        let t_index = clip + 1;
        let transition = self.transition_at(track, t_index)?.clone();
        let b = t_index + 1;
        let source_b = self.clip(track, b)?.source.clone();
        if delta == 0 {
            return Ok(());
        }
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: t_index,
            delta,
            reason,
        };
        if transition.length() - delta <= 0 {
            return Err(reject("transition too short"));
        }
        let new_in = source_b.in_point - delta;
        if new_in < 0 || new_in >= source_b.out_point {
            return Err(reject("source bounds"));
        }
        if transition.a.out_point - delta > transition.a.duration
            || transition.b.out_point - delta > transition.b.duration
        {
            return Err(reject("source bounds"));
        }

        self.clip_mut_at(track, b)?.source.in_point = new_in;
        let t_id = self.entry_id(track, t_index)?;
        if let Some(t) = self.resolve_mut(t_id)?.as_transition_mut() {
            t.a.out_point -= delta;
            t.b.out_point -= delta;
        }
        tracing::debug!(track, clip, delta, "Trim transition out");
        self.emit(TimelineEvent::ClipChanged {
            track,
            clip: t_index,
        });
        self.emit(TimelineEvent::ClipChanged { track, clip: b });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Creating by trim
    // -----------------------------------------------------------------------

    /// Drag the in-point of `clip` (B) left by `-delta` over the previous
    /// clip, which must touch it. The previous clip loses its tail to the new
    /// transition. Returns the transition's index (the old index of B).
    pub fn add_transition_by_trim_in(&mut self, track: usize, clip: usize, delta: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        let source_b = self.clip(track, clip)?.source.clone();
        let d = -delta;
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: clip,
            delta,
            reason,
        };
        if d <= 0 {
            return Err(reject("transition needs a negative delta"));
        }
        if clip == 0 || !self.is_kind(track, clip - 1, Entry::is_clip) {
            return Err(TimelineError::NoOverlap { track, clip });
        }
        let a = clip - 1;
        if d >= self.clip(track, a)?.length() {
            return Err(reject("previous clip too short"));
        }
        if source_b.in_point - d < 0 {
            return Err(reject("source bounds"));
        }

        let tail = {
            let clip_a = self.clip_mut_at(track, a)?;
            clip_a.source.out_point -= d;
            let mut tail = clip_a.source.clone();
            tail.in_point = tail.out_point;
            tail.out_point += d;
            tail
        };
        let mut head = source_b;
        head.out_point = head.in_point;
        head.in_point -= d;

        let transition = self.new_transition(tail, head);
        self.insert_transition(track, clip, transition);
        tracing::debug!(track, clip, delta, "Transition added by trim in");
        self.emit(TimelineEvent::TrackReset { track });
        Ok(clip)
    }

    /// Drag the out-point of `clip` (A) right by `-delta` over the next clip,
    /// which must touch it. The next clip loses its head to the new
    /// transition. Returns the transition's index (`clip + 1`).
    pub fn add_transition_by_trim_out(&mut self, track: usize, clip: usize, delta: Frames) -> TimelineResult<usize> {
        self.check_unlocked(track)?;
        let source_a = self.clip(track, clip)?.source.clone();
        let d = -delta;
        let reject = |reason| TimelineError::InvalidTrim {
            track,
            index: clip,
            delta,
            reason,
        };
        if d <= 0 {
            return Err(reject("transition needs a negative delta"));
        }
        if !self.is_kind(track, clip + 1, Entry::is_clip) {
            return Err(TimelineError::NoOverlap { track, clip });
        }
        let b = clip + 1;
        if d >= self.clip(track, b)?.length() {
            return Err(reject("next clip too short"));
        }
        if source_a.out_point + d > source_a.duration {
            return Err(reject("source bounds"));
        }

        let mut tail = source_a;
        tail.in_point = tail.out_point;
        tail.out_point += d;
        let head = {
            let clip_b = self.clip_mut_at(track, b)?;
            let mut head = clip_b.source.clone();
            head.out_point = head.in_point + d;
            clip_b.source.in_point += d;
            head
        };

        let transition = self.new_transition(tail, head);
        self.insert_transition(track, b, transition);
        tracing::debug!(track, clip, delta, "Transition added by trim out");
        self.emit(TimelineEvent::TrackReset { track });
        Ok(b)
    }

    /// Inverse of [`Timeline::add_transition_by_trim_in`].
    pub fn remove_transition_by_trim_in(&mut self, track: usize, transition: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        self.dissolve_transition(track, transition, Absorb::Previous)
    }

    /// Inverse of [`Timeline::add_transition_by_trim_out`].
    pub fn remove_transition_by_trim_out(&mut self, track: usize, transition: usize) -> TimelineResult<()> {
        self.check_unlocked(track)?;
        self.dissolve_transition(track, transition, Absorb::Next)
    }

    // -----------------------------------------------------------------------
    // Service properties
    // -----------------------------------------------------------------------

    pub fn transition_property(&self, id: EntryId, name: &str) -> TimelineResult<Option<&PropertyValue>> {
        match self.resolve(id)? {
            Entry::Transition(t) => Ok(t.service.property(name)),
            _ => Err(TimelineError::StaleEntry(id.to_string())),
        }
    }

    /// Set a property of a transition's blend service. Returns the previous value.
    pub fn set_transition_property(
        &mut self,
        id: EntryId,
        name: &str,
        value: PropertyValue,
    ) -> TimelineResult<Option<PropertyValue>> {
        let previous = match self.resolve_mut(id)? {
            Entry::Transition(t) => t.service.set_property(name, value),
            _ => return Err(TimelineError::StaleEntry(id.to_string())),
        };
        if let Some((track, clip)) = self.locate(id) {
            self.emit(TimelineEvent::ClipChanged { track, clip });
        }
        Ok(previous)
    }
}
