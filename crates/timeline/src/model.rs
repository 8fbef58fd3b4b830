//! The multitrack timeline model.
//!
//! [`Timeline`] is the only mutator of timeline structure. Tracks are
//! addressed by index; entries by index within a track or by [`EntryId`].
//! Clip primitives live in `edit.rs`, transition primitives in
//! `transition.rs`; this file holds the struct, read accessors, the
//! contiguity normalization, filter attachment and track-level operations.
//!
//! Every structural primitive leaves each touched track in normal form:
//! no zero-length entries, no two adjacent blanks, no trailing blank.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use splice_common::{
    is_ordered_curve, CompositeMode, EditConfig, Frames, KeyframeItem, PropertyValue,
    TimelineError, TimelineResult, TrackType, TransitionPreset,
};

use crate::arena::{EntryArena, EntryId};
use crate::entry::{ClipEntry, Entry, Service};
use crate::event::{EventSink, NullSink, TimelineEvent};
use crate::filter::{Filter, FilterId, FilterTarget};
use crate::graph::{PlaylistItem, PlaylistNode};
use crate::track::{Track, TrackField, TrackHeader};

pub struct Timeline {
    pub(crate) tracks: Vec<Track>,
    pub(crate) arena: EntryArena<Entry>,
    next_filter_id: u64,
    pub(crate) transition_preset: TransitionPreset,
    compositor_service: String,
    blend_property: String,
    sink: Arc<dyn EventSink>,
}

impl fmt::Debug for Timeline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Timeline")
            .field("tracks", &self.tracks.len())
            .field("entries", &self.arena.len())
            .field("next_filter_id", &self.next_filter_id)
            .finish()
    }
}

impl Default for Timeline {
    fn default() -> Self {
        Self::new(Arc::new(NullSink))
    }
}

impl Timeline {
    /// Empty timeline with default configuration.
    pub fn new(sink: Arc<dyn EventSink>) -> Self {
        Self::with_config(&EditConfig::default(), sink)
    }

    pub fn with_config(config: &EditConfig, sink: Arc<dyn EventSink>) -> Self {
        Self {
            tracks: Vec::new(),
            arena: EntryArena::new(),
            next_filter_id: 1,
            transition_preset: config.transition.clone(),
            compositor_service: config.compositor_service.clone(),
            blend_property: config.blend_property.clone(),
            sink,
        }
    }

    /// Compositor property that holds a blend mode.
    pub fn blend_property(&self) -> &str {
        &self.blend_property
    }

    pub fn sink(&self) -> &Arc<dyn EventSink> {
        &self.sink
    }

    /// Send a change notification to observers.
    pub fn emit(&self, event: TimelineEvent) {
        tracing::trace!(?event, "Timeline event");
        self.sink.emit(event);
    }

    // -----------------------------------------------------------------------
    // Read accessors
    // -----------------------------------------------------------------------

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, index: usize) -> TimelineResult<&Track> {
        self.tracks.get(index).ok_or(TimelineError::InvalidTrack {
            index,
            count: self.tracks.len(),
        })
    }

    pub fn entry_count(&self, track: usize) -> TimelineResult<usize> {
        Ok(self.track(track)?.entries.len())
    }

    pub fn entry_id(&self, track: usize, index: usize) -> TimelineResult<EntryId> {
        self.track(track)?
            .entries
            .get(index)
            .copied()
            .ok_or(TimelineError::InvalidClip { track, index })
    }

    pub fn entry(&self, track: usize, index: usize) -> TimelineResult<&Entry> {
        let id = self.entry_id(track, index)?;
        self.resolve(id)
    }

    pub fn entry_by_id(&self, id: EntryId) -> Option<&Entry> {
        self.arena.get(id)
    }

    /// The clip at `index`, or `WrongKind` if the entry is a blank or transition.
    pub fn clip(&self, track: usize, index: usize) -> TimelineResult<&ClipEntry> {
        self.entry(track, index)?
            .as_clip()
            .ok_or(TimelineError::WrongKind {
                track,
                index,
                expected: "clip",
            })
    }

    pub fn index_of(&self, track: usize, id: EntryId) -> Option<usize> {
        self.tracks.get(track)?.position_of(id)
    }

    /// Track and index of the entry behind `id`.
    pub fn locate(&self, id: EntryId) -> Option<(usize, usize)> {
        self.tracks
            .iter()
            .enumerate()
            .find_map(|(t, track)| track.position_of(id).map(|i| (t, i)))
    }

    /// Timeline position of the first frame of entry `index`.
    pub fn entry_start(&self, track: usize, index: usize) -> TimelineResult<Frames> {
        let t = self.track(track)?;
        if index > t.entries.len() {
            return Err(TimelineError::InvalidClip { track, index });
        }
        let mut start = 0;
        for id in &t.entries[..index] {
            start += self.resolve(*id)?.length();
        }
        Ok(start)
    }

    pub fn track_length(&self, track: usize) -> TimelineResult<Frames> {
        let count = self.entry_count(track)?;
        self.entry_start(track, count)
    }

    /// Index of the entry covering `position`, if any.
    pub fn entry_at(&self, track: usize, position: Frames) -> TimelineResult<Option<usize>> {
        let t = self.track(track)?;
        let mut start = 0;
        for (i, id) in t.entries.iter().enumerate() {
            let end = start + self.resolve(*id)?.length();
            if position >= start && position < end {
                return Ok(Some(i));
            }
            start = end;
        }
        Ok(None)
    }

    // -----------------------------------------------------------------------
    // Internal helpers
    // -----------------------------------------------------------------------

    pub(crate) fn resolve(&self, id: EntryId) -> TimelineResult<&Entry> {
        self.arena
            .get(id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))
    }

    pub(crate) fn resolve_mut(&mut self, id: EntryId) -> TimelineResult<&mut Entry> {
        self.arena
            .get_mut(id)
            .ok_or_else(|| TimelineError::StaleEntry(id.to_string()))
    }

    pub(crate) fn check_unlocked(&self, track: usize) -> TimelineResult<()> {
        if self.track(track)?.header.locked {
            tracing::warn!(track, "Edit rejected on locked track");
            return Err(TimelineError::TrackLocked { track });
        }
        Ok(())
    }

    pub(crate) fn clip_mut_at(&mut self, track: usize, index: usize) -> TimelineResult<&mut ClipEntry> {
        let id = self.entry_id(track, index)?;
        self.resolve_mut(id)?
            .as_clip_mut()
            .ok_or(TimelineError::WrongKind {
                track,
                index,
                expected: "clip",
            })
    }

    pub(crate) fn is_kind(&self, track: usize, index: usize, pred: fn(&Entry) -> bool) -> bool {
        self.entry(track, index).map_or(false, pred)
    }

    /// Store a new clip, giving its filters timeline-unique ids.
    pub(crate) fn alloc_clip(&mut self, mut clip: ClipEntry) -> EntryId {
        for filter in &mut clip.filters {
            if !filter.id.is_assigned() || self.filter(filter.id).is_some() {
                filter.id = self.fresh_filter_id();
            } else {
                self.note_filter_id(filter.id);
            }
        }
        self.arena.insert(Entry::Clip(clip))
    }

    pub(crate) fn fresh_filter_id(&mut self) -> FilterId {
        let id = FilterId(self.next_filter_id);
        self.next_filter_id += 1;
        id
    }

    /// Keep the id counter ahead of ids that enter the timeline from outside.
    pub(crate) fn note_filter_id(&mut self, id: FilterId) {
        if id.0 >= self.next_filter_id {
            self.next_filter_id = id.0 + 1;
        }
    }

    pub(crate) fn note_entry_filters(&mut self, entry: &Entry) {
        if let Entry::Clip(clip) = entry {
            for filter in &clip.filters {
                self.note_filter_id(filter.id);
            }
        }
    }

    /// Check a clip before it enters the timeline.
    pub(crate) fn validate_clip(clip: &ClipEntry) -> TimelineResult<()> {
        if clip.source.is_valid() {
            Ok(())
        } else {
            Err(TimelineError::InvalidSource {
                resource: clip.source.resource.clone(),
                in_point: clip.source.in_point,
                out_point: clip.source.out_point,
            })
        }
    }

    /// Restore contiguity normal form on one track.
    pub(crate) fn normalize(&mut self, track: usize) {
        let Some(t) = self.tracks.get_mut(track) else {
            return;
        };
        let ids = std::mem::take(&mut t.entries);
        let mut out: Vec<EntryId> = Vec::with_capacity(ids.len());

        for id in ids {
            let Some(entry) = self.arena.get(id) else {
                tracing::warn!(track, id = %id, "Dropping stale entry during normalize");
                continue;
            };
            let length = entry.length();
            let is_blank = entry.is_blank();

            if length <= 0 {
                self.arena.remove(id);
                continue;
            }
            if is_blank {
                if let Some(&prev) = out.last() {
                    if let Some(Entry::Blank { length: prev_len }) = self.arena.get_mut(prev) {
                        *prev_len += length;
                        self.arena.remove(id);
                        continue;
                    }
                }
            }
            out.push(id);
        }

        while let Some(&last) = out.last() {
            if self.arena.get(last).map_or(false, Entry::is_blank) {
                out.pop();
                self.arena.remove(last);
            } else {
                break;
            }
        }

        self.tracks[track].entries = out;
    }

    /// Free every entry of a track sequence.
    pub(crate) fn free_entries(&mut self, ids: &[EntryId]) {
        for id in ids {
            self.arena.remove(*id);
        }
    }

    // -----------------------------------------------------------------------
    // Filters
    // -----------------------------------------------------------------------

    /// Owner and row of a filter.
    pub fn filter_owner(&self, id: FilterId) -> Option<(FilterTarget, usize)> {
        for (t, track) in self.tracks.iter().enumerate() {
            if let Some(row) = track.filters.iter().position(|f| f.id == id) {
                return Some((FilterTarget::Track(t), row));
            }
            for entry_id in &track.entries {
                let Some(Entry::Clip(clip)) = self.arena.get(*entry_id) else {
                    continue;
                };
                if let Some(row) = clip.filters.iter().position(|f| f.id == id) {
                    return Some((FilterTarget::Clip(*entry_id), row));
                }
            }
        }
        None
    }

    pub fn filter(&self, id: FilterId) -> Option<&Filter> {
        let (target, row) = self.filter_owner(id)?;
        self.filters_of(target).ok()?.get(row)
    }

    pub fn filter_mut(&mut self, id: FilterId) -> Option<&mut Filter> {
        let (target, row) = self.filter_owner(id)?;
        self.filters_mut(target).ok()?.get_mut(row)
    }

    pub fn filters_of(&self, target: FilterTarget) -> TimelineResult<&[Filter]> {
        match target {
            FilterTarget::Track(track) => Ok(&self.track(track)?.filters),
            FilterTarget::Clip(id) => match self.resolve(id)? {
                Entry::Clip(clip) => Ok(&clip.filters),
                _ => Err(self.not_a_clip(id)),
            },
        }
    }

    fn filters_mut(&mut self, target: FilterTarget) -> TimelineResult<&mut Vec<Filter>> {
        match target {
            FilterTarget::Track(track) => {
                let count = self.tracks.len();
                self.tracks
                    .get_mut(track)
                    .map(|t| &mut t.filters)
                    .ok_or(TimelineError::InvalidTrack { index: track, count })
            }
            FilterTarget::Clip(id) => {
                let err = self.not_a_clip(id);
                match self.resolve_mut(id)? {
                    Entry::Clip(clip) => Ok(&mut clip.filters),
                    _ => Err(err),
                }
            }
        }
    }

    fn not_a_clip(&self, id: EntryId) -> TimelineError {
        match self.locate(id) {
            Some((track, index)) => TimelineError::WrongKind {
                track,
                index,
                expected: "clip",
            },
            None => TimelineError::StaleEntry(id.to_string()),
        }
    }

    fn emit_filters_changed(&self, target: FilterTarget) {
        match target {
            FilterTarget::Track(track) => self.emit(TimelineEvent::TrackChanged {
                track,
                field: TrackField::Filters,
            }),
            FilterTarget::Clip(id) => {
                if let Some((track, clip)) = self.locate(id) {
                    self.emit(TimelineEvent::ClipChanged { track, clip });
                }
            }
        }
    }

    /// Attach a filter at `row` (appended when `None` or past the end).
    ///
    /// A filter without an id, or whose id is already used, gets a fresh one.
    pub fn attach_filter(
        &mut self,
        target: FilterTarget,
        mut filter: Filter,
        row: Option<usize>,
    ) -> TimelineResult<FilterId> {
        if !filter.id.is_assigned() || self.filter(filter.id).is_some() {
            filter.id = self.fresh_filter_id();
        } else {
            self.note_filter_id(filter.id);
        }
        let id = filter.id;
        let service = filter.service.clone();
        let filters = self.filters_mut(target)?;
        let row = row.unwrap_or(filters.len()).min(filters.len());
        filters.insert(row, filter);
        tracing::debug!(target = %target, filter = %id, service = %service, row, "Filter attached");
        self.emit_filters_changed(target);
        Ok(id)
    }

    /// Detach the filter at `row` and return it.
    pub fn detach_filter(&mut self, target: FilterTarget, row: usize) -> TimelineResult<Filter> {
        let filters = self.filters_mut(target)?;
        if row >= filters.len() {
            return Err(TimelineError::InvalidPosition(row as Frames));
        }
        let filter = filters.remove(row);
        tracing::debug!(target = %target, filter = %filter.id, row, "Filter detached");
        self.emit_filters_changed(target);
        Ok(filter)
    }

    /// Move a filter from one row to another within its owner.
    pub fn move_filter(&mut self, target: FilterTarget, from: usize, to: usize) -> TimelineResult<()> {
        let filters = self.filters_mut(target)?;
        if from >= filters.len() || to >= filters.len() {
            return Err(TimelineError::InvalidPosition(from.max(to) as Frames));
        }
        let filter = filters.remove(from);
        filters.insert(to, filter);
        tracing::debug!(target = %target, from, to, "Filter moved");
        self.emit_filters_changed(target);
        Ok(())
    }

    /// Replace every filter of `target` and return the ones it had.
    ///
    /// Ids are kept when no other filter of the timeline uses them; unset or
    /// taken ids are replaced with fresh ones.
    pub fn replace_filters(&mut self, target: FilterTarget, mut filters: Vec<Filter>) -> TimelineResult<Vec<Filter>> {
        let previous = std::mem::take(self.filters_mut(target)?);
        let mut seen = BTreeSet::new();
        for filter in &mut filters {
            if !filter.id.is_assigned() || self.filter(filter.id).is_some() || !seen.insert(filter.id) {
                filter.id = self.fresh_filter_id();
                seen.insert(filter.id);
            } else {
                self.note_filter_id(filter.id);
            }
        }
        let count = filters.len();
        *self.filters_mut(target)? = filters;
        tracing::debug!(target = %target, count, replaced = previous.len(), "Filters replaced");
        self.emit_filters_changed(target);
        Ok(previous)
    }

    /// Append a filter to a track.
    pub fn attach_track_filter(&mut self, track: usize, filter: Filter) -> TimelineResult<FilterId> {
        self.attach_filter(FilterTarget::Track(track), filter, None)
    }

    pub fn track_filters(&self, track: usize) -> TimelineResult<&[Filter]> {
        Ok(&self.track(track)?.filters)
    }

    /// Set one property of a filter. Returns the previous value.
    pub fn set_filter_property(
        &mut self,
        id: FilterId,
        name: &str,
        value: PropertyValue,
    ) -> TimelineResult<Option<PropertyValue>> {
        let filter = self
            .filter_mut(id)
            .ok_or(TimelineError::FilterNotFound(id.0))?;
        Ok(filter.set_property(name, value))
    }

    /// Replace the keyframe curve of a filter. Returns the previous curve.
    pub fn set_filter_keyframes(
        &mut self,
        id: FilterId,
        keyframes: Vec<KeyframeItem>,
    ) -> TimelineResult<Vec<KeyframeItem>> {
        if !is_ordered_curve(&keyframes) {
            tracing::warn!(filter = %id, "Keyframe curve is not ordered by frame");
        }
        let filter = self
            .filter_mut(id)
            .ok_or(TimelineError::FilterNotFound(id.0))?;
        Ok(std::mem::replace(&mut filter.keyframes, keyframes))
    }

    // -----------------------------------------------------------------------
    // Track operations
    // -----------------------------------------------------------------------

    fn default_header(&self, track_type: TrackType) -> TrackHeader {
        let same = self
            .tracks
            .iter()
            .filter(|t| t.header.track_type == track_type)
            .count();
        let mut header = TrackHeader::new(
            track_type,
            format!("{}{}", track_type.name_prefix(), same + 1),
        );
        if track_type.composites() {
            header.compositor = Some(Service::new(self.compositor_service.clone()));
        }
        header
    }

    /// Add a track of `track_type`. Video-like tracks go on top (index 0),
    /// audio tracks at the bottom. Returns the new track index.
    pub fn add_track(&mut self, track_type: TrackType) -> usize {
        let index = if track_type.stacks_on_top() {
            0
        } else {
            self.tracks.len()
        };
        let header = self.default_header(track_type);
        tracing::debug!(index, name = %header.name, kind = %track_type, "Track added");
        self.tracks.insert(index, Track::new(header));
        self.emit(TimelineEvent::TrackAdded { track: index });
        index
    }

    /// Insert an empty track at `index`. Tracks at `index` and above shift up.
    pub fn insert_track(&mut self, index: usize, track_type: TrackType) -> TimelineResult<()> {
        if index > self.tracks.len() {
            return Err(TimelineError::InvalidTrack {
                index,
                count: self.tracks.len(),
            });
        }
        let header = self.default_header(track_type);
        tracing::debug!(index, name = %header.name, kind = %track_type, "Track inserted");
        self.tracks.insert(index, Track::new(header));
        self.emit(TimelineEvent::TrackAdded { track: index });
        Ok(())
    }

    /// Remove a track and free its entries. Tracks above `index` shift down.
    pub fn remove_track(&mut self, index: usize) -> TimelineResult<()> {
        self.track(index)?;
        let track = self.tracks.remove(index);
        self.free_entries(&track.entries);
        tracing::debug!(index, name = %track.header.name, "Track removed");
        self.emit(TimelineEvent::TrackRemoved { track: index });
        Ok(())
    }

    fn update_header(
        &mut self,
        track: usize,
        field: TrackField,
        f: impl FnOnce(&mut TrackHeader),
    ) -> TimelineResult<()> {
        let count = self.tracks.len();
        let t = self
            .tracks
            .get_mut(track)
            .ok_or(TimelineError::InvalidTrack { index: track, count })?;
        f(&mut t.header);
        tracing::debug!(track, ?field, "Track changed");
        self.emit(TimelineEvent::TrackChanged { track, field });
        Ok(())
    }

    pub fn set_track_name(&mut self, track: usize, name: &str) -> TimelineResult<()> {
        self.update_header(track, TrackField::Name, |h| h.name = name.to_string())
    }

    pub fn set_track_mute(&mut self, track: usize, muted: bool) -> TimelineResult<()> {
        self.update_header(track, TrackField::Mute, |h| h.muted = muted)
    }

    pub fn set_track_hidden(&mut self, track: usize, hidden: bool) -> TimelineResult<()> {
        self.update_header(track, TrackField::Hidden, |h| h.hidden = hidden)
    }

    pub fn set_track_lock(&mut self, track: usize, locked: bool) -> TimelineResult<()> {
        self.update_header(track, TrackField::Lock, |h| h.locked = locked)
    }

    pub fn set_track_composite(&mut self, track: usize, mode: CompositeMode) -> TimelineResult<()> {
        self.update_header(track, TrackField::Composite, |h| h.composite = mode)
    }

    /// Replace every header attribute at once (used when rebuilding a track).
    pub fn set_track_header(&mut self, track: usize, header: TrackHeader) -> TimelineResult<()> {
        self.update_header(track, TrackField::Name, |h| *h = header)
    }

    pub fn compositor_property(&self, track: usize, name: &str) -> TimelineResult<Option<&PropertyValue>> {
        let service = self
            .track(track)?
            .header
            .compositor
            .as_ref()
            .ok_or(TimelineError::NoCompositor { track })?;
        Ok(service.property(name))
    }

    /// Set a property of the track compositor. Returns the previous value.
    pub fn set_compositor_property(
        &mut self,
        track: usize,
        name: &str,
        value: PropertyValue,
    ) -> TimelineResult<Option<PropertyValue>> {
        let count = self.tracks.len();
        let t = self
            .tracks
            .get_mut(track)
            .ok_or(TimelineError::InvalidTrack { index: track, count })?;
        let service = t
            .header
            .compositor
            .as_mut()
            .ok_or(TimelineError::NoCompositor { track })?;
        let previous = service.set_property(name, value);
        self.emit(TimelineEvent::TrackChanged {
            track,
            field: TrackField::Compositor,
        });
        Ok(previous)
    }

    /// Serializable copy of a track's content, with entry ids.
    pub fn track_to_playlist(&self, track: usize) -> TimelineResult<PlaylistNode> {
        let t = self.track(track)?;
        let mut entries = Vec::with_capacity(t.entries.len());
        for id in &t.entries {
            entries.push(PlaylistItem {
                id: Some(*id),
                entry: self.resolve(*id)?.clone(),
            });
        }
        Ok(PlaylistNode {
            name: t.header.name.clone(),
            track_type: t.header.track_type,
            entries,
            filters: t.filters.clone(),
        })
    }

    /// Append the entries of a playlist to a track.
    ///
    /// Entry ids recorded in the playlist are reused when they are free.
    /// The playlist's own filters are not attached; callers re-attach them
    /// with [`Timeline::attach_track_filter`].
    pub fn append_from_playlist(&mut self, track: usize, playlist: &PlaylistNode) -> TimelineResult<()> {
        self.track(track)?;
        let live: BTreeSet<EntryId> = self.tracks.iter().flat_map(|t| t.entries.iter().copied()).collect();

        for item in &playlist.entries {
            let id = match item.id {
                Some(id) if !live.contains(&id) && !self.arena.contains(id) => {
                    self.note_entry_filters(&item.entry);
                    self.arena.reinstate(id, item.entry.clone())
                }
                _ => match &item.entry {
                    Entry::Clip(clip) => self.alloc_clip(clip.clone()),
                    other => self.arena.insert(other.clone()),
                },
            };
            self.tracks[track].entries.push(id);
        }
        self.normalize(track);
        tracing::debug!(
            track,
            entries = playlist.entries.len(),
            "Appended entries from playlist"
        );
        self.emit(TimelineEvent::TrackReset { track });
        Ok(())
    }
}
