//! Structural snapshots of a timeline region.
//!
//! A [`TimelineSnapshot`] is a deep copy of the entry sequences of some
//! tracks (or of the whole timeline) keyed by entry id. Restoring it puts the
//! region back exactly as captured, under the same entry ids, so handles that
//! commands captured before an edit resolve again after the edit is undone.

use std::collections::BTreeSet;

use crate::arena::EntryId;
use crate::entry::Entry;
use crate::event::TimelineEvent;
use crate::filter::Filter;
use crate::model::Timeline;
use crate::track::{Track, TrackHeader};

use splice_common::Frames;

/// Which part of the timeline a snapshot covers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SnapshotScope {
    /// Entry sequences of these tracks.
    Tracks(Vec<usize>),
    /// Every track, including headers, track filters and the track count.
    Timeline,
}

impl SnapshotScope {
    pub fn track(index: usize) -> Self {
        Self::Tracks(vec![index])
    }
}

/// Narrows what is copied into a snapshot.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SnapshotHints {
    /// Record only in/out points and fades of clips and transitions. Valid
    /// only when the edit cannot remove or replace a clip or transition.
    pub positions_only: bool,
}

/// Numeric state of a clip or transition, for position-only snapshots.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntryShape {
    Clip {
        in_point: Frames,
        out_point: Frames,
        fade_in: Frames,
        fade_out: Frames,
    },
    Transition {
        a: (Frames, Frames),
        b: (Frames, Frames),
    },
}

#[derive(Clone, Debug, PartialEq)]
pub enum RecordBody {
    Full(Entry),
    Shape(EntryShape),
}

#[derive(Clone, Debug, PartialEq)]
pub struct EntryRecord {
    pub id: EntryId,
    pub body: RecordBody,
}

#[derive(Clone, Debug, PartialEq)]
pub struct TrackSnapshot {
    pub index: usize,
    pub header: TrackHeader,
    pub filters: Vec<Filter>,
    pub entries: Vec<EntryRecord>,
}

/// Immutable copy of a timeline region.
#[derive(Clone, Debug, PartialEq)]
pub struct TimelineSnapshot {
    pub scope: SnapshotScope,
    pub track_count: usize,
    pub tracks: Vec<TrackSnapshot>,
}

fn record(id: EntryId, entry: &Entry, hints: SnapshotHints) -> EntryRecord {
    let body = match entry {
        Entry::Clip(c) if hints.positions_only => RecordBody::Shape(EntryShape::Clip {
            in_point: c.source.in_point,
            out_point: c.source.out_point,
            fade_in: c.fade_in,
            fade_out: c.fade_out,
        }),
        Entry::Transition(t) if hints.positions_only => RecordBody::Shape(EntryShape::Transition {
            a: (t.a.in_point, t.a.out_point),
            b: (t.b.in_point, t.b.out_point),
        }),
        other => RecordBody::Full(other.clone()),
    };
    EntryRecord { id, body }
}

fn apply_shape(entry: &mut Entry, shape: &EntryShape) -> bool {
    match (entry, shape) {
        (
            Entry::Clip(c),
            EntryShape::Clip {
                in_point,
                out_point,
                fade_in,
                fade_out,
            },
        ) => {
            c.source.in_point = *in_point;
            c.source.out_point = *out_point;
            c.fade_in = *fade_in;
            c.fade_out = *fade_out;
            true
        }
        (Entry::Transition(t), EntryShape::Transition { a, b }) => {
            (t.a.in_point, t.a.out_point) = *a;
            (t.b.in_point, t.b.out_point) = *b;
            true
        }
        _ => false,
    }
}

impl TimelineSnapshot {
    /// Capture the region named by `scope`. Invalid track indices are skipped.
    pub fn capture(timeline: &Timeline, scope: SnapshotScope, hints: SnapshotHints) -> Self {
        let indices: Vec<usize> = match &scope {
            SnapshotScope::Tracks(list) => {
                let mut list: Vec<usize> = list
                    .iter()
                    .copied()
                    .filter(|i| *i < timeline.track_count())
                    .collect();
                list.sort_unstable();
                list.dedup();
                list
            }
            SnapshotScope::Timeline => (0..timeline.track_count()).collect(),
        };

        let tracks = indices
            .into_iter()
            .map(|index| {
                let track = &timeline.tracks[index];
                let entries = track
                    .entries
                    .iter()
                    .filter_map(|id| timeline.arena.get(*id).map(|e| record(*id, e, hints)))
                    .collect();
                TrackSnapshot {
                    index,
                    header: track.header.clone(),
                    filters: track.filters.clone(),
                    entries,
                }
            })
            .collect();

        Self {
            scope,
            track_count: timeline.track_count(),
            tracks,
        }
    }

    fn ids(&self) -> BTreeSet<EntryId> {
        self.tracks
            .iter()
            .flat_map(|t| t.entries.iter().map(|r| r.id))
            .collect()
    }

    /// Put the captured region back into `timeline`.
    ///
    /// Entries of the region that are not in the snapshot are freed; entries
    /// that are get their captured value back (or their captured shape for
    /// position-only records); entries that no longer exist are reinstated
    /// under their original id.
    pub fn restore(&self, timeline: &mut Timeline) {
        let whole = self.scope == SnapshotScope::Timeline;
        if whole {
            while timeline.tracks.len() > self.track_count {
                if let Some(track) = timeline.tracks.pop() {
                    timeline.free_entries(&track.entries);
                }
            }
            while timeline.tracks.len() < self.track_count {
                let header = self
                    .tracks
                    .get(timeline.tracks.len())
                    .map(|t| t.header.clone())
                    .unwrap_or_else(|| TrackHeader::new(Default::default(), ""));
                timeline.tracks.push(Track::new(header));
            }
        }

        let keep = self.ids();
        let region: Vec<usize> = self
            .tracks
            .iter()
            .map(|t| t.index)
            .filter(|i| *i < timeline.tracks.len())
            .collect();

        // Free what the edit added to the region.
        for index in &region {
            let stale: Vec<EntryId> = timeline.tracks[*index]
                .entries
                .iter()
                .copied()
                .filter(|id| !keep.contains(id))
                .collect();
            timeline.free_entries(&stale);
        }

        // An entry of the snapshot may have moved outside the region.
        for (index, track) in timeline.tracks.iter_mut().enumerate() {
            if region.contains(&index) {
                continue;
            }
            let before = track.entries.len();
            track.entries.retain(|id| !keep.contains(id));
            if track.entries.len() != before {
                tracing::warn!(track = index, "Snapshot entry found outside the restored region");
            }
        }

        for snap in &self.tracks {
            if snap.index >= timeline.tracks.len() {
                tracing::warn!(track = snap.index, "Snapshot track no longer exists");
                continue;
            }
            let mut entries = Vec::with_capacity(snap.entries.len());
            for rec in &snap.entries {
                match &rec.body {
                    RecordBody::Full(entry) => {
                        timeline.note_entry_filters(entry);
                        let id = timeline.arena.reinstate(rec.id, entry.clone());
                        entries.push(id);
                    }
                    RecordBody::Shape(shape) => match timeline.arena.get_mut(rec.id) {
                        Some(entry) => {
                            if !apply_shape(entry, shape) {
                                tracing::error!(id = %rec.id, "Snapshot shape does not match entry kind");
                            }
                            entries.push(rec.id);
                        }
                        None => {
                            tracing::error!(
                                id = %rec.id,
                                "Position-only snapshot cannot restore a deleted entry"
                            );
                        }
                    },
                }
            }
            let track = &mut timeline.tracks[snap.index];
            track.entries = entries;
            if whole {
                track.header = snap.header.clone();
                track.filters = snap.filters.clone();
                for filter in &snap.filters {
                    timeline.note_filter_id(filter.id);
                }
            }
        }

        tracing::debug!(
            tracks = self.tracks.len(),
            entries = keep.len(),
            whole,
            "Snapshot restored"
        );
        if whole {
            timeline.emit(TimelineEvent::ModelReset);
        } else {
            for snap in &self.tracks {
                timeline.emit(TimelineEvent::TrackReset { track: snap.index });
            }
        }
    }

    /// Rough memory footprint in bytes.
    pub fn estimated_size(&self) -> usize {
        let mut size = std::mem::size_of::<Self>();
        for track in &self.tracks {
            size += std::mem::size_of::<TrackSnapshot>() + track.header.name.len();
            size += track.filters.len() * std::mem::size_of::<Filter>();
            for rec in &track.entries {
                size += std::mem::size_of::<EntryRecord>();
                if let RecordBody::Full(Entry::Clip(c)) = &rec.body {
                    size += c.source.resource.len();
                    size += c.filters.len() * std::mem::size_of::<Filter>();
                }
            }
        }
        size
    }
}
