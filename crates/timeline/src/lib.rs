//! `splice-timeline`: Multitrack timeline model for the splice editor.
//!
//! This crate owns the timeline structure and every primitive that mutates
//! it. Commands in `splice-app-state` route all edits through [`Timeline`].
//!
//! - **Model**: tracks of blank / clip / transition entries kept contiguous
//! - **Handles**: entries live in a generational [`EntryArena`]; a stale
//!   [`EntryId`] never resolves to a different entry
//! - **Snapshots**: deep structural copies of a region for exact undo
//! - **Media graph**: the text (de)serialization collaborator
//! - **Events**: change notifications through an [`EventSink`]
//!
//! # Usage
//!
//! ```rust
//! use splice_timeline::{ClipEntry, Timeline};
//! use splice_common::TrackType;
//!
//! let mut timeline = Timeline::default();
//! let track = timeline.add_track(TrackType::Video);
//! timeline.append_clip(track, ClipEntry::whole("a.mp4", 100)).unwrap();
//! timeline.append_clip(track, ClipEntry::whole("b.mp4", 100)).unwrap();
//!
//! // Drag the second clip 20 frames left over the first one.
//! let transition = timeline.add_transition(track, 1, 80).unwrap();
//! assert_eq!(transition, 1);
//! ```

pub mod arena;
pub mod edit;
pub mod entry;
pub mod event;
pub mod filter;
pub mod graph;
pub mod model;
pub mod snapshot;
pub mod track;
pub mod transition;

// Re-export primary API
pub use arena::{EntryArena, EntryId};
pub use entry::{ClipEntry, Entry, Service, SourceRef, TransitionEntry};
pub use event::{ChannelSink, EventSink, NullSink, RecordingSink, TimelineEvent};
pub use filter::{Filter, FilterId, FilterTarget};
pub use graph::{JsonGraph, MediaGraph, Node, PlaylistItem, PlaylistNode};
pub use model::Timeline;
pub use snapshot::{
    EntryRecord, EntryShape, RecordBody, SnapshotHints, SnapshotScope, TimelineSnapshot,
    TrackSnapshot,
};
pub use track::{Track, TrackField, TrackHeader};
pub use transition::Absorb;
