//! Track metadata and entry sequence.

use serde::{Deserialize, Serialize};

use splice_common::{CompositeMode, TrackType};

use crate::arena::EntryId;
use crate::entry::Service;
use crate::filter::Filter;

/// Which track attribute changed, carried by change notifications.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackField {
    Name,
    Mute,
    Hidden,
    Lock,
    Composite,
    Compositor,
    Filters,
}

/// A track: metadata plus an ordered sequence of entry handles.
#[derive(Clone, Debug)]
pub struct Track {
    pub(crate) header: TrackHeader,
    pub(crate) filters: Vec<Filter>,
    pub(crate) entries: Vec<EntryId>,
}

/// Everything about a track except its entries and filters.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrackHeader {
    pub track_type: TrackType,
    pub name: String,
    pub muted: bool,
    pub hidden: bool,
    pub locked: bool,
    pub composite: CompositeMode,
    /// Compositing transition blending this track over the tracks below.
    pub compositor: Option<Service>,
}

impl TrackHeader {
    pub fn new(track_type: TrackType, name: impl Into<String>) -> Self {
        Self {
            track_type,
            name: name.into(),
            muted: false,
            hidden: false,
            locked: false,
            composite: CompositeMode::default(),
            compositor: None,
        }
    }
}

impl Track {
    pub(crate) fn new(header: TrackHeader) -> Self {
        Self {
            header,
            filters: Vec::new(),
            entries: Vec::new(),
        }
    }

    pub fn header(&self) -> &TrackHeader {
        &self.header
    }

    pub fn track_type(&self) -> TrackType {
        self.header.track_type
    }

    pub fn name(&self) -> &str {
        &self.header.name
    }

    pub fn is_muted(&self) -> bool {
        self.header.muted
    }

    pub fn is_hidden(&self) -> bool {
        self.header.hidden
    }

    pub fn is_locked(&self) -> bool {
        self.header.locked
    }

    pub fn composite(&self) -> CompositeMode {
        self.header.composite
    }

    pub fn compositor(&self) -> Option<&Service> {
        self.header.compositor.as_ref()
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Entry handles in sequence order.
    pub fn entries(&self) -> &[EntryId] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn position_of(&self, id: EntryId) -> Option<usize> {
        self.entries.iter().position(|e| *e == id)
    }
}
