//! Filters attached to clips and tracks.
//!
//! Only parameter values live here; filter processing belongs to the media
//! engine. Filters are stored inline on their owner and carry a [`FilterId`]
//! assigned by the timeline when they are attached.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use splice_common::{KeyframeItem, PropertyValue};

use crate::arena::EntryId;

/// Timeline-unique filter handle. `FilterId(0)` means "not attached yet".
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct FilterId(pub u64);

impl FilterId {
    pub const UNASSIGNED: FilterId = FilterId(0);

    pub fn is_assigned(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "filter:{}", self.0)
    }
}

/// A filter instance with its current parameter values.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: FilterId,
    /// Service name in the media engine (e.g. "brightness").
    pub service: String,
    pub properties: BTreeMap<String, PropertyValue>,
    /// Keyframe curve, ordered by frame. Empty for static filters.
    #[serde(default)]
    pub keyframes: Vec<KeyframeItem>,
}

impl Filter {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            id: FilterId::UNASSIGNED,
            service: service.into(),
            properties: BTreeMap::new(),
            keyframes: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    /// Set a property. Returns the previous value.
    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.properties.insert(name.to_string(), value)
    }
}

/// What a filter is attached to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterTarget {
    Clip(EntryId),
    /// Track by index.
    Track(usize),
}

impl fmt::Display for FilterTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clip(id) => write!(f, "clip {id}"),
            Self::Track(index) => write!(f, "track {index}"),
        }
    }
}
