//! Track entries: blanks, clips and transitions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use splice_common::{Frames, PropertyValue};

use crate::filter::Filter;

/// Reference to a range of a media source. `out_point` is exclusive.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Resource locator understood by the media engine.
    pub resource: String,
    pub in_point: Frames,
    pub out_point: Frames,
    /// Total length of the source.
    pub duration: Frames,
}

impl SourceRef {
    pub fn new(resource: impl Into<String>, in_point: Frames, out_point: Frames, duration: Frames) -> Self {
        Self {
            resource: resource.into(),
            in_point,
            out_point,
            duration,
        }
    }

    pub fn length(&self) -> Frames {
        self.out_point - self.in_point
    }

    /// Whether the range is non-empty and lies within the source.
    pub fn is_valid(&self) -> bool {
        self.in_point >= 0 && self.in_point < self.out_point && self.out_point <= self.duration
    }
}

/// A named service instance with properties (transition blends, compositors).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    pub name: String,
    pub properties: BTreeMap<String, PropertyValue>,
}

impl Service {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
        }
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties.get(name)
    }

    pub fn set_property(&mut self, name: &str, value: PropertyValue) -> Option<PropertyValue> {
        self.properties.insert(name.to_string(), value)
    }
}

/// A media clip placed on a track.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipEntry {
    pub source: SourceRef,
    pub fade_in: Frames,
    pub fade_out: Frames,
    #[serde(default)]
    pub filters: Vec<Filter>,
    #[serde(default)]
    pub properties: BTreeMap<String, PropertyValue>,
}

impl ClipEntry {
    pub fn new(source: SourceRef) -> Self {
        Self {
            source,
            fade_in: 0,
            fade_out: 0,
            filters: Vec::new(),
            properties: BTreeMap::new(),
        }
    }

    /// Clip covering `[in_point, out_point)` of a source of `duration` frames.
    pub fn from_range(resource: impl Into<String>, in_point: Frames, out_point: Frames, duration: Frames) -> Self {
        Self::new(SourceRef::new(resource, in_point, out_point, duration))
    }

    /// Clip covering a whole source.
    pub fn whole(resource: impl Into<String>, duration: Frames) -> Self {
        Self::from_range(resource, 0, duration, duration)
    }

    pub fn length(&self) -> Frames {
        self.source.length()
    }

    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }
}

/// Overlap region between the tail of the previous clip (`a`) and the head
/// of the next clip (`b`). Both ranges have the transition's length.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransitionEntry {
    pub a: SourceRef,
    pub b: SourceRef,
    pub service: Service,
}

impl TransitionEntry {
    pub fn length(&self) -> Frames {
        self.a.length()
    }
}

/// One element of a track sequence.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Entry {
    Blank { length: Frames },
    Clip(ClipEntry),
    Transition(TransitionEntry),
}

impl Entry {
    pub fn blank(length: Frames) -> Self {
        Self::Blank { length }
    }

    pub fn length(&self) -> Frames {
        match self {
            Self::Blank { length } => *length,
            Self::Clip(clip) => clip.length(),
            Self::Transition(t) => t.length(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Self::Blank { .. })
    }

    pub fn is_clip(&self) -> bool {
        matches!(self, Self::Clip(_))
    }

    pub fn is_transition(&self) -> bool {
        matches!(self, Self::Transition(_))
    }

    pub fn as_clip(&self) -> Option<&ClipEntry> {
        match self {
            Self::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_clip_mut(&mut self) -> Option<&mut ClipEntry> {
        match self {
            Self::Clip(clip) => Some(clip),
            _ => None,
        }
    }

    pub fn as_transition(&self) -> Option<&TransitionEntry> {
        match self {
            Self::Transition(t) => Some(t),
            _ => None,
        }
    }

    pub fn as_transition_mut(&mut self) -> Option<&mut TransitionEntry> {
        match self {
            Self::Transition(t) => Some(t),
            _ => None,
        }
    }

    /// Kind name used in errors and logs.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::Blank { .. } => "blank",
            Self::Clip(_) => "clip",
            Self::Transition(_) => "transition",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lengths() {
        let clip = ClipEntry::from_range("a.mp4", 10, 60, 100);
        assert_eq!(clip.length(), 50);
        assert_eq!(Entry::Clip(clip).length(), 50);
        assert_eq!(Entry::blank(12).length(), 12);
    }

    #[test]
    fn source_validity() {
        assert!(SourceRef::new("a", 0, 10, 10).is_valid());
        assert!(!SourceRef::new("a", 5, 5, 10).is_valid());
        assert!(!SourceRef::new("a", 0, 11, 10).is_valid());
        assert!(!SourceRef::new("a", -1, 5, 10).is_valid());
    }

    #[test]
    fn entry_kinds() {
        let e = Entry::Clip(ClipEntry::whole("a", 10));
        assert!(e.is_clip() && !e.is_blank());
        assert_eq!(e.kind_name(), "clip");
        assert!(Entry::blank(1).as_clip().is_none());
    }
}
