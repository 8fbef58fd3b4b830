//! Core value types shared by the timeline model and the command layer.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Frame count or frame position on the timeline.
///
/// Signed so that trim deltas and position differences share one type.
pub type Frames = i64;

/// Kind of content a track carries.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackType {
    #[default]
    Video,
    Audio,
    /// Track whose clips only carry filters applied to the tracks below.
    Filter,
    Text,
}

impl TrackType {
    /// Prefix used for default track names ("V1", "A2", ...).
    pub fn name_prefix(self) -> &'static str {
        match self {
            Self::Video => "V",
            Self::Audio => "A",
            Self::Filter => "F",
            Self::Text => "T",
        }
    }

    /// Whether tracks of this type are stacked above the existing tracks
    /// when added (video-like tracks) or below them (audio).
    pub fn stacks_on_top(self) -> bool {
        !matches!(self, Self::Audio)
    }

    /// Whether tracks of this type get a compositing transition.
    pub fn composites(self) -> bool {
        matches!(self, Self::Video | Self::Filter | Self::Text)
    }
}

impl fmt::Display for TrackType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Filter => "filter",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

/// Tri-state compositing switch of a track.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CompositeMode {
    #[default]
    Off,
    /// Composite with the track below only where this track has alpha.
    Partial,
    On,
}

/// Axis-aligned rectangle, used for geometry filter properties.
#[derive(Copy, Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

impl fmt::Display for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} {} {}", self.x, self.y, self.width, self.height)
    }
}
