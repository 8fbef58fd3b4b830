//! Central error types for the editor core (thiserror-based).
//!
//! Structural primitives report failures through [`TimelineError`]; commands
//! log these and turn them into no-ops instead of propagating them.

use thiserror::Error;

use crate::types::Frames;

/// Top-level editor error.
#[derive(Error, Debug)]
pub enum EditError {
    #[error("Timeline error: {0}")]
    Timeline(#[from] TimelineError),

    #[error("Media graph error: {0}")]
    Graph(#[from] GraphError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Edit executor has stopped")]
    ExecutorStopped,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Failures of timeline model primitives.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TimelineError {
    #[error("Track index {index} out of range ({count} tracks)")]
    InvalidTrack { index: usize, count: usize },

    #[error("Clip index {index} out of range on track {track}")]
    InvalidClip { track: usize, index: usize },

    #[error("Entry {0} no longer exists")]
    StaleEntry(String),

    #[error("Entry {index} on track {track} is not a {expected}")]
    WrongKind {
        track: usize,
        index: usize,
        expected: &'static str,
    },

    #[error("Track {track} is locked")]
    TrackLocked { track: usize },

    #[error("No overlap to turn into a transition at clip {clip} on track {track}")]
    NoOverlap { track: usize, clip: usize },

    #[error("Invalid trim of entry {index} on track {track} by {delta}: {reason}")]
    InvalidTrim {
        track: usize,
        index: usize,
        delta: Frames,
        reason: &'static str,
    },

    #[error("Cannot split entry {index} on track {track} at {position}")]
    InvalidSplit {
        track: usize,
        index: usize,
        position: Frames,
    },

    #[error("Entry {index} on track {track} cannot be joined with its successor")]
    InvalidJoin { track: usize, index: usize },

    #[error("Invalid timeline position {0}")]
    InvalidPosition(Frames),

    #[error("Source range [{in_point}, {out_point}) of {resource} is empty or out of bounds")]
    InvalidSource {
        resource: String,
        in_point: Frames,
        out_point: Frames,
    },

    #[error("Track {track} has no compositor")]
    NoCompositor { track: usize },

    #[error("Filter {0} not found")]
    FilterNotFound(u64),
}

/// Failures of the media-graph collaborator (serialize / deserialize).
#[derive(Error, Debug)]
pub enum GraphError {
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Expected a {expected} node, found a {found} node")]
    UnexpectedNode {
        expected: &'static str,
        found: &'static str,
    },
}

/// Convenience Result type for timeline primitives.
pub type TimelineResult<T> = Result<T, TimelineError>;

/// Convenience Result type for editor operations.
pub type EditResult<T> = Result<T, EditError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display_messages() {
        let err = TimelineError::InvalidTrack { index: 4, count: 2 };
        assert!(err.to_string().contains("4"));

        let err = TimelineError::InvalidJoin { track: 1, index: 3 };
        let msg = err.to_string();
        assert!(msg.contains("3") && msg.contains("successor"));

        let err = TimelineError::InvalidTrim {
            track: 0,
            index: 2,
            delta: -15,
            reason: "blank too short",
        };
        assert!(err.to_string().contains("blank too short"));
    }

    #[test]
    fn timeline_error_converts_into_edit_error() {
        let err: EditError = TimelineError::TrackLocked { track: 0 }.into();
        assert!(matches!(err, EditError::Timeline(_)));
    }

    #[test]
    fn json_error_conversion() {
        let result: Result<u32, _> = serde_json::from_str("not json");
        let graph_err: GraphError = result.unwrap_err().into();
        assert!(matches!(graph_err, GraphError::Json(_)));
    }
}
