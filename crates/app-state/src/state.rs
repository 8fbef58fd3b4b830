//! Edit session: the state commands operate on.
//!
//! `EditSession` holds the timeline model, the current selection and the
//! dirty flag. Commands receive it mutably for the duration of one apply or
//! undo; nothing else mutates it in between.

use std::sync::Arc;

use splice_common::EditConfig;
use splice_timeline::{EventSink, Timeline};

use crate::selection::SelectionState;

#[derive(Debug, Default)]
pub struct EditSession {
    pub timeline: Timeline,
    /// Current selection (clips, tracks, keyframes).
    pub selection: SelectionState,
    /// Whether the timeline has unsaved changes.
    pub is_dirty: bool,
}

impl EditSession {
    pub fn new(timeline: Timeline) -> Self {
        Self {
            timeline,
            selection: SelectionState::new(),
            is_dirty: false,
        }
    }

    /// Session over an empty timeline configured from `config`.
    pub fn with_config(config: &EditConfig, sink: Arc<dyn EventSink>) -> Self {
        Self::new(Timeline::with_config(config, sink))
    }

    pub fn mark_dirty(&mut self) {
        if !self.is_dirty {
            tracing::debug!("Session marked dirty");
        }
        self.is_dirty = true;
    }

    pub fn mark_clean(&mut self) {
        self.is_dirty = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use splice_common::TrackType;
    use splice_timeline::RecordingSink;

    #[test]
    fn new_session_is_clean() {
        let session = EditSession::default();
        assert!(!session.is_dirty);
        assert!(session.selection.is_empty());
        assert_eq!(session.timeline.track_count(), 0);
    }

    #[test]
    fn mark_dirty_and_clean() {
        let mut session = EditSession::default();
        session.mark_dirty();
        assert!(session.is_dirty);
        session.mark_clean();
        assert!(!session.is_dirty);
    }

    #[test]
    fn with_config_uses_sink() {
        let sink = Arc::new(RecordingSink::new());
        let mut session = EditSession::with_config(&EditConfig::default(), sink.clone());
        session.timeline.add_track(TrackType::Video);
        assert_eq!(sink.events().len(), 1);
    }
}
