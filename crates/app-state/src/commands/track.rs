//! Track commands: adding and removing tracks, and header attributes.

use std::any::Any;
use std::sync::Arc;

use splice_common::{CompositeMode, PropertyValue, TrackType};
use splice_timeline::{EntryId, MediaGraph, Node, TimelineEvent, TrackHeader};

use crate::command::{checked, Command, Hook};
use crate::state::EditSession;

/// Add a track of a type. Video-like tracks go on top, audio at the bottom.
#[derive(Debug)]
pub struct AddTrackCommand {
    track_type: TrackType,
    index: Option<usize>,
    text: String,
}

impl AddTrackCommand {
    pub fn new(track_type: TrackType) -> Self {
        Self {
            track_type,
            index: None,
            text: format!("Add {track_type} track"),
        }
    }

    /// Index of the added track after the last apply.
    pub fn index(&self) -> Option<usize> {
        self.index
    }
}

impl Command for AddTrackCommand {
    fn text(&self) -> &str {
        &self.text
    }

    fn redo(&mut self, session: &mut EditSession) {
        let index = session.timeline.add_track(self.track_type);
        tracing::debug!(index, kind = %self.track_type, "Add track");
        self.index = Some(index);
    }

    fn undo(&mut self, session: &mut EditSession) {
        let Some(index) = self.index else {
            tracing::warn!("Undo of a track that was never added");
            return;
        };
        tracing::debug!(index, "Undo add track");
        checked(self.text(), session.timeline.remove_track(index));
        session.selection.prune(&session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Insert an empty track at an index, of the same type as the track it
/// displaces.
#[derive(Debug)]
pub struct InsertTrackCommand {
    index: usize,
    track_type: TrackType,
}

impl InsertTrackCommand {
    pub fn new(session: &EditSession, index: usize) -> Self {
        let track_type = session
            .timeline
            .track(index)
            .map(|t| t.track_type())
            .unwrap_or_default();
        Self { index, track_type }
    }

    pub fn track_type(&self) -> TrackType {
        self.track_type
    }
}

impl Command for InsertTrackCommand {
    fn text(&self) -> &str {
        "Insert track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(index = self.index, kind = %self.track_type, "Insert track");
        checked(
            self.text(),
            session.timeline.insert_track(self.index, self.track_type),
        );
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(index = self.index, "Undo insert track");
        checked(self.text(), session.timeline.remove_track(self.index));
        session.selection.prune(&session.timeline);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Remove a track. Its header, content and filters are captured at
/// construction so undo rebuilds the track in place.
pub struct RemoveTrackCommand {
    graph: Arc<dyn MediaGraph>,
    index: usize,
    header: Option<TrackHeader>,
    content: Option<String>,
}

impl RemoveTrackCommand {
    pub fn new(session: &EditSession, graph: Arc<dyn MediaGraph>, index: usize) -> Self {
        let header = session.timeline.track(index).ok().map(|t| t.header().clone());
        let content = checked("Remove track", session.timeline.track_to_playlist(index)).and_then(|playlist| {
            match graph.serialize(&Node::Playlist(playlist)) {
                Ok(text) => Some(text),
                Err(err) => {
                    tracing::warn!(index, %err, "Cannot serialize track content");
                    None
                }
            }
        });
        Self {
            graph,
            index,
            header,
            content,
        }
    }
}

impl Command for RemoveTrackCommand {
    fn text(&self) -> &str {
        "Remove track"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(index = self.index, "Remove track");
        checked(self.text(), session.timeline.remove_track(self.index));
        session.selection.prune(&session.timeline);
    }

    fn undo(&mut self, session: &mut EditSession) {
        let (Some(header), Some(content)) = (&self.header, &self.content) else {
            tracing::warn!(index = self.index, "Removed track was not captured");
            return;
        };
        tracing::debug!(index = self.index, name = %header.name, "Undo remove track");
        let timeline = &mut session.timeline;
        if checked(self.text(), timeline.insert_track(self.index, header.track_type)).is_none() {
            return;
        }
        let playlist = match self.graph.deserialize(content).and_then(|node| node.into_playlist()) {
            Ok(playlist) => playlist,
            Err(err) => {
                tracing::warn!(index = self.index, %err, "Cannot rebuild track content");
                return;
            }
        };
        checked(self.text(), timeline.append_from_playlist(self.index, &playlist));
        for filter in playlist.filters {
            checked(self.text(), timeline.attach_track_filter(self.index, filter));
        }
        checked(self.text(), timeline.set_track_header(self.index, header.clone()));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Rename a track.
#[derive(Debug)]
pub struct NameTrackCommand {
    track: usize,
    name: String,
    old_name: String,
}

impl NameTrackCommand {
    pub fn new(session: &EditSession, track: usize, name: impl Into<String>) -> Self {
        let old_name = session
            .timeline
            .track(track)
            .map(|t| t.name().to_string())
            .unwrap_or_default();
        Self {
            track,
            name: name.into(),
            old_name,
        }
    }
}

impl Command for NameTrackCommand {
    fn text(&self) -> &str {
        "Change track name"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, name = %self.name, "Rename track");
        checked(self.text(), session.timeline.set_track_name(self.track, &self.name));
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, name = %self.old_name, "Undo rename track");
        checked(self.text(), session.timeline.set_track_name(self.track, &self.old_name));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct MuteTrackCommand {
    track: usize,
    muted: bool,
    old_muted: bool,
}

impl MuteTrackCommand {
    pub fn new(session: &EditSession, track: usize, muted: bool) -> Self {
        let old_muted = session.timeline.track(track).is_ok_and(|t| t.is_muted());
        Self {
            track,
            muted,
            old_muted,
        }
    }
}

impl Command for MuteTrackCommand {
    fn text(&self) -> &str {
        if self.muted {
            "Mute track"
        } else {
            "Unmute track"
        }
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, muted = self.muted, "Mute track");
        checked(self.text(), session.timeline.set_track_mute(self.track, self.muted));
    }

    fn undo(&mut self, session: &mut EditSession) {
        checked(self.text(), session.timeline.set_track_mute(self.track, self.old_muted));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct HideTrackCommand {
    track: usize,
    hidden: bool,
    old_hidden: bool,
}

impl HideTrackCommand {
    pub fn new(session: &EditSession, track: usize, hidden: bool) -> Self {
        let old_hidden = session.timeline.track(track).is_ok_and(|t| t.is_hidden());
        Self {
            track,
            hidden,
            old_hidden,
        }
    }
}

impl Command for HideTrackCommand {
    fn text(&self) -> &str {
        if self.hidden {
            "Hide track"
        } else {
            "Unhide track"
        }
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, hidden = self.hidden, "Hide track");
        checked(self.text(), session.timeline.set_track_hidden(self.track, self.hidden));
    }

    fn undo(&mut self, session: &mut EditSession) {
        checked(self.text(), session.timeline.set_track_hidden(self.track, self.old_hidden));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct LockTrackCommand {
    track: usize,
    locked: bool,
    old_locked: bool,
}

impl LockTrackCommand {
    pub fn new(session: &EditSession, track: usize, locked: bool) -> Self {
        let old_locked = session.timeline.track(track).is_ok_and(|t| t.is_locked());
        Self {
            track,
            locked,
            old_locked,
        }
    }
}

impl Command for LockTrackCommand {
    fn text(&self) -> &str {
        if self.locked {
            "Lock track"
        } else {
            "Unlock track"
        }
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, locked = self.locked, "Lock track");
        checked(self.text(), session.timeline.set_track_lock(self.track, self.locked));
    }

    fn undo(&mut self, session: &mut EditSession) {
        checked(self.text(), session.timeline.set_track_lock(self.track, self.old_locked));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[derive(Debug)]
pub struct CompositeTrackCommand {
    track: usize,
    mode: CompositeMode,
    old_mode: CompositeMode,
}

impl CompositeTrackCommand {
    pub fn new(session: &EditSession, track: usize, mode: CompositeMode) -> Self {
        let old_mode = session
            .timeline
            .track(track)
            .map(|t| t.composite())
            .unwrap_or_default();
        Self {
            track,
            mode,
            old_mode,
        }
    }
}

impl Command for CompositeTrackCommand {
    fn text(&self) -> &str {
        "Change track compositing"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(track = self.track, mode = ?self.mode, "Composite track");
        checked(self.text(), session.timeline.set_track_composite(self.track, self.mode));
    }

    fn undo(&mut self, session: &mut EditSession) {
        checked(self.text(), session.timeline.set_track_composite(self.track, self.old_mode));
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Service whose blend mode a [`ChangeBlendModeCommand`] edits.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BlendTarget {
    /// Compositing transition of a track.
    TrackCompositor(usize),
    /// Service of a transition entry.
    Transition(EntryId),
}

/// Change the blend mode property of a compositor or transition.
///
/// An empty mode is never written. After a mode is written the renderer is
/// asked to refresh and the optional hook receives the mode.
pub struct ChangeBlendModeCommand {
    target: BlendTarget,
    property: String,
    mode: String,
    old_mode: String,
    on_change: Option<Hook<String>>,
}

impl ChangeBlendModeCommand {
    /// Edit the blend property configured for the session's timeline.
    pub fn new(
        session: &EditSession,
        target: BlendTarget,
        mode: impl Into<String>,
        on_change: Option<Hook<String>>,
    ) -> Self {
        let property = session.timeline.blend_property().to_string();
        Self::with_property(session, target, property, mode, on_change)
    }

    pub fn with_property(
        session: &EditSession,
        target: BlendTarget,
        property: impl Into<String>,
        mode: impl Into<String>,
        on_change: Option<Hook<String>>,
    ) -> Self {
        let property = property.into();
        let current = match target {
            BlendTarget::TrackCompositor(track) => session.timeline.compositor_property(track, &property),
            BlendTarget::Transition(id) => session.timeline.transition_property(id, &property),
        };
        let old_mode = match current {
            Ok(value) => value.map(|v| v.to_string()).unwrap_or_default(),
            Err(err) => {
                tracing::warn!(?target, %err, "Blend target has no service");
                String::new()
            }
        };
        Self {
            target,
            property,
            mode: mode.into(),
            old_mode,
            on_change,
        }
    }

    fn apply_mode(&self, session: &mut EditSession, mode: &str) {
        tracing::debug!(target = ?self.target, mode, "Blend mode");
        if mode.is_empty() {
            return;
        }
        let value = PropertyValue::from(mode);
        let timeline = &mut session.timeline;
        let result = match self.target {
            BlendTarget::TrackCompositor(track) => timeline.set_compositor_property(track, &self.property, value),
            BlendTarget::Transition(id) => timeline.set_transition_property(id, &self.property, value),
        };
        if checked(self.text(), result).is_some() {
            timeline.emit(TimelineEvent::Refresh);
            if let Some(hook) = &self.on_change {
                hook(&mode.to_string());
            }
        }
    }
}

impl Command for ChangeBlendModeCommand {
    fn text(&self) -> &str {
        "Change track blend mode"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let mode = self.mode.clone();
        self.apply_mode(session, &mode);
    }

    fn undo(&mut self, session: &mut EditSession) {
        let mode = self.old_mode.clone();
        self.apply_mode(session, &mode);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
