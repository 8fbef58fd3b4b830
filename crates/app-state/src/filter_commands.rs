//! Filter parameter, keyframe, attach, reorder and clip filter list commands.
//!
//! These commands address filters by [`FilterId`], which survives structural
//! edits of the clip the filter sits on. A filter that is gone when a command
//! runs (its clip was lifted, say) turns the command into a logged no-op.

use std::any::Any;
use std::time::{Duration, Instant};

use splice_common::{EditConfig, EditResult, GraphError, KeyframeItem, PropertyValue};
use splice_timeline::{Filter, FilterId, FilterTarget, Timeline, TimelineEvent};

use crate::command::{checked, Command, UndoId};
use crate::state::EditSession;

fn notify(timeline: &Timeline, filter: FilterId) {
    timeline.emit(TimelineEvent::FilterChanged { filter });
    timeline.emit(TimelineEvent::Refresh);
}

/// Change one named property of a filter between two values.
///
/// Consecutive changes of the same property merge: the first `from` and the
/// latest `to` are kept.
#[derive(Debug)]
pub struct FilterCommand {
    filter: FilterId,
    name: String,
    from: PropertyValue,
    to: PropertyValue,
}

impl FilterCommand {
    pub fn new(
        filter: FilterId,
        name: impl Into<String>,
        from: impl Into<PropertyValue>,
        to: impl Into<PropertyValue>,
    ) -> Self {
        let (from, to) = (from.into(), to.into());
        if from.kind() != to.kind() {
            tracing::warn!(filter = %filter, from = from.kind(), to = to.kind(), "Filter value changes kind");
        }
        Self {
            filter,
            name: name.into(),
            from,
            to,
        }
    }

    pub fn from_value(&self) -> &PropertyValue {
        &self.from
    }

    pub fn to_value(&self) -> &PropertyValue {
        &self.to
    }

    fn set_value(&self, session: &mut EditSession, value: &PropertyValue) {
        tracing::debug!(filter = %self.filter, name = %self.name, %value, "Set filter value");
        let result = session
            .timeline
            .set_filter_property(self.filter, &self.name, value.clone());
        if checked(self.text(), result).is_some() {
            notify(&session.timeline, self.filter);
        }
    }
}

impl Command for FilterCommand {
    fn text(&self) -> &str {
        "Change filter parameter"
    }

    fn redo(&mut self, session: &mut EditSession) {
        self.set_value(session, &self.to);
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.set_value(session, &self.from);
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::Filter)
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        match other.as_any().downcast_ref::<Self>() {
            Some(that) if that.filter == self.filter && that.name == self.name => {
                self.to = that.to.clone();
                true
            }
            _ => false,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Replace the whole keyframe curve of a filter.
///
/// Two keyframe edits of the same filter merge when the second was issued
/// within the merge window of the first.
#[derive(Debug)]
pub struct KeyFrameCommand {
    filter: FilterId,
    from: Vec<KeyframeItem>,
    to: Vec<KeyframeItem>,
    window: Duration,
    issued: Instant,
}

impl KeyFrameCommand {
    pub fn new(filter: FilterId, from: Vec<KeyframeItem>, to: Vec<KeyframeItem>, window: Duration) -> Self {
        Self {
            filter,
            from,
            to,
            window,
            issued: Instant::now(),
        }
    }

    /// Command using the merge window of `config`.
    pub fn with_config(config: &EditConfig, filter: FilterId, from: Vec<KeyframeItem>, to: Vec<KeyframeItem>) -> Self {
        Self::new(filter, from, to, config.keyframe_merge_window())
    }

    pub fn to_curve(&self) -> &[KeyframeItem] {
        &self.to
    }

    fn set_curve(&self, session: &mut EditSession, curve: &[KeyframeItem]) {
        tracing::debug!(filter = %self.filter, keyframes = curve.len(), "Set keyframes");
        let result = session.timeline.set_filter_keyframes(self.filter, curve.to_vec());
        if checked(self.text(), result).is_some() {
            notify(&session.timeline, self.filter);
        }
    }
}

impl Command for KeyFrameCommand {
    fn text(&self) -> &str {
        "Change keyframes"
    }

    fn redo(&mut self, session: &mut EditSession) {
        self.set_curve(session, &self.to);
    }

    fn undo(&mut self, session: &mut EditSession) {
        self.set_curve(session, &self.from);
    }

    fn id(&self) -> Option<UndoId> {
        Some(UndoId::KeyFrame)
    }

    fn merge_with(&mut self, other: &dyn Command) -> bool {
        let Some(that) = other.as_any().downcast_ref::<Self>() else {
            return false;
        };
        if that.filter != self.filter || that.issued.saturating_duration_since(self.issued) > self.window {
            return false;
        }
        self.to = that.to.clone();
        self.issued = that.issued;
        true
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Attach a filter to, or detach one from, a row of a clip or track.
#[derive(Debug)]
pub struct FilterAttachCommand {
    target: FilterTarget,
    row: usize,
    /// The filter while it is detached. Keeps its id across cycles.
    filter: Option<Filter>,
    id: FilterId,
    attach: bool,
}

impl FilterAttachCommand {
    /// Attach `filter` at `row`, or append it when `row` is `None`.
    pub fn attach(target: FilterTarget, filter: Filter, row: Option<usize>) -> Self {
        Self {
            target,
            row: row.unwrap_or(usize::MAX),
            id: filter.id,
            filter: Some(filter),
            attach: true,
        }
    }

    /// Detach the filter currently at `row`.
    pub fn detach(session: &EditSession, target: FilterTarget, row: usize) -> Self {
        let id = checked("Remove filter", session.timeline.filters_of(target))
            .and_then(|filters| filters.get(row))
            .map_or(FilterId::UNASSIGNED, |f| f.id);
        Self {
            target,
            row,
            filter: None,
            id,
            attach: false,
        }
    }

    /// Id of the filter this command moves in and out.
    pub fn filter_id(&self) -> FilterId {
        self.id
    }

    fn attach_now(&mut self, session: &mut EditSession) {
        let Some(filter) = self.filter.take() else {
            tracing::warn!(target = %self.target, "No detached filter to attach");
            return;
        };
        let row = (self.row != usize::MAX).then_some(self.row);
        let timeline = &mut session.timeline;
        match timeline.attach_filter(self.target, filter.clone(), row) {
            Ok(id) => {
                self.id = id;
                if let Some((_, row)) = timeline.filter_owner(id) {
                    self.row = row;
                }
                timeline.emit(TimelineEvent::Refresh);
            }
            Err(err) => {
                tracing::warn!(target = %self.target, %err, "Filter attach rejected");
                self.filter = Some(filter);
            }
        }
    }

    fn detach_now(&mut self, session: &mut EditSession) {
        let timeline = &mut session.timeline;
        let Some((target, row)) = timeline.filter_owner(self.id) else {
            tracing::warn!(filter = %self.id, "Filter to detach not found");
            return;
        };
        if let Some(filter) = checked("Remove filter", timeline.detach_filter(target, row)) {
            self.target = target;
            self.row = row;
            self.filter = Some(filter);
            timeline.emit(TimelineEvent::Refresh);
        }
    }
}

impl Command for FilterAttachCommand {
    fn text(&self) -> &str {
        if self.attach {
            "Add filter"
        } else {
            "Remove filter"
        }
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(target = %self.target, row = self.row, attach = self.attach, "Filter attach");
        if self.attach {
            self.attach_now(session);
        } else {
            self.detach_now(session);
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(target = %self.target, row = self.row, attach = self.attach, "Undo filter attach");
        if self.attach {
            self.detach_now(session);
        } else {
            self.attach_now(session);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Move a filter between rows of its owner.
#[derive(Debug)]
pub struct FilterMoveCommand {
    target: FilterTarget,
    from: usize,
    to: usize,
}

impl FilterMoveCommand {
    pub fn new(target: FilterTarget, from: usize, to: usize) -> Self {
        Self { target, from, to }
    }
}

impl Command for FilterMoveCommand {
    fn text(&self) -> &str {
        "Move filter"
    }

    fn redo(&mut self, session: &mut EditSession) {
        tracing::debug!(target = %self.target, from = self.from, to = self.to, "Move filter");
        if checked(self.text(), session.timeline.move_filter(self.target, self.from, self.to)).is_some() {
            session.timeline.emit(TimelineEvent::Refresh);
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        tracing::debug!(target = %self.target, from = self.from, to = self.to, "Undo move filter");
        if checked(self.text(), session.timeline.move_filter(self.target, self.to, self.from)).is_some() {
            session.timeline.emit(TimelineEvent::Refresh);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Replace the whole filter list of a clip.
///
/// Both lists travel as JSON arrays of filters. After the first apply the
/// `to` list is rewritten with the ids the timeline gave it, so redo brings
/// back the same filter ids and later filter commands keep working.
#[derive(Debug)]
pub struct FilterClipCommand {
    track: usize,
    clip: usize,
    from: String,
    to: String,
}

impl FilterClipCommand {
    pub fn new(track: usize, clip: usize, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            track,
            clip,
            from: from.into(),
            to: to.into(),
        }
    }

    /// Build the command from the clip's current filters and a new list.
    pub fn capture(session: &EditSession, track: usize, clip: usize, to: &[Filter]) -> EditResult<Self> {
        let current = &session.timeline.clip(track, clip)?.filters;
        let from = serde_json::to_string(current).map_err(GraphError::from)?;
        let to = serde_json::to_string(to).map_err(GraphError::from)?;
        Ok(Self::new(track, clip, from, to))
    }

    fn apply(&self, session: &mut EditSession, json: &str) -> Option<Vec<Filter>> {
        let filters: Vec<Filter> = match serde_json::from_str(json) {
            Ok(filters) => filters,
            Err(err) => {
                tracing::warn!(command = self.text(), %err, "Invalid filter list");
                return None;
            }
        };
        tracing::debug!(track = self.track, clip = self.clip, count = filters.len(), "Replace clip filters");
        let target = checked(self.text(), session.timeline.entry_id(self.track, self.clip))?;
        let target = FilterTarget::Clip(target);
        checked(self.text(), session.timeline.replace_filters(target, filters))?;
        session.timeline.emit(TimelineEvent::Refresh);
        Some(session.timeline.filters_of(target).ok()?.to_vec())
    }
}

impl Command for FilterClipCommand {
    fn text(&self) -> &str {
        "Change clip filters"
    }

    fn redo(&mut self, session: &mut EditSession) {
        let to = self.to.clone();
        if let Some(applied) = self.apply(session, &to) {
            match serde_json::to_string(&applied) {
                Ok(json) => self.to = json,
                Err(err) => tracing::warn!(command = self.text(), %err, "Could not keep filter ids"),
            }
        }
    }

    fn undo(&mut self, session: &mut EditSession) {
        let from = self.from.clone();
        self.apply(session, &from);
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::CommandHistory;
    use splice_common::TrackType;
    use splice_timeline::{ClipEntry, RecordingSink};
    use std::sync::Arc;

    fn session() -> (EditSession, Arc<RecordingSink>, FilterId) {
        let sink = Arc::new(RecordingSink::new());
        let mut s = EditSession::with_config(&EditConfig::default(), sink.clone());
        let t = s.timeline.add_track(TrackType::Video);
        s.timeline
            .append_clip(
                t,
                ClipEntry::whole("a.mp4", 50).with_filter(Filter::new("opacity").with_property("opacity", 1.0)),
            )
            .unwrap();
        let id = s.timeline.clip(t, 0).unwrap().filters[0].id;
        sink.clear();
        (s, sink, id)
    }

    fn opacity(s: &EditSession, id: FilterId) -> Option<f64> {
        s.timeline.filter(id)?.property("opacity")?.as_double()
    }

    #[test]
    fn value_change_notifies_once_per_step() {
        let (mut s, sink, id) = session();
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(FilterCommand::new(id, "opacity", 1.0, 0.5)));
        assert_eq!(opacity(&s, id), Some(0.5));
        assert_eq!(sink.count(|e| matches!(e, TimelineEvent::FilterChanged { .. })), 1);
        assert_eq!(sink.count(|e| matches!(e, TimelineEvent::Refresh)), 1);

        sink.clear();
        h.undo(&mut s);
        assert_eq!(opacity(&s, id), Some(1.0));
        assert_eq!(sink.count(|e| *e == TimelineEvent::FilterChanged { filter: id }), 1);
        assert_eq!(sink.count(|e| matches!(e, TimelineEvent::Refresh)), 1);
    }

    #[test]
    fn value_changes_merge_on_same_property() {
        let (mut s, _, id) = session();
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(FilterCommand::new(id, "opacity", 1.0, 0.8)));
        h.push(&mut s, Box::new(FilterCommand::new(id, "opacity", 0.8, 0.3)));
        h.push(&mut s, Box::new(FilterCommand::new(id, "mix", 0_i64, 4_i64)));
        assert_eq!(h.undo_count(), 2);

        h.undo(&mut s);
        let merged = h.top_command().unwrap().as_any().downcast_ref::<FilterCommand>().unwrap();
        assert_eq!(merged.from_value(), &PropertyValue::Double(1.0));
        assert_eq!(merged.to_value(), &PropertyValue::Double(0.3));
        h.undo(&mut s);
        assert_eq!(opacity(&s, id), Some(1.0));
    }

    #[test]
    fn missing_filter_is_a_no_op() {
        let (mut s, sink, _) = session();
        let mut cmd = FilterCommand::new(FilterId(999), "opacity", 1.0, 0.5);
        cmd.redo(&mut s);
        cmd.undo(&mut s);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn keyframes_replace_curve_and_merge_in_window() {
        let (mut s, _, id) = session();
        let curve = |v: f64| vec![KeyframeItem::new(0).with_value("opacity", 1.0), KeyframeItem::new(25).with_value("opacity", v)];
        let mut h = CommandHistory::new(10);
        let window = Duration::from_secs(60);
        h.push(&mut s, Box::new(KeyFrameCommand::new(id, Vec::new(), curve(0.5), window)));
        h.push(&mut s, Box::new(KeyFrameCommand::new(id, curve(0.5), curve(0.2), window)));
        assert_eq!(h.undo_count(), 1);
        assert_eq!(s.timeline.filter(id).unwrap().keyframes, curve(0.2));

        h.undo(&mut s);
        assert!(s.timeline.filter(id).unwrap().keyframes.is_empty());
    }

    #[test]
    fn keyframes_outside_window_do_not_merge() {
        let (mut s, _, id) = session();
        let mut h = CommandHistory::new(10);
        h.push(&mut s, Box::new(KeyFrameCommand::new(id, Vec::new(), vec![KeyframeItem::new(0)], Duration::ZERO)));
        std::thread::sleep(Duration::from_millis(5));
        h.push(
            &mut s,
            Box::new(KeyFrameCommand::new(id, vec![KeyframeItem::new(0)], vec![KeyframeItem::new(5)], Duration::ZERO)),
        );
        assert_eq!(h.undo_count(), 2);
    }

    #[test]
    fn attach_and_detach_keep_filter_id() {
        let (mut s, _, existing) = session();
        let clip = s.timeline.entry_id(0, 0).unwrap();
        let target = FilterTarget::Clip(clip);
        let mut h = CommandHistory::new(10);

        h.push(&mut s, Box::new(FilterAttachCommand::attach(target, Filter::new("blur"), Some(0))));
        let filters = s.timeline.filters_of(target).unwrap();
        assert_eq!(filters.len(), 2);
        assert_eq!(filters[0].service, "blur");
        let blur = filters[0].id;

        h.undo(&mut s);
        assert_eq!(s.timeline.filters_of(target).unwrap().len(), 1);
        h.redo(&mut s);
        assert_eq!(s.timeline.filters_of(target).unwrap()[0].id, blur);

        let detach = FilterAttachCommand::detach(&s, target, 1);
        assert_eq!(detach.filter_id(), existing);
        h.push(&mut s, Box::new(detach));
        assert_eq!(s.timeline.filter(existing), None);
        h.undo(&mut s);
        assert_eq!(s.timeline.filter_owner(existing), Some((target, 1)));
    }

    #[test]
    fn move_filter_and_undo() {
        let (mut s, _, first) = session();
        let t = 0;
        let second = s.timeline.attach_track_filter(t, Filter::new("gain")).unwrap();
        let third = s.timeline.attach_track_filter(t, Filter::new("pan")).unwrap();
        let target = FilterTarget::Track(t);
        let mut cmd = FilterMoveCommand::new(target, 0, 1);
        cmd.redo(&mut s);
        let ids: Vec<_> = s.timeline.track_filters(t).unwrap().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![third, second]);
        cmd.undo(&mut s);
        let ids: Vec<_> = s.timeline.track_filters(t).unwrap().iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![second, third]);
        assert_ne!(first, second);
    }

    #[test]
    fn clip_filter_list_round_trips() {
        let (mut s, sink, opacity_id) = session();
        let target = FilterTarget::Clip(s.timeline.entry_id(0, 0).unwrap());
        let wanted = vec![Filter::new("blur").with_property("radius", 3.0), Filter::new("lut")];
        let cmd = FilterClipCommand::capture(&s, 0, 0, &wanted).unwrap();
        let mut h = CommandHistory::new(10);

        h.push(&mut s, Box::new(cmd));
        let services: Vec<_> = s.timeline.filters_of(target).unwrap().iter().map(|f| f.service.clone()).collect();
        assert_eq!(services, vec!["blur", "lut"]);
        assert_eq!(s.timeline.filter(opacity_id), None);
        let blur = s.timeline.filters_of(target).unwrap()[0].id;
        assert_eq!(sink.count(|e| matches!(e, TimelineEvent::Refresh)), 1);

        h.undo(&mut s);
        let filters = s.timeline.filters_of(target).unwrap();
        assert_eq!(filters.len(), 1);
        assert_eq!(filters[0].id, opacity_id);
        let mut change = FilterCommand::new(opacity_id, "opacity", 1.0, 0.25);
        change.redo(&mut s);
        assert_eq!(opacity(&s, opacity_id), Some(0.25));
        change.undo(&mut s);

        h.redo(&mut s);
        assert_eq!(s.timeline.filters_of(target).unwrap()[0].id, blur);
        assert_eq!(s.timeline.filter(blur).unwrap().property("radius").and_then(|v| v.as_double()), Some(3.0));
    }

    #[test]
    fn invalid_filter_list_is_a_no_op() {
        let (mut s, sink, id) = session();
        let mut cmd = FilterClipCommand::new(0, 0, "[]", "not json");
        cmd.redo(&mut s);
        assert_eq!(s.timeline.clip(0, 0).unwrap().filters[0].id, id);
        assert!(sink.events().is_empty());

        let mut missing = FilterClipCommand::new(0, 7, "[]", "[]");
        missing.redo(&mut s);
        assert_eq!(s.timeline.clip(0, 0).unwrap().filters.len(), 1);
    }
}
