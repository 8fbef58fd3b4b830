//! Change notifications emitted by the timeline.
//!
//! The timeline owns one [`EventSink`] and reports every visible mutation to
//! it, including mutations performed while undoing. Sinks are shared handles
//! so a view can keep its end while the timeline lives on the edit thread.

use crossbeam::channel::{self, Receiver, Sender};
use parking_lot::Mutex;

use crate::filter::FilterId;
use crate::track::TrackField;

/// A change observers should react to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimelineEvent {
    ClipInserted { track: usize, clip: usize },
    ClipRemoved { track: usize, clip: usize },
    /// Content or length of an entry changed.
    ClipChanged { track: usize, clip: usize },
    /// Neighbor notification: the in-point of `clip` moved.
    ClipInChanged { track: usize, clip: usize },
    /// Neighbor notification: the out-point of `clip` moved.
    ClipOutChanged { track: usize, clip: usize },
    /// The whole entry sequence of a track must be re-read.
    TrackReset { track: usize },
    TrackAdded { track: usize },
    TrackRemoved { track: usize },
    TrackChanged { track: usize, field: TrackField },
    FilterChanged { filter: FilterId },
    /// Ask the renderer to refresh the current frame.
    Refresh,
    /// The track list itself was replaced.
    ModelReset,
}

/// Receiver of timeline notifications.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: TimelineEvent);
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: TimelineEvent) {}
}

/// Keeps every event in memory. Used by tests and headless tools.
#[derive(Debug, Default)]
pub struct RecordingSink {
    events: Mutex<Vec<TimelineEvent>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of the events received so far.
    pub fn events(&self) -> Vec<TimelineEvent> {
        self.events.lock().clone()
    }

    /// Drain the recorded events.
    pub fn take(&self) -> Vec<TimelineEvent> {
        std::mem::take(&mut *self.events.lock())
    }

    pub fn count(&self, pred: impl Fn(&TimelineEvent) -> bool) -> usize {
        self.events.lock().iter().filter(|e| pred(e)).count()
    }

    pub fn clear(&self) {
        self.events.lock().clear();
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, event: TimelineEvent) {
        self.events.lock().push(event);
    }
}

/// Forwards events over a crossbeam channel to another thread.
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: Sender<TimelineEvent>,
}

impl ChannelSink {
    pub fn new(tx: Sender<TimelineEvent>) -> Self {
        Self { tx }
    }

    /// Create a sink and the receiving end of its channel.
    pub fn unbounded() -> (Self, Receiver<TimelineEvent>) {
        let (tx, rx) = channel::unbounded();
        (Self { tx }, rx)
    }
}

impl EventSink for ChannelSink {
    fn emit(&self, event: TimelineEvent) {
        if self.tx.send(event).is_err() {
            tracing::trace!("Event receiver dropped");
        }
    }
}
