use crate::components::google_calendar::{ExternalEvent, ExternalTask};
use crate::utils::time::ItemTime;
use std::fmt;
use std::sync::Arc;

/// Callback fired when a feed item is selected
pub type FeedCallback = Arc<dyn Fn(&FeedSource) + Send + Sync>;

/// The record a feed item was built from
#[derive(Debug, Clone, PartialEq)]
pub enum FeedSource {
    Event(ExternalEvent),
    Task(ExternalTask),
}

impl FeedSource {
    pub fn id(&self) -> &str {
        match self {
            FeedSource::Event(event) => &event.id,
            FeedSource::Task(task) => &task.id,
        }
    }
}

/// Selection handlers for the two kinds of feed items
#[derive(Clone)]
pub struct FeedCallbacks {
    pub on_event: FeedCallback,
    pub on_task: FeedCallback,
}

impl FeedCallbacks {
    pub fn new(
        on_event: impl Fn(&FeedSource) + Send + Sync + 'static,
        on_task: impl Fn(&FeedSource) + Send + Sync + 'static,
    ) -> Self {
        Self {
            on_event: Arc::new(on_event),
            on_task: Arc::new(on_task),
        }
    }

    /// Callbacks that do nothing
    pub fn noop() -> Self {
        Self::new(|_| {}, |_| {})
    }
}

impl Default for FeedCallbacks {
    fn default() -> Self {
        Self::noop()
    }
}

impl fmt::Debug for FeedCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedCallbacks").finish_non_exhaustive()
    }
}

/// One upcoming item of today's feed
#[derive(Clone)]
pub struct FeedItem {
    pub label: String,
    pub time: ItemTime,
    pub source: FeedSource,
    callback: FeedCallback,
}

impl FeedItem {
    pub fn new(label: String, time: ItemTime, source: FeedSource, callback: FeedCallback) -> Self {
        Self {
            label,
            time,
            source,
            callback,
        }
    }

    /// Invoke the selection callback with this item's source record
    pub fn select(&self) {
        (self.callback)(&self.source);
    }
}

impl PartialEq for FeedItem {
    fn eq(&self, other: &Self) -> bool {
        self.label == other.label && self.time == other.time && self.source == other.source
    }
}

impl fmt::Debug for FeedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FeedItem")
            .field("label", &self.label)
            .field("time", &self.time)
            .field("source", &self.source.id())
            .finish()
    }
}
