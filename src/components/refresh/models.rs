use crate::components::calendar_grid::CalendarDayCell;
use crate::components::event_store::CalendarEvent;
use crate::components::google_calendar::{ExternalEvent, ExternalTask};
use crate::components::today_feed::FeedItem;
use crate::config::Config;
use chrono::NaiveDateTime;
use std::fmt;
use std::time::Duration;

/// Scheduler tuning taken from the configuration
#[derive(Debug, Clone, PartialEq)]
pub struct EngineSettings {
    pub refresh_interval: Duration,
    pub grace_minutes: i64,
}

impl EngineSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            refresh_interval: Duration::from_secs(config.refresh_interval_secs),
            grace_minutes: config.feed_grace_minutes,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// What started a refresh cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshTrigger {
    Navigation,
    Identity,
    Manual,
    Tick,
}

impl fmt::Display for RefreshTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RefreshTrigger::Navigation => "navigation",
            RefreshTrigger::Identity => "identity",
            RefreshTrigger::Manual => "manual",
            RefreshTrigger::Tick => "tick",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    LocalEvents,
    ExternalEvents,
    ExternalTasks,
}

impl SourceKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SourceKind::LocalEvents => "local events",
            SourceKind::ExternalEvents => "external events",
            SourceKind::ExternalTasks => "external tasks",
        }
    }
}

/// A source that failed during a cycle; its collection in the snapshot is empty
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceWarning {
    pub source: SourceKind,
    pub reason: String,
}

impl SourceWarning {
    pub fn new(source: SourceKind, reason: impl Into<String>) -> Self {
        Self {
            source,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for SourceWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let source = self.source.as_str();
        let reason = &self.reason;
        let message = t!("calendar.source_failed", source = source, reason = reason);
        f.write_str(&message)
    }
}

/// Everything one refresh cycle produced. Grid and feed always come from the
/// same fetch.
#[derive(Debug, Clone, Default)]
pub struct CalendarSnapshot {
    /// Cycle that produced this snapshot; 0 before the first refresh
    pub generation: u64,
    pub year: i32,
    pub month: u32,
    pub grid: Vec<CalendarDayCell>,
    pub today_feed: Vec<FeedItem>,
    pub local_events: Vec<CalendarEvent>,
    pub external_events: Vec<ExternalEvent>,
    pub tasks: Vec<ExternalTask>,
    pub warnings: Vec<SourceWarning>,
    /// False while no external credentials are available; external
    /// collections are then empty without being failures
    pub external_connected: bool,
    pub refreshed_at: Option<NaiveDateTime>,
}

impl CalendarSnapshot {
    /// Whether any source failed in this cycle
    pub fn is_partial(&self) -> bool {
        !self.warnings.is_empty()
    }
}
