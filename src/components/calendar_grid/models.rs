use crate::components::event_store::CalendarEvent;
use crate::components::google_calendar::{ExternalEvent, ExternalTask};
use crate::utils::time::ItemTime;
use chrono::NaiveDate;
use serde::Serialize;

/// An event from either the local store or the external calendar
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", content = "event", rename_all = "snake_case")]
pub enum EventItem {
    Local(CalendarEvent),
    External(ExternalEvent),
}

impl EventItem {
    pub fn time(&self) -> ItemTime {
        match self {
            EventItem::Local(event) => event.time(),
            EventItem::External(event) => event.start,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            EventItem::Local(event) => &event.summary,
            EventItem::External(event) => &event.summary,
        }
    }
}

/// Anything that can appear in a grid cell
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "item", rename_all = "snake_case")]
pub enum CalendarItem {
    Event(EventItem),
    Task(ExternalTask),
}

impl CalendarItem {
    pub fn time(&self) -> ItemTime {
        match self {
            CalendarItem::Event(event) => event.time(),
            CalendarItem::Task(task) => task.due,
        }
    }

    pub fn date(&self) -> NaiveDate {
        self.time().date()
    }

    pub fn label(&self) -> &str {
        match self {
            CalendarItem::Event(event) => event.label(),
            CalendarItem::Task(task) => &task.title,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DayStatus {
    Previous,
    Current,
    Next,
    Today,
}

/// One day slot of the monthly grid
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalendarDayCell {
    /// Zero-padded day of month
    pub label: String,
    pub date: NaiveDate,
    /// `YYYY. MM. DD.`
    pub date_key: String,
    pub day_name: String,
    pub month_name: String,
    pub status: DayStatus,
    pub items: Vec<CalendarItem>,
}
