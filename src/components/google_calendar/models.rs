use crate::utils::time::ItemTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub email: Option<String>,
    pub display_name: Option<String>,
    pub response_status: Option<String>,
    #[serde(default)]
    pub optional: bool,
}

/// Read-only event from the external calendar
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalEvent {
    pub id: String,
    pub summary: String,
    pub description: Option<String>,
    pub start: ItemTime,
    pub end: Option<ItemTime>,
    pub organizer_email: Option<String>,
    pub organizer_name: Option<String>,
    pub location: Option<String>,
    pub hangout_link: Option<String>,
    pub attendees: Vec<Attendee>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TaskStatus {
    NeedsAction,
    Completed,
}

/// Read-only task from the external task list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalTask {
    pub id: String,
    pub title: String,
    pub notes: Option<String>,
    pub status: TaskStatus,
    pub due: ItemTime,
    pub web_view_link: Option<String>,
}

impl ExternalTask {
    pub fn is_completed(&self) -> bool {
        self.status == TaskStatus::Completed
    }
}
