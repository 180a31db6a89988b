use crate::utils::time::{ItemTime, STORE_DATETIME_FORMAT};
use chrono::{NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of a persisted calendar event
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventType {
    OutOfHome,
    /// Only produced by the external calendar, never persisted by users
    GoogleEvent,
    Holiday,
    DayStart,
    DayEnd,
    Custom(String),
}

impl EventType {
    pub fn as_str(&self) -> &str {
        match self {
            EventType::OutOfHome => "OUT_OF_HOME",
            EventType::GoogleEvent => "GOOGLE_EVENT",
            EventType::Holiday => "HOLIDAY",
            EventType::DayStart => "DAY_START",
            EventType::DayEnd => "DAY_END",
            EventType::Custom(name) => name,
        }
    }

    /// Broadcast types are visible to every user regardless of owner
    pub fn is_broadcast(&self) -> bool {
        matches!(self, EventType::Holiday | EventType::OutOfHome)
    }
}

impl From<String> for EventType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "OUT_OF_HOME" => EventType::OutOfHome,
            "GOOGLE_EVENT" => EventType::GoogleEvent,
            "HOLIDAY" => EventType::Holiday,
            "DAY_START" => EventType::DayStart,
            "DAY_END" => EventType::DayEnd,
            _ => EventType::Custom(value),
        }
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Organizer {
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Administrator,
    Developer,
}

/// The signed-in user as supplied by the identity collaborator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub role: Role,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    /// Whether this user may see the given persisted event
    pub fn can_see(&self, event: &CalendarEvent) -> bool {
        self.role == Role::Administrator
            || event.user_id == self.user_id
            || event.event_type.is_broadcast()
    }
}

/// User-submitted event form. Timestamps use `YYYY-MM-DDTHH:MM`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRegistration {
    pub event_start: String,
    /// Empty means a single-day event without an end
    #[serde(default)]
    pub event_end: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub organizer: Organizer,
}

/// One persisted per-day calendar record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarEvent {
    /// Document id; not part of the stored body
    #[serde(skip)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub summary: String,
    #[serde(default)]
    pub description: Option<String>,
    pub user_id: String,
    pub organizer: Organizer,
    #[serde(with = "store_datetime")]
    pub event_start: NaiveDateTime,
    pub event_start_short: String,
    #[serde(default, with = "store_datetime_opt")]
    pub event_end: Option<NaiveDateTime>,
    #[serde(default)]
    pub event_end_short: Option<String>,
    /// Missing on legacy records, which mark all-day entries with a midnight start
    #[serde(default)]
    pub all_day: bool,
    /// Shared by every day-record of one logical event. Absent on legacy records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

impl CalendarEvent {
    pub fn is_all_day(&self) -> bool {
        self.all_day || self.event_start.time() == NaiveTime::MIN
    }

    pub fn time(&self) -> ItemTime {
        if self.is_all_day() {
            ItemTime::AllDay(self.event_start.date())
        } else {
            ItemTime::Timed(self.event_start)
        }
    }
}

mod store_datetime {
    use super::STORE_DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &NaiveDateTime, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.format(STORE_DATETIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NaiveDateTime::parse_from_str(&raw, STORE_DATETIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

mod store_datetime_opt {
    use super::STORE_DATETIME_FORMAT;
    use chrono::NaiveDateTime;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &Option<NaiveDateTime>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(dt) => serializer.serialize_str(&dt.format(STORE_DATETIME_FORMAT).to_string()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NaiveDateTime>, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(raw) if !raw.is_empty() => NaiveDateTime::parse_from_str(&raw, STORE_DATETIME_FORMAT)
                .map(Some)
                .map_err(serde::de::Error::custom),
            _ => Ok(None),
        }
    }
}
