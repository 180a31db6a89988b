//! Conversion of Google Calendar and Tasks API payloads into normalized records.

use super::models::{Attendee, ExternalEvent, ExternalTask, TaskStatus};
use crate::utils::time::{parse_external_date, parse_external_datetime, ItemTime};
use serde_json::Value;
use tracing::warn;

fn str_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(|v| v.as_str())
        .map(|s| s.to_string())
}

/// `start`/`end` object carrying either `dateTime` or `date`
fn parse_time_object(value: Option<&Value>) -> Option<ItemTime> {
    let object = value?.as_object()?;

    if let Some(date_time) = object.get("dateTime").and_then(|v| v.as_str()) {
        return parse_external_datetime(date_time).map(ItemTime::Timed);
    }

    object
        .get("date")
        .and_then(|v| v.as_str())
        .and_then(parse_external_date)
        .map(ItemTime::AllDay)
}

/// Items of a list response; a missing `items` key is an empty list
pub fn response_items(response: &Value) -> &[Value] {
    response
        .get("items")
        .and_then(|items| items.as_array())
        .map(|items| items.as_slice())
        .unwrap_or(&[])
}

/// Normalize one event. Events without a usable start are dropped.
pub fn normalize_event(item: &Value) -> Option<ExternalEvent> {
    let id = str_field(item, "id").unwrap_or_default();

    let Some(start) = parse_time_object(item.get("start")) else {
        warn!("Dropping external event {} without a parseable start", id);
        return None;
    };
    let end = parse_time_object(item.get("end"));

    let organizer = item.get("organizer");
    let attendees = item
        .get("attendees")
        .and_then(|a| a.as_array())
        .map(|attendees| {
            attendees
                .iter()
                .map(|a| Attendee {
                    email: str_field(a, "email"),
                    display_name: str_field(a, "displayName"),
                    response_status: str_field(a, "responseStatus"),
                    optional: a.get("optional").and_then(|o| o.as_bool()).unwrap_or(false),
                })
                .collect()
        })
        .unwrap_or_default();

    Some(ExternalEvent {
        id,
        summary: str_field(item, "summary").unwrap_or_default(),
        description: str_field(item, "description"),
        start,
        end,
        organizer_email: organizer.and_then(|o| str_field(o, "email")),
        organizer_name: organizer.and_then(|o| str_field(o, "displayName")),
        location: str_field(item, "location"),
        hangout_link: str_field(item, "hangoutLink"),
        attendees,
    })
}

/// Normalize one task. The Tasks API stores only the due date, so a midnight
/// due time is read as all-day. Tasks without a due date are dropped.
pub fn normalize_task(item: &Value) -> Option<ExternalTask> {
    let id = str_field(item, "id").unwrap_or_default();

    let due = str_field(item, "due").and_then(|due| {
        parse_external_datetime(&due)
            .map(ItemTime::from_datetime)
            .or_else(|| parse_external_date(&due).map(ItemTime::AllDay))
    });
    let Some(due) = due else {
        warn!("Dropping external task {} without a parseable due date", id);
        return None;
    };

    let title = str_field(item, "title")
        .filter(|title| !title.trim().is_empty())
        .unwrap_or_else(|| t!("calendar.no_title").to_string());

    let status = match item.get("status").and_then(|s| s.as_str()) {
        Some("completed") => TaskStatus::Completed,
        _ => TaskStatus::NeedsAction,
    };

    Some(ExternalTask {
        id,
        title,
        notes: str_field(item, "notes"),
        status,
        due,
        web_view_link: str_field(item, "webViewLink"),
    })
}
