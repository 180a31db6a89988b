//! Turning one registration into per-day records.

use super::models::{CalendarEvent, EventRegistration};
use crate::error::{EngineResult, Error};
use crate::utils::time::{on_date, parse_registration_time, SHORT_TIME_FORMAT};
use chrono::{Duration, NaiveDateTime, NaiveTime};

/// Longest span a single registration may cover, in extra calendar days
pub const MAX_SPAN_DAYS: i64 = 366;

/// Parsed start and optional end of a registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaySpan {
    pub start: NaiveDateTime,
    pub end: Option<NaiveDateTime>,
}

impl DaySpan {
    /// Validate and parse a registration. An empty end means a single day.
    pub fn from_registration(registration: &EventRegistration) -> EngineResult<Self> {
        if registration.summary.trim().is_empty() {
            return Err(Error::InvalidRegistration("summary is empty".to_string()));
        }

        let start = parse_registration_time(&registration.event_start).ok_or_else(|| {
            Error::InvalidRegistration(format!(
                "unparseable start '{}'",
                registration.event_start
            ))
        })?;

        let end = if registration.event_end.trim().is_empty() {
            None
        } else {
            Some(parse_registration_time(&registration.event_end).ok_or_else(|| {
                Error::InvalidRegistration(format!(
                    "unparseable end '{}'",
                    registration.event_end
                ))
            })?)
        };

        let span = Self { start, end };
        if span.extra_days() > MAX_SPAN_DAYS {
            return Err(Error::InvalidRegistration(format!(
                "span of {} days exceeds {}",
                span.extra_days(),
                MAX_SPAN_DAYS
            )));
        }

        Ok(span)
    }

    /// Calendar days covered beyond the first one
    pub fn extra_days(&self) -> i64 {
        self.end
            .map(|end| (end.date() - self.start.date()).num_days().abs())
            .unwrap_or(0)
    }

    /// Start and end of the `index`-th day record, the end pinned to that day
    pub fn day(&self, index: i64) -> (NaiveDateTime, Option<NaiveDateTime>) {
        let start = self.start + Duration::days(index);
        let end = self.end.map(|end| on_date(start.date(), &end));
        (start, end)
    }
}

fn start_label(start: &NaiveDateTime) -> String {
    if start.time() == NaiveTime::MIN {
        t!("calendar.all_day").to_string()
    } else {
        start.format(SHORT_TIME_FORMAT).to_string()
    }
}

fn end_label(end: &NaiveDateTime) -> String {
    if end.time() == NaiveTime::MIN {
        String::new()
    } else {
        end.format(SHORT_TIME_FORMAT).to_string()
    }
}

/// Record for the `index`-th day of a span. The id is left empty.
pub fn day_record(
    registration: &EventRegistration,
    span: &DaySpan,
    index: i64,
    owner_id: &str,
    group_id: &str,
) -> CalendarEvent {
    let (start, end) = span.day(index);
    CalendarEvent {
        id: String::new(),
        event_type: registration.event_type.clone(),
        summary: registration.summary.trim().to_string(),
        description: registration.description.clone(),
        user_id: owner_id.to_string(),
        organizer: registration.organizer.clone(),
        event_start: start,
        event_start_short: start_label(&start),
        event_end: end,
        event_end_short: end.as_ref().map(end_label),
        all_day: start.time() == NaiveTime::MIN,
        group_id: Some(group_id.to_string()),
    }
}

/// One record per calendar day of the span, first day first
pub fn split_into_days(
    registration: &EventRegistration,
    span: &DaySpan,
    owner_id: &str,
    group_id: &str,
) -> Vec<CalendarEvent> {
    (0..=span.extra_days())
        .map(|index| day_record(registration, span, index, owner_id, group_id))
        .collect()
}
