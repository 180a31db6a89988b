use crate::error::{parse_error, EngineResult, Error};
use chrono::{
    DateTime, Datelike, Duration, Local, Months, NaiveDate, NaiveDateTime, NaiveTime,
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Persisted timestamp format; lexicographic order equals chronological order
pub const STORE_DATETIME_FORMAT: &str = "%Y. %m. %d. %H:%M:%S";
/// Date key used by grid cells and date-prefix matching
pub const DATE_KEY_FORMAT: &str = "%Y. %m. %d.";
/// Short time-of-day label
pub const SHORT_TIME_FORMAT: &str = "%H:%M";

/// Formats accepted for event registration input
const REGISTRATION_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"];

/// When a calendar item happens: at a time of day or the whole day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum ItemTime {
    Timed(NaiveDateTime),
    AllDay(NaiveDate),
}

impl ItemTime {
    /// Build from a timestamp, treating midnight as all-day
    pub fn from_datetime(value: NaiveDateTime) -> Self {
        if value.time() == NaiveTime::MIN {
            ItemTime::AllDay(value.date())
        } else {
            ItemTime::Timed(value)
        }
    }

    pub fn date(&self) -> NaiveDate {
        match self {
            ItemTime::Timed(dt) => dt.date(),
            ItemTime::AllDay(date) => *date,
        }
    }

    pub fn is_all_day(&self) -> bool {
        matches!(self, ItemTime::AllDay(_))
    }

    /// Time-of-day label, or the localized all-day label
    pub fn short_label(&self) -> String {
        match self {
            ItemTime::Timed(dt) => dt.format(SHORT_TIME_FORMAT).to_string(),
            ItemTime::AllDay(_) => t!("calendar.all_day").to_string(),
        }
    }
}

impl Ord for ItemTime {
    /// Timed items first in chronological order, all-day items after them
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (ItemTime::Timed(a), ItemTime::Timed(b)) => a.cmp(b),
            (ItemTime::AllDay(a), ItemTime::AllDay(b)) => a.cmp(b),
            (ItemTime::Timed(_), ItemTime::AllDay(_)) => Ordering::Less,
            (ItemTime::AllDay(_), ItemTime::Timed(_)) => Ordering::Greater,
        }
    }
}

impl PartialOrd for ItemTime {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Source of the current local time
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;

    fn today(&self) -> NaiveDate {
        self.now().date()
    }
}

/// Wall clock in the local timezone
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// Clock frozen at a given instant
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDateTime);

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        self.0
    }
}

/// Parse a registration timestamp (`YYYY-MM-DDTHH:MM`, seconds optional)
pub fn parse_registration_time(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    REGISTRATION_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
}

/// Parse a persisted timestamp
pub fn parse_store_datetime(value: &str) -> EngineResult<NaiveDateTime> {
    NaiveDateTime::parse_from_str(value, STORE_DATETIME_FORMAT)
        .map_err(|e| parse_error(&format!("Failed to parse timestamp '{}': {}", value, e)))
}

pub fn format_store_datetime(value: &NaiveDateTime) -> String {
    value.format(STORE_DATETIME_FORMAT).to_string()
}

pub fn date_key(date: &NaiveDate) -> String {
    date.format(DATE_KEY_FORMAT).to_string()
}

/// Parse an external API `dateTime`, keeping the wall-clock time as written
pub fn parse_external_datetime(value: &str) -> Option<NaiveDateTime> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.naive_local())
        .ok()
        .or_else(|| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S").ok())
}

/// Parse an external API `date`
pub fn parse_external_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").ok()
}

/// First day of the given month
pub fn first_day_of_month(year: i32, month: u32) -> EngineResult<NaiveDate> {
    NaiveDate::from_ymd_opt(year, month, 1).ok_or(Error::InvalidMonth { year, month })
}

/// Last day of the given month
pub fn last_day_of_month(year: i32, month: u32) -> EngineResult<NaiveDate> {
    let first = first_day_of_month(year, month)?;
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .ok_or(Error::InvalidMonth { year, month })
}

/// First day of the month `delta` months away from the given one
pub fn shift_month(year: i32, month: u32, delta: i32) -> EngineResult<NaiveDate> {
    let first = first_day_of_month(year, month)?;
    let shifted = if delta >= 0 {
        first.checked_add_months(Months::new(delta.unsigned_abs()))
    } else {
        first.checked_sub_months(Months::new(delta.unsigned_abs()))
    };
    shifted.ok_or(Error::InvalidMonth { year, month })
}

/// Inclusive timestamp window from the start of `month - before` to the end of `month + after`
pub fn month_window(
    year: i32,
    month: u32,
    before: u32,
    after: u32,
) -> EngineResult<(NaiveDateTime, NaiveDateTime)> {
    let start = shift_month(year, month, -(before as i32))?;
    let last_month = shift_month(year, month, after as i32)?;
    let end = last_day_of_month(last_month.year(), last_month.month())?;
    let end = end
        .and_hms_opt(23, 59, 59)
        .ok_or_else(|| parse_error("Failed to build end of month"))?;
    Ok((start.and_time(NaiveTime::MIN), end))
}

/// Same time of day, moved to another date
pub fn on_date(date: NaiveDate, time_of: &NaiveDateTime) -> NaiveDateTime {
    date.and_time(time_of.time())
}

/// Whether two timestamps lie in the same calendar month
pub fn same_month(a: &NaiveDate, b: &NaiveDate) -> bool {
    a.year() == b.year() && a.month() == b.month()
}

/// Now shifted forward by the grace window
pub fn grace_cutoff(now: NaiveDateTime, grace_minutes: i64) -> NaiveDateTime {
    now + Duration::minutes(grace_minutes)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, min, 0)
            .unwrap()
    }

    #[test]
    fn test_parse_registration_time() {
        assert_eq!(
            parse_registration_time("2025-03-10T09:00"),
            Some(dt(2025, 3, 10, 9, 0))
        );
        assert_eq!(
            parse_registration_time("2025-03-10T09:00:00"),
            Some(dt(2025, 3, 10, 9, 0))
        );
        assert_eq!(parse_registration_time(""), None);
        assert_eq!(parse_registration_time("2025-03-10"), None);
        assert_eq!(parse_registration_time("10.03.2025 09:00"), None);
    }

    #[test]
    fn test_store_format_roundtrip_and_order() {
        let a = dt(2025, 3, 9, 23, 30);
        let b = dt(2025, 3, 10, 8, 0);
        let a_str = format_store_datetime(&a);
        assert_eq!(a_str, "2025. 03. 09. 23:30:00");
        assert_eq!(parse_store_datetime(&a_str).unwrap(), a);
        assert!(a_str < format_store_datetime(&b));
        assert!(parse_store_datetime("2025-03-09").is_err());
    }

    #[test]
    fn test_external_datetime_keeps_wall_clock() {
        assert_eq!(
            parse_external_datetime("2025-03-10T09:15:00+01:00"),
            Some(dt(2025, 3, 10, 9, 15))
        );
        assert_eq!(
            parse_external_datetime("2025-03-10T09:15:00Z"),
            Some(dt(2025, 3, 10, 9, 15))
        );
        assert_eq!(
            parse_external_datetime("2025-03-10T09:15:00"),
            Some(dt(2025, 3, 10, 9, 15))
        );
        assert_eq!(parse_external_datetime("tomorrow"), None);
    }

    #[test]
    fn test_month_bounds() {
        assert_eq!(
            last_day_of_month(2024, 2).unwrap(),
            NaiveDate::from_ymd_opt(2024, 2, 29).unwrap()
        );
        assert_eq!(
            last_day_of_month(2025, 12).unwrap(),
            NaiveDate::from_ymd_opt(2025, 12, 31).unwrap()
        );
        assert!(matches!(
            last_day_of_month(2025, 13),
            Err(Error::InvalidMonth { year: 2025, month: 13 })
        ));
        assert_eq!(
            shift_month(2025, 1, -1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 1).unwrap()
        );
    }

    #[test]
    fn test_month_window_spans_buffer() {
        let (start, end) = month_window(2025, 1, 1, 1).unwrap();
        assert_eq!(start, dt(2024, 12, 1, 0, 0));
        assert_eq!(
            end,
            NaiveDate::from_ymd_opt(2025, 2, 28)
                .unwrap()
                .and_hms_opt(23, 59, 59)
                .unwrap()
        );

        let (start, end) = month_window(2025, 3, 0, 0).unwrap();
        assert_eq!(start, dt(2025, 3, 1, 0, 0));
        assert_eq!(end.date(), NaiveDate::from_ymd_opt(2025, 3, 31).unwrap());
    }

    #[test]
    fn test_item_time_ordering() {
        let timed_late = ItemTime::Timed(dt(2025, 3, 10, 18, 0));
        let timed_early = ItemTime::Timed(dt(2025, 3, 10, 8, 0));
        let all_day = ItemTime::AllDay(NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());

        let mut items = vec![all_day, timed_late, timed_early];
        items.sort();
        assert_eq!(items, vec![timed_early, timed_late, all_day]);
    }

    #[test]
    fn test_midnight_is_all_day() {
        let midnight = ItemTime::from_datetime(dt(2025, 3, 10, 0, 0));
        assert!(midnight.is_all_day());
        assert_eq!(midnight.date(), NaiveDate::from_ymd_opt(2025, 3, 10).unwrap());
        assert!(!ItemTime::from_datetime(dt(2025, 3, 10, 0, 1)).is_all_day());
        assert_eq!(ItemTime::Timed(dt(2025, 3, 10, 9, 5)).short_label(), "09:05");
    }
}
