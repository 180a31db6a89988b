use super::models::{CalendarDayCell, CalendarItem, DayStatus, EventItem};
use crate::components::google_calendar::ExternalTask;
use crate::error::{EngineResult, Error};
use crate::utils::time::{date_key, first_day_of_month, last_day_of_month};
use chrono::{Datelike, Days, NaiveDate, Weekday};
use std::collections::HashMap;

/// Localized full weekday name
pub fn weekday_name(weekday: Weekday) -> String {
    match weekday {
        Weekday::Mon => t!("weekday.mon"),
        Weekday::Tue => t!("weekday.tue"),
        Weekday::Wed => t!("weekday.wed"),
        Weekday::Thu => t!("weekday.thu"),
        Weekday::Fri => t!("weekday.fri"),
        Weekday::Sat => t!("weekday.sat"),
        Weekday::Sun => t!("weekday.sun"),
    }
    .to_string()
}

/// Localized short month name, `month` in 1..=12
pub fn month_short_name(month: u32) -> String {
    match month {
        1 => t!("month_short.1"),
        2 => t!("month_short.2"),
        3 => t!("month_short.3"),
        4 => t!("month_short.4"),
        5 => t!("month_short.5"),
        6 => t!("month_short.6"),
        7 => t!("month_short.7"),
        8 => t!("month_short.8"),
        9 => t!("month_short.9"),
        10 => t!("month_short.10"),
        11 => t!("month_short.11"),
        _ => t!("month_short.12"),
    }
    .to_string()
}

/// Build the whole-week grid for `year`/`month` (weeks start on Monday).
///
/// Leading days of the previous month and trailing days of the next month fill
/// the first and last week. Items land on the cell of their date; within a cell
/// timed items come first in chronological order and all-day items last.
/// `today` only decides which cell gets [`DayStatus::Today`].
pub fn generate_monthly_grid(
    year: i32,
    month: u32,
    events: &[EventItem],
    tasks: &[ExternalTask],
    today: NaiveDate,
) -> EngineResult<Vec<CalendarDayCell>> {
    let first = first_day_of_month(year, month)?;
    let last = last_day_of_month(year, month)?;

    let leading = u64::from(first.weekday().number_from_monday()) - 1;
    let trailing = 7 - u64::from(last.weekday().number_from_monday());
    let out_of_range = || Error::InvalidMonth { year, month };
    let grid_start = first.checked_sub_days(Days::new(leading)).ok_or_else(out_of_range)?;
    let grid_end = last.checked_add_days(Days::new(trailing)).ok_or_else(out_of_range)?;

    let mut by_date: HashMap<NaiveDate, Vec<CalendarItem>> = HashMap::new();
    let items = events
        .iter()
        .cloned()
        .map(CalendarItem::Event)
        .chain(tasks.iter().cloned().map(CalendarItem::Task));
    for item in items {
        let date = item.date();
        if date >= grid_start && date <= grid_end {
            by_date.entry(date).or_default().push(item);
        }
    }

    let mut cells: Vec<CalendarDayCell> = grid_start
        .iter_days()
        .take_while(|date| *date <= grid_end)
        .map(|date| {
            let status = if date == today {
                DayStatus::Today
            } else if date < first {
                DayStatus::Previous
            } else if date > last {
                DayStatus::Next
            } else {
                DayStatus::Current
            };

            let mut items = by_date.remove(&date).unwrap_or_default();
            items.sort_by(|a, b| a.time().cmp(&b.time()).then_with(|| a.label().cmp(b.label())));

            CalendarDayCell {
                label: format!("{:02}", date.day()),
                date,
                date_key: date_key(&date),
                day_name: weekday_name(date.weekday()),
                month_name: month_short_name(date.month()),
                status,
                items,
            }
        })
        .collect();

    cells.sort_by_key(|cell| cell.date);
    Ok(cells)
}
