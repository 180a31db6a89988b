mod generate;
pub mod models;

pub use generate::{generate_monthly_grid, month_short_name, weekday_name};
pub use models::{CalendarDayCell, CalendarItem, DayStatus, EventItem};
