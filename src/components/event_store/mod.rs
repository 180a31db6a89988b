pub mod models;
mod split;
mod store;

pub use models::{CalendarEvent, EventRegistration, EventType, Identity, Organizer, Role};
pub use split::DaySpan;
pub use store::EventStore;
