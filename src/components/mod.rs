// Export components
pub mod calendar_grid;
pub mod document_store;
pub mod event_store;
pub mod google_calendar;
pub mod redis_service;
pub mod refresh;
pub mod today_feed;

// Re-export the types an embedding application wires together
pub use document_store::{DocumentStore, MemoryStore};
pub use event_store::EventStore;
pub use google_calendar::{ExternalSource, GoogleCalendarClient};
pub use redis_service::RedisActorHandle;
pub use refresh::{CalendarEngine, CalendarSnapshot, EngineSettings};
