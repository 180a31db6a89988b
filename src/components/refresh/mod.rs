mod engine;
pub mod models;

pub use engine::CalendarEngine;
pub use models::{CalendarSnapshot, EngineSettings, RefreshTrigger, SourceKind, SourceWarning};
