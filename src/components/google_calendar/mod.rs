mod client;
pub mod models;
mod normalize;
pub mod token;

pub use client::GoogleCalendarClient;
pub use models::{Attendee, ExternalEvent, ExternalTask, TaskStatus};
pub use token::{OAuthTokenManager, StaticToken, TokenProvider};

use async_trait::async_trait;

/// Result of reading one external source. Failures never propagate past the
/// adapter; they arrive here so callers can tell "unavailable" from "empty".
#[derive(Debug, Clone, PartialEq)]
pub enum SourceOutcome<T> {
    Loaded(Vec<T>),
    Unavailable { reason: String },
}

impl<T> SourceOutcome<T> {
    /// Loaded items, or nothing when the source was unavailable
    pub fn into_items(self) -> Vec<T> {
        match self {
            SourceOutcome::Loaded(items) => items,
            SourceOutcome::Unavailable { .. } => Vec::new(),
        }
    }

    pub fn failure(&self) -> Option<&str> {
        match self {
            SourceOutcome::Loaded(_) => None,
            SourceOutcome::Unavailable { reason } => Some(reason),
        }
    }
}

/// Read-only provider of external calendar events and tasks
#[async_trait]
pub trait ExternalSource: Send + Sync {
    async fn fetch_external_events(&self, year: i32, month: u32) -> SourceOutcome<ExternalEvent>;

    async fn fetch_external_tasks(&self, year: i32, month: u32) -> SourceOutcome<ExternalTask>;
}
