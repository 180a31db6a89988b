mod aggregate;
pub mod models;

pub use aggregate::{compute_today_feed, retain_upcoming};
pub use models::{FeedCallback, FeedCallbacks, FeedItem, FeedSource};
