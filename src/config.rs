use crate::error::{config_error, env_error, EngineResult};
use dotenvy::dotenv;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;
use std::str::FromStr;

/// Default location of the optional configuration file
pub const DEFAULT_CONFIG_PATH: &str = "config/workcal.toml";

/// Main configuration structure for the calendar engine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Redis connection URL for the document store
    pub redis_url: String,
    /// Collection holding persisted calendar events
    pub events_collection: String,
    /// Base URL of the Google APIs
    pub google_api_url: String,
    /// OAuth token endpoint used for refreshing access tokens
    pub google_token_url: String,
    pub google_client_id: String,
    pub google_client_secret: String,
    pub google_refresh_token: String,
    pub google_access_token: String,
    /// Google Calendar ID to read events from
    pub google_calendar_id: String,
    /// Google Tasks list to read tasks from
    pub google_tasklist_id: String,
    /// Seconds between periodic refreshes
    pub refresh_interval_secs: u64,
    /// Minutes an item must still be ahead of now to stay in the today feed
    pub feed_grace_minutes: i64,
    /// Months queried on each side of the visible month from the event store
    pub query_buffer_months: u32,
    /// Months before the visible month requested from external sources
    pub external_months_before: u32,
    /// Locale for labels, day and month names
    pub locale: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            redis_url: "redis://127.0.0.1:6379".to_string(),
            events_collection: "calendar-events".to_string(),
            google_api_url: "https://www.googleapis.com".to_string(),
            google_token_url: "https://oauth2.googleapis.com/token".to_string(),
            google_client_id: String::new(),
            google_client_secret: String::new(),
            google_refresh_token: String::new(),
            google_access_token: String::new(),
            google_calendar_id: "primary".to_string(),
            google_tasklist_id: "@default".to_string(),
            refresh_interval_secs: 600,
            feed_grace_minutes: 10,
            query_buffer_months: 1,
            external_months_before: 1,
            locale: "en".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from defaults, the config file and the environment
    pub fn load() -> EngineResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let path = env::var("WORKCAL_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let mut config = if Path::new(&path).exists() {
            Self::from_toml_str(&fs::read_to_string(&path)?)?
        } else {
            Self::default()
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(content: &str) -> EngineResult<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Override fields from environment variables
    fn apply_env(&mut self) -> EngineResult<()> {
        override_string(&mut self.redis_url, "REDIS_URL");
        override_string(&mut self.google_api_url, "GOOGLE_API_URL");
        override_string(&mut self.google_token_url, "GOOGLE_TOKEN_URL");
        override_string(&mut self.google_client_id, "GOOGLE_CLIENT_ID");
        override_string(&mut self.google_client_secret, "GOOGLE_CLIENT_SECRET");
        override_string(&mut self.google_refresh_token, "GOOGLE_REFRESH_TOKEN");
        override_string(&mut self.google_access_token, "GOOGLE_ACCESS_TOKEN");
        override_string(&mut self.google_calendar_id, "GOOGLE_CALENDAR_ID");
        override_string(&mut self.google_tasklist_id, "GOOGLE_TASKLIST_ID");
        override_string(&mut self.locale, "WORKCAL_LOCALE");
        override_parsed(&mut self.refresh_interval_secs, "REFRESH_INTERVAL_SECS")?;
        override_parsed(&mut self.feed_grace_minutes, "FEED_GRACE_MINUTES")?;
        override_parsed(&mut self.query_buffer_months, "QUERY_BUFFER_MONTHS")?;
        Ok(())
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> EngineResult<()> {
        if self.refresh_interval_secs == 0 {
            return Err(config_error("refresh_interval_secs must be greater than zero"));
        }
        if self.feed_grace_minutes < 0 {
            return Err(config_error("feed_grace_minutes must not be negative"));
        }
        if self.events_collection.is_empty() {
            return Err(config_error("events_collection must not be empty"));
        }
        Ok(())
    }

    /// Whether enough Google credentials are present to call the APIs
    pub fn has_google_credentials(&self) -> bool {
        !self.google_access_token.is_empty() || !self.google_refresh_token.is_empty()
    }
}

fn override_string(field: &mut String, var: &str) {
    if let Ok(value) = env::var(var) {
        *field = value;
    }
}

fn override_parsed<T: FromStr>(field: &mut T, var: &str) -> EngineResult<()> {
    if let Ok(value) = env::var(var) {
        *field = value.trim().parse::<T>().map_err(|_| env_error(var))?;
    }
    Ok(())
}
