use crate::components::event_store::EventStore;
use crate::components::google_calendar::{
    GoogleCalendarClient, OAuthTokenManager, StaticToken, TokenProvider,
};
use crate::components::redis_service::{RedisActor, RedisActorHandle};
use crate::components::refresh::{CalendarEngine, EngineSettings};
use crate::components::today_feed::FeedCallbacks;
use crate::components::DocumentStore;
use crate::config::Config;
use crate::error::Error;
use crate::utils::time::SystemClock;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Initialize logging with environment-based configuration
pub fn init_logging() -> miette::Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,workcal=debug")),
        )
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .map_err(|e| Error::Other(format!("Failed to set up logging: {}", e)))?;

    Ok(())
}

/// Load the application config
pub fn load_config() -> miette::Result<Config> {
    match Config::load() {
        Ok(config) => Ok(config),
        Err(e) => {
            error!("Failed to load configuration: {:?}", e);
            Err(e.into())
        }
    }
}

/// Switch labels, day and month names to the configured locale
pub fn set_locale(locale: &str) {
    let available = rust_i18n::available_locales!();
    if available.iter().any(|l| *l == locale) {
        rust_i18n::set_locale(locale);
        info!("Setting locale to {}", locale);
    } else {
        error!(
            "Unknown locale '{}', keeping the default (available: {:?})",
            locale, available
        );
    }
}

/// Spawn the Redis actor and return its handle
pub fn start_redis(config: &Config) -> miette::Result<RedisActorHandle> {
    let (mut redis_actor, redis_handle) = RedisActor::new(config)?;

    tokio::spawn(async move {
        redis_actor.run().await;
    });

    Ok(redis_handle)
}

/// Token source for the Google APIs: the refresh-token flow when a refresh
/// token is configured, otherwise the fixed access token
pub fn token_provider(config: &Config) -> Arc<dyn TokenProvider> {
    if config.google_refresh_token.is_empty() {
        Arc::new(StaticToken(config.google_access_token.clone()))
    } else {
        Arc::new(OAuthTokenManager::new(config))
    }
}

/// Wire the engine against a document store and the Google APIs
pub fn build_engine(
    config: &Config,
    store: Arc<dyn DocumentStore>,
    callbacks: FeedCallbacks,
) -> CalendarEngine {
    let events = EventStore::from_config(store, config);
    let google = GoogleCalendarClient::new(config, token_provider(config));

    CalendarEngine::new(
        events,
        Arc::new(google),
        Arc::new(SystemClock),
        EngineSettings::from_config(config),
        callbacks,
    )
}
