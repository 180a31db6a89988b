use std::sync::Arc;
use workcal::components::redis_service::RedisActorHandle;
use workcal::components::today_feed::FeedCallbacks;
use workcal::components::MemoryStore;
use workcal::config::Config;
use workcal::startup;

/// Smoke test to verify the default configuration is usable
#[tokio::test]
async fn test_config_defaults() {
    let config = Config::default();

    assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
    assert_eq!(config.refresh_interval_secs, 600);
    assert_eq!(config.feed_grace_minutes, 10);
    assert!(config.validate().is_ok());
    assert!(!config.has_google_credentials());
}

/// Smoke test for the Redis actor handle
#[tokio::test]
async fn test_redis_handle_creation() {
    // Create an empty Redis handle
    let redis_handle = RedisActorHandle::empty();

    // Shutting down a handle without an actor behind it is harmless
    assert!(redis_handle.shutdown().await.is_ok());
}

/// The wired engine starts on the current month and stops cleanly
#[tokio::test]
async fn test_build_engine() {
    let config = Config {
        google_api_url: "http://127.0.0.1:9".to_string(),
        ..Config::default()
    };
    let engine = startup::build_engine(&config, Arc::new(MemoryStore::new()), FeedCallbacks::noop());

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.generation, 0);
    assert!((1..=12).contains(&snapshot.month));

    // No identity and no external auth: an empty but complete cycle
    assert!(engine.refresh().await.unwrap());
    let snapshot = engine.snapshot();
    assert!(snapshot.grid.len() >= 28);
    assert!(snapshot.warnings.is_empty());

    engine.shutdown().await;
    assert!(engine.is_shut_down());
}

/// An unreachable store degrades to a warning, the grid is still built
#[tokio::test]
async fn test_unreachable_store_is_a_warning() {
    use workcal::components::event_store::{Identity, Role};
    use workcal::components::refresh::SourceKind;

    let engine = startup::build_engine(
        &Config::default(),
        Arc::new(RedisActorHandle::empty()),
        FeedCallbacks::noop(),
    );
    engine
        .set_identity(Some(Identity::new("u-dev", Role::Developer)))
        .await
        .unwrap();

    let snapshot = engine.snapshot();
    assert_eq!(snapshot.warnings.len(), 1);
    assert_eq!(snapshot.warnings[0].source, SourceKind::LocalEvents);
    assert!(snapshot.local_events.is_empty());
    assert!(!snapshot.grid.is_empty());
}
