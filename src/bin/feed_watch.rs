use std::sync::Arc;
use tracing::{info, warn};
use workcal::components::today_feed::FeedCallbacks;
use workcal::components::CalendarSnapshot;
use workcal::{shutdown, startup};

/// Log what a published snapshot contains
fn report(snapshot: &CalendarSnapshot) {
    info!(
        "Refresh #{} for {}-{:02}: {} cells, {} local events, {} external events, {} tasks",
        snapshot.generation,
        snapshot.year,
        snapshot.month,
        snapshot.grid.len(),
        snapshot.local_events.len(),
        snapshot.external_events.len(),
        snapshot.tasks.len()
    );
    for warning in &snapshot.warnings {
        warn!("{}", warning);
    }
    if snapshot.today_feed.is_empty() {
        info!("Nothing else coming up today");
    }
    for item in &snapshot.today_feed {
        info!("  {} {}", item.time.short_label(), item.label);
    }
}

#[tokio::main]
async fn main() -> miette::Result<()> {
    // Initialize logging
    startup::init_logging()?;

    info!("Starting workcal feed watcher");

    let config = startup::load_config()?;
    startup::set_locale(&config.locale);

    let redis_handle = startup::start_redis(&config)?;
    let engine = startup::build_engine(
        &config,
        Arc::new(redis_handle.clone()),
        FeedCallbacks::noop(),
    );

    let mut snapshots = engine.subscribe();
    let reporter = tokio::spawn(async move {
        while snapshots.changed().await.is_ok() {
            let snapshot = snapshots.borrow_and_update().clone();
            report(&snapshot);
        }
    });

    if config.has_google_credentials() {
        engine.set_external_auth(true).await?;
    } else {
        warn!("No Google credentials configured, external sources stay disconnected");
    }
    engine.start().await;

    shutdown::handle_signals(engine, redis_handle).await?;
    reporter.abort();

    info!("Feed watcher stopped");
    Ok(())
}
