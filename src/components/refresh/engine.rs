use super::models::{CalendarSnapshot, EngineSettings, RefreshTrigger, SourceKind, SourceWarning};
use crate::components::calendar_grid::{generate_monthly_grid, EventItem};
use crate::components::event_store::{EventStore, Identity};
use crate::components::google_calendar::{
    ExternalEvent, ExternalSource, ExternalTask, SourceOutcome,
};
use crate::components::today_feed::{
    compute_today_feed, retain_upcoming, FeedCallbacks, FeedItem,
};
use crate::error::EngineResult;
use crate::utils::time::{first_day_of_month, same_month, Clock};
use chrono::{Datelike, NaiveDateTime};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

const MIN_REFRESH_INTERVAL: Duration = Duration::from_millis(10);

/// What the user is looking at
#[derive(Debug, Clone)]
struct ViewState {
    year: i32,
    month: u32,
    identity: Option<Identity>,
    external_connected: bool,
}

struct EngineInner {
    events: EventStore,
    source: Arc<dyn ExternalSource>,
    clock: Arc<dyn Clock>,
    settings: EngineSettings,
    callbacks: FeedCallbacks,
    view: RwLock<ViewState>,
    generation: AtomicU64,
    snapshot_tx: watch::Sender<Arc<CalendarSnapshot>>,
    cancel: CancellationToken,
    ticker: Mutex<Option<JoinHandle<()>>>,
}

/// Keeps the monthly grid and today feed current.
///
/// Every trigger issues a new generation and runs one fetch cycle; a cycle
/// publishes its snapshot only if no newer cycle was issued meanwhile.
/// Call [`CalendarEngine::shutdown`] to stop the interval ticker.
#[derive(Clone)]
pub struct CalendarEngine {
    inner: Arc<EngineInner>,
}

impl CalendarEngine {
    /// Create an engine showing the clock's current month. Nothing is fetched
    /// until a trigger fires.
    pub fn new(
        events: EventStore,
        source: Arc<dyn ExternalSource>,
        clock: Arc<dyn Clock>,
        settings: EngineSettings,
        callbacks: FeedCallbacks,
    ) -> Self {
        let today = clock.today();
        let view = ViewState {
            year: today.year(),
            month: today.month(),
            identity: None,
            external_connected: false,
        };
        let initial = CalendarSnapshot {
            year: view.year,
            month: view.month,
            ..CalendarSnapshot::default()
        };
        let (snapshot_tx, _) = watch::channel(Arc::new(initial));

        Self {
            inner: Arc::new(EngineInner {
                events,
                source,
                clock,
                settings,
                callbacks,
                view: RwLock::new(view),
                generation: AtomicU64::new(0),
                snapshot_tx,
                cancel: CancellationToken::new(),
                ticker: Mutex::new(None),
            }),
        }
    }

    /// Receiver that sees every published snapshot
    pub fn subscribe(&self) -> watch::Receiver<Arc<CalendarSnapshot>> {
        self.inner.snapshot_tx.subscribe()
    }

    /// Latest published snapshot
    pub fn snapshot(&self) -> Arc<CalendarSnapshot> {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Newest generation issued so far
    pub fn generation(&self) -> u64 {
        self.inner.generation.load(Ordering::SeqCst)
    }

    pub fn is_shut_down(&self) -> bool {
        self.inner.cancel.is_cancelled()
    }

    /// Show another month and refresh. Returns whether this cycle's snapshot
    /// was published.
    pub async fn navigate(&self, year: i32, month: u32) -> EngineResult<bool> {
        first_day_of_month(year, month)?;
        let (generation, view) = self
            .issue(|view| {
                view.year = year;
                view.month = month;
            })
            .await;
        self.run_cycle(generation, view, RefreshTrigger::Navigation)
            .await
    }

    /// Set or clear the signed-in user and refresh
    pub async fn set_identity(&self, identity: Option<Identity>) -> EngineResult<bool> {
        let (generation, view) = self.issue(|view| view.identity = identity).await;
        self.run_cycle(generation, view, RefreshTrigger::Identity)
            .await
    }

    /// Mark external credentials as available or gone and refresh
    pub async fn set_external_auth(&self, connected: bool) -> EngineResult<bool> {
        let (generation, view) = self
            .issue(|view| view.external_connected = connected)
            .await;
        self.run_cycle(generation, view, RefreshTrigger::Identity)
            .await
    }

    /// Refresh the visible month on demand
    pub async fn refresh(&self) -> EngineResult<bool> {
        let (generation, view) = self.issue(|_| {}).await;
        self.run_cycle(generation, view, RefreshTrigger::Manual).await
    }

    /// One interval refresh. While another month is shown this also fetches
    /// the current month so the today feed stays accurate.
    pub async fn tick(&self) -> EngineResult<bool> {
        let (generation, view) = self.issue(|_| {}).await;
        self.run_cycle(generation, view, RefreshTrigger::Tick).await
    }

    /// Spawn the interval ticker. The first tick fires immediately.
    pub async fn start(&self) {
        let mut ticker = self.inner.ticker.lock().await;
        if ticker.is_some() {
            warn!("Refresh ticker is already running, skipping start");
            return;
        }
        if self.is_shut_down() {
            warn!("Calendar engine is shut down, not starting the ticker");
            return;
        }

        let period = self.inner.settings.refresh_interval.max(MIN_REFRESH_INTERVAL);
        info!("Starting refresh ticker every {:?}", period);

        let engine = self.clone();
        let token = self.inner.cancel.clone();
        *ticker = Some(tokio::spawn(async move {
            engine.run_ticker(token, period).await;
        }));
    }

    /// Cancel the ticker and any in-flight interval refresh, then wait for it to stop
    pub async fn shutdown(&self) {
        self.inner.cancel.cancel();

        let task = self.inner.ticker.lock().await.take();
        if let Some(task) = task {
            if let Err(e) = task.await {
                error!("Refresh ticker task failed: {}", e);
            }
        }

        info!("Calendar engine shut down");
    }

    async fn run_ticker(&self, token: CancellationToken, period: Duration) {
        let mut ticks = interval(period);
        ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                _ = ticks.tick() => {
                    tokio::select! {
                        _ = token.cancelled() => break,
                        result = self.tick() => {
                            if let Err(e) = result {
                                error!("Scheduled refresh failed: {}", e);
                            }
                        }
                    }
                }
            }
        }

        info!("Refresh ticker stopped");
    }

    /// Apply a view change and issue its generation under one lock
    async fn issue(&self, apply: impl FnOnce(&mut ViewState)) -> (u64, ViewState) {
        let mut view = self.inner.view.write().await;
        apply(&mut view);
        let generation = self.inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
        (generation, view.clone())
    }

    async fn run_cycle(
        &self,
        generation: u64,
        view: ViewState,
        trigger: RefreshTrigger,
    ) -> EngineResult<bool> {
        if self.is_shut_down() {
            debug!("Engine shut down, skipping {} refresh", trigger);
            return Ok(false);
        }

        let now = self.inner.clock.now();
        let today = now.date();
        let mut warnings = Vec::new();

        let (local, external, tasks) = futures::join!(
            self.inner
                .events
                .query_events(view.year, view.month, view.identity.as_ref()),
            self.fetch_events(&view, view.year, view.month),
            self.fetch_tasks(&view, view.year, view.month),
        );

        let local_events = match local {
            Ok(events) => events,
            Err(e) => {
                warn!(
                    "Local events unavailable for {}-{:02}: {}",
                    view.year, view.month, e
                );
                warnings.push(SourceWarning::new(SourceKind::LocalEvents, e.to_string()));
                Vec::new()
            }
        };
        let external_events = take_outcome(external, SourceKind::ExternalEvents, &mut warnings);
        let tasks = take_outcome(tasks, SourceKind::ExternalTasks, &mut warnings);

        let items: Vec<EventItem> = local_events
            .iter()
            .cloned()
            .map(EventItem::Local)
            .chain(external_events.iter().cloned().map(EventItem::External))
            .collect();
        let grid = generate_monthly_grid(view.year, view.month, &items, &tasks, today)?;

        let viewing_today = same_month(&first_day_of_month(view.year, view.month)?, &today);
        let today_feed = if viewing_today {
            self.feed(&external_events, &tasks, now)
        } else if trigger == RefreshTrigger::Tick {
            let (events_now, tasks_now) = futures::join!(
                self.fetch_events(&view, today.year(), today.month()),
                self.fetch_tasks(&view, today.year(), today.month()),
            );
            let events_now = take_outcome(events_now, SourceKind::ExternalEvents, &mut warnings);
            let tasks_now = take_outcome(tasks_now, SourceKind::ExternalTasks, &mut warnings);
            self.feed(&events_now, &tasks_now, now)
        } else {
            retain_upcoming(
                &self.snapshot().today_feed,
                now,
                self.inner.settings.grace_minutes,
            )
        };

        let snapshot = CalendarSnapshot {
            generation,
            year: view.year,
            month: view.month,
            grid,
            today_feed,
            local_events,
            external_events,
            tasks,
            warnings,
            external_connected: view.external_connected,
            refreshed_at: Some(now),
        };

        Ok(self.publish(snapshot, trigger))
    }

    async fn fetch_events(
        &self,
        view: &ViewState,
        year: i32,
        month: u32,
    ) -> SourceOutcome<ExternalEvent> {
        if !view.external_connected {
            return SourceOutcome::Loaded(Vec::new());
        }
        self.inner.source.fetch_external_events(year, month).await
    }

    async fn fetch_tasks(
        &self,
        view: &ViewState,
        year: i32,
        month: u32,
    ) -> SourceOutcome<ExternalTask> {
        if !view.external_connected {
            return SourceOutcome::Loaded(Vec::new());
        }
        self.inner.source.fetch_external_tasks(year, month).await
    }

    fn feed(
        &self,
        events: &[ExternalEvent],
        tasks: &[ExternalTask],
        now: NaiveDateTime,
    ) -> Vec<FeedItem> {
        compute_today_feed(
            events,
            tasks,
            now,
            self.inner.settings.grace_minutes,
            &self.inner.callbacks,
        )
    }

    /// Replace the published snapshot unless a newer cycle has been issued
    fn publish(&self, snapshot: CalendarSnapshot, trigger: RefreshTrigger) -> bool {
        let generation = snapshot.generation;
        let latest = self.generation();
        let (year, month) = (snapshot.year, snapshot.month);
        let feed_len = snapshot.today_feed.len();

        let published = generation == latest
            && self.inner.snapshot_tx.send_if_modified(|current| {
                if generation <= current.generation {
                    return false;
                }
                *current = Arc::new(snapshot);
                true
            });

        if published {
            debug!(
                "Published {} refresh #{} for {}-{:02} ({} feed items)",
                trigger, generation, year, month, feed_len
            );
        } else {
            debug!(
                "Discarding stale {} refresh #{} for {}-{:02}, newest is #{}",
                trigger, generation, year, month, latest
            );
        }
        published
    }
}

fn take_outcome<T>(
    outcome: SourceOutcome<T>,
    source: SourceKind,
    warnings: &mut Vec<SourceWarning>,
) -> Vec<T> {
    if let Some(reason) = outcome.failure() {
        warnings.push(SourceWarning::new(source, reason));
    }
    outcome.into_items()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::document_store::MemoryStore;
    use crate::utils::time::FixedClock;
    use async_trait::async_trait;
    use chrono::NaiveDate;

    struct EmptySource;

    #[async_trait]
    impl ExternalSource for EmptySource {
        async fn fetch_external_events(
            &self,
            _year: i32,
            _month: u32,
        ) -> SourceOutcome<ExternalEvent> {
            SourceOutcome::Loaded(Vec::new())
        }

        async fn fetch_external_tasks(
            &self,
            _year: i32,
            _month: u32,
        ) -> SourceOutcome<ExternalTask> {
            SourceOutcome::Unavailable {
                reason: "offline".to_string(),
            }
        }
    }

    fn engine() -> CalendarEngine {
        let now = NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        CalendarEngine::new(
            EventStore::new(Arc::new(MemoryStore::new()), "calendar-events", 1),
            Arc::new(EmptySource),
            Arc::new(FixedClock(now)),
            EngineSettings::default(),
            FeedCallbacks::noop(),
        )
    }

    #[tokio::test]
    async fn test_initial_snapshot_is_current_month() {
        let engine = engine();
        let snapshot = engine.snapshot();
        assert_eq!(snapshot.generation, 0);
        assert_eq!((snapshot.year, snapshot.month), (2025, 3));
        assert!(snapshot.grid.is_empty());
    }

    #[tokio::test]
    async fn test_disconnected_external_is_not_a_failure() {
        let engine = engine();
        assert!(engine.refresh().await.unwrap());

        let snapshot = engine.snapshot();
        assert_eq!(snapshot.generation, 1);
        assert!(!snapshot.external_connected);
        assert!(!snapshot.is_partial());
        assert_eq!(snapshot.grid.len(), 42);
    }

    #[tokio::test]
    async fn test_failed_source_becomes_warning() {
        let engine = engine();
        engine.set_external_auth(true).await.unwrap();

        let snapshot = engine.snapshot();
        assert!(snapshot.external_connected);
        assert_eq!(
            snapshot.warnings,
            vec![SourceWarning::new(SourceKind::ExternalTasks, "offline")]
        );
    }

    #[tokio::test]
    async fn test_invalid_navigation_is_rejected() {
        let engine = engine();
        assert!(engine.navigate(2025, 0).await.is_err());
        assert_eq!(engine.generation(), 0);
    }

    #[tokio::test]
    async fn test_no_refresh_after_shutdown() {
        let engine = engine();
        engine.shutdown().await;
        assert!(engine.is_shut_down());
        assert!(!engine.refresh().await.unwrap());
        assert_eq!(engine.snapshot().generation, 0);
    }
}
