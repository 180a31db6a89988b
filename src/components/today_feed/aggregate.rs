use super::models::{FeedCallbacks, FeedItem, FeedSource};
use crate::components::google_calendar::{ExternalEvent, ExternalTask};
use crate::utils::time::{grace_cutoff, ItemTime};
use chrono::NaiveDateTime;

/// Whether an item dated `time` still belongs in the feed at `now`
fn is_upcoming(time: &ItemTime, now: NaiveDateTime, grace_minutes: i64) -> bool {
    if time.date() != now.date() {
        return false;
    }
    match time {
        ItemTime::AllDay(_) => true,
        ItemTime::Timed(at) => *at > grace_cutoff(now, grace_minutes),
    }
}

/// Drop items of a previously computed feed that are no longer upcoming at `now`
pub fn retain_upcoming(feed: &[FeedItem], now: NaiveDateTime, grace_minutes: i64) -> Vec<FeedItem> {
    feed.iter()
        .filter(|item| is_upcoming(&item.time, now, grace_minutes))
        .cloned()
        .collect()
}

/// Collect today's upcoming external events and tasks.
///
/// An item is kept when it falls on `now`'s date and is either all-day or
/// starts strictly after `now + grace_minutes`. The result is ordered by time
/// with every all-day item after the timed ones; ties are broken by label.
pub fn compute_today_feed(
    events: &[ExternalEvent],
    tasks: &[ExternalTask],
    now: NaiveDateTime,
    grace_minutes: i64,
    callbacks: &FeedCallbacks,
) -> Vec<FeedItem> {
    let event_items = events
        .iter()
        .filter(|event| is_upcoming(&event.start, now, grace_minutes))
        .map(|event| {
            FeedItem::new(
                event.summary.clone(),
                event.start,
                FeedSource::Event(event.clone()),
                callbacks.on_event.clone(),
            )
        });

    let task_items = tasks
        .iter()
        .filter(|task| is_upcoming(&task.due, now, grace_minutes))
        .map(|task| {
            FeedItem::new(
                task.title.clone(),
                task.due,
                FeedSource::Task(task.clone()),
                callbacks.on_task.clone(),
            )
        });

    let mut feed: Vec<FeedItem> = event_items.chain(task_items).collect();
    feed.sort_by(|a, b| a.time.cmp(&b.time).then_with(|| a.label.cmp(&b.label)));
    feed
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::google_calendar::TaskStatus;
    use chrono::{Duration, NaiveDate};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 3, 10)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn event(summary: &str, start: ItemTime) -> ExternalEvent {
        ExternalEvent {
            id: format!("ev-{}", summary),
            summary: summary.to_string(),
            description: None,
            start,
            end: None,
            organizer_email: None,
            organizer_name: None,
            location: None,
            hangout_link: None,
            attendees: Vec::new(),
        }
    }

    fn task(title: &str, due: ItemTime) -> ExternalTask {
        ExternalTask {
            id: format!("task-{}", title),
            title: title.to_string(),
            notes: None,
            status: TaskStatus::NeedsAction,
            due,
            web_view_link: None,
        }
    }

    fn labels(feed: &[FeedItem]) -> Vec<&str> {
        feed.iter().map(|item| item.label.as_str()).collect()
    }

    #[test]
    fn test_grace_window() {
        let events = vec![
            event("in five", ItemTime::Timed(now() + Duration::minutes(5))),
            event("at cutoff", ItemTime::Timed(now() + Duration::minutes(10))),
            event("in eleven", ItemTime::Timed(now() + Duration::minutes(11))),
            event("earlier", ItemTime::Timed(now() - Duration::hours(1))),
        ];

        let feed = compute_today_feed(&events, &[], now(), 10, &FeedCallbacks::noop());
        assert_eq!(labels(&feed), vec!["in eleven"]);
    }

    #[test]
    fn test_carried_feed_expires() {
        let today = now().date();
        let events = vec![
            event("review", ItemTime::Timed(now() + Duration::minutes(30))),
            event("demo", ItemTime::Timed(now() + Duration::hours(7))),
            event("offsite", ItemTime::AllDay(today)),
        ];
        let feed = compute_today_feed(&events, &[], now(), 10, &FeedCallbacks::noop());
        assert_eq!(labels(&feed), vec!["review", "demo", "offsite"]);

        let later = retain_upcoming(&feed, now() + Duration::hours(2), 10);
        assert_eq!(labels(&later), vec!["demo", "offsite"]);

        let tomorrow = retain_upcoming(&feed, now() + Duration::days(1), 10);
        assert!(tomorrow.is_empty());
    }

    #[test]
    fn test_all_day_today_always_included() {
        let today = now().date();
        let late = now().date().and_hms_opt(23, 59, 0).unwrap();
        let tasks = vec![
            task("file report", ItemTime::AllDay(today)),
            task("tomorrow", ItemTime::AllDay(today.succ_opt().unwrap())),
        ];

        let feed = compute_today_feed(&[], &tasks, late, 10, &FeedCallbacks::noop());
        assert_eq!(labels(&feed), vec!["file report"]);
    }

    #[test]
    fn test_merged_order_all_day_last() {
        let today = now().date();
        let events = vec![
            event("standup", ItemTime::Timed(now() + Duration::hours(1))),
            event("offsite", ItemTime::AllDay(today)),
            event("review", ItemTime::Timed(now() + Duration::hours(5))),
        ];
        let tasks = vec![
            task("backup", ItemTime::AllDay(today)),
            task("call vendor", ItemTime::Timed(now() + Duration::hours(2))),
        ];

        let feed = compute_today_feed(&events, &tasks, now(), 10, &FeedCallbacks::noop());
        assert_eq!(
            labels(&feed),
            vec!["standup", "call vendor", "review", "backup", "offsite"]
        );
        assert!(feed[3].time.is_all_day() && feed[4].time.is_all_day());
    }

    #[test]
    fn test_other_days_excluded() {
        let events = vec![event(
            "tomorrow morning",
            ItemTime::Timed(now() + Duration::days(1)),
        )];
        let feed = compute_today_feed(&events, &[], now(), 10, &FeedCallbacks::noop());
        assert!(feed.is_empty());
    }

    #[test]
    fn test_select_invokes_matching_callback() {
        let event_hits = Arc::new(AtomicUsize::new(0));
        let task_hits = Arc::new(AtomicUsize::new(0));
        let callbacks = {
            let event_hits = event_hits.clone();
            let task_hits = task_hits.clone();
            FeedCallbacks::new(
                move |source| {
                    assert!(matches!(source, FeedSource::Event(_)));
                    event_hits.fetch_add(1, Ordering::SeqCst);
                },
                move |source| {
                    assert_eq!(source.id(), "task-write docs");
                    task_hits.fetch_add(1, Ordering::SeqCst);
                },
            )
        };

        let events = vec![event("demo", ItemTime::Timed(now() + Duration::hours(3)))];
        let tasks = vec![task("write docs", ItemTime::AllDay(now().date()))];
        let feed = compute_today_feed(&events, &tasks, now(), 10, &callbacks);

        feed.iter().for_each(FeedItem::select);
        feed[1].select();

        assert_eq!(event_hits.load(Ordering::SeqCst), 1);
        assert_eq!(task_hits.load(Ordering::SeqCst), 2);
    }
}
