use mockito::Matcher;
use std::sync::Arc;
use workcal::components::google_calendar::{
    ExternalSource, GoogleCalendarClient, OAuthTokenManager, SourceOutcome, StaticToken,
    TaskStatus,
};
use workcal::config::Config;
use workcal::utils::time::ItemTime;

const EVENTS_PATH: &str = "/calendar/v3/calendars/primary/events";
const TASKS_PATH: &str = "/tasks/v1/lists/@default/tasks";

fn config_for(server: &mockito::Server) -> Config {
    Config {
        google_api_url: server.url(),
        google_token_url: format!("{}/token", server.url()),
        google_client_id: "client".to_string(),
        google_client_secret: "secret".to_string(),
        google_refresh_token: "refresh".to_string(),
        google_access_token: "stale".to_string(),
        ..Config::default()
    }
}

fn dt(y: i32, m: u32, d: u32, h: u32, min: u32) -> chrono::NaiveDateTime {
    chrono::NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, min, 0)
        .unwrap()
}

/// Events are normalized: timed, all-day and undated items
#[tokio::test]
async fn test_fetch_events_normalizes_items() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::AllOf(vec![
            Matcher::UrlEncoded("singleEvents".into(), "true".into()),
            Matcher::UrlEncoded("orderBy".into(), "startTime".into()),
            Matcher::Regex("timeMin=2025-02-01".into()),
            Matcher::Regex("timeMax=2025-03-31".into()),
        ]))
        .match_header("authorization", "Bearer token-123")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"items":[
                {"id":"e1","summary":"Standup","start":{"dateTime":"2025-03-10T09:30:00+01:00"},
                 "end":{"dateTime":"2025-03-10T09:45:00+01:00"},
                 "organizer":{"email":"lead@example.com","displayName":"Lead"},
                 "attendees":[{"email":"dev@example.com","responseStatus":"accepted"}],
                 "hangoutLink":"https://meet.example.com/abc"},
                {"id":"e2","summary":"Offsite","start":{"date":"2025-03-14"},"end":{"date":"2025-03-15"}},
                {"id":"e3","summary":"Broken","start":{}}
            ]}"#,
        )
        .create_async()
        .await;

    let config = config_for(&server);
    let client = GoogleCalendarClient::new(&config, Arc::new(StaticToken("token-123".to_string())));

    let events = match client.fetch_external_events(2025, 3).await {
        SourceOutcome::Loaded(events) => events,
        other => panic!("expected events, got {:?}", other),
    };

    assert_eq!(events.len(), 2);
    assert_eq!(events[0].start, ItemTime::Timed(dt(2025, 3, 10, 9, 30)));
    assert_eq!(events[0].organizer_email.as_deref(), Some("lead@example.com"));
    assert_eq!(events[0].attendees.len(), 1);
    assert_eq!(events[0].hangout_link.as_deref(), Some("https://meet.example.com/abc"));
    assert!(events[1].start.is_all_day());
    mock.assert_async().await;
}

#[tokio::test]
async fn test_fetch_tasks_reads_due_dates() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", TASKS_PATH)
        .match_query(Matcher::UrlEncoded("showCompleted".into(), "true".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"items":[
                {"id":"t1","title":"Expense report","due":"2025-03-10T00:00:00.000Z","status":"needsAction"},
                {"id":"t2","title":"","due":"2025-03-11T00:00:00.000Z","status":"completed"},
                {"id":"t3","title":"Someday"}
            ]}"#,
        )
        .create_async()
        .await;

    let config = config_for(&server);
    let client = GoogleCalendarClient::new(&config, Arc::new(StaticToken("token".to_string())));

    let tasks = client.list_tasks(2025, 3).await.unwrap();
    assert_eq!(tasks.len(), 2);
    assert_eq!(
        tasks[0].due,
        ItemTime::AllDay(chrono::NaiveDate::from_ymd_opt(2025, 3, 10).unwrap())
    );
    assert_eq!(tasks[0].status, TaskStatus::NeedsAction);
    assert!(!tasks[1].title.is_empty());
    assert!(tasks[1].is_completed());
    mock.assert_async().await;
}

/// A rejected token is refreshed once and the request retried
#[tokio::test]
async fn test_unauthorized_refreshes_and_retries() {
    let mut server = mockito::Server::new_async().await;

    let rejected = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer stale")
        .with_status(401)
        .with_body(r#"{"error":{"code":401}}"#)
        .expect(1)
        .create_async()
        .await;

    let token = server
        .mock("POST", "/token")
        .match_body(Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"access_token":"fresh","expires_in":3600}"#)
        .expect(1)
        .create_async()
        .await;

    let accepted = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .match_header("authorization", "Bearer fresh")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"items":[{"id":"e1","summary":"Retro","start":{"dateTime":"2025-03-12T15:00:00Z"}}]}"#)
        .expect(1)
        .create_async()
        .await;

    let config = config_for(&server);
    let client = GoogleCalendarClient::new(&config, Arc::new(OAuthTokenManager::new(&config)));

    let events = client.list_events(2025, 3).await.unwrap();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].summary, "Retro");

    rejected.assert_async().await;
    token.assert_async().await;
    accepted.assert_async().await;
}

/// Transport failures surface as an unavailable source, not an empty one
#[tokio::test]
async fn test_server_error_is_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", TASKS_PATH)
        .match_query(Matcher::Any)
        .with_status(503)
        .with_body("backend down")
        .create_async()
        .await;

    let config = config_for(&server);
    let client = GoogleCalendarClient::new(&config, Arc::new(StaticToken("token".to_string())));

    let outcome = client.fetch_external_tasks(2025, 3).await;
    let reason = outcome.failure().unwrap();
    assert!(reason.contains("503"), "{}", reason);
    assert!(outcome.into_items().is_empty());
}

/// A refresh that fails after a 401 leaves the source unavailable
#[tokio::test]
async fn test_failed_refresh_is_unavailable() {
    let mut server = mockito::Server::new_async().await;
    let _rejected = server
        .mock("GET", EVENTS_PATH)
        .match_query(Matcher::Any)
        .with_status(401)
        .create_async()
        .await;
    let _token = server
        .mock("POST", "/token")
        .with_status(400)
        .with_body(r#"{"error":"invalid_grant"}"#)
        .create_async()
        .await;

    let config = config_for(&server);
    let client = GoogleCalendarClient::new(&config, Arc::new(OAuthTokenManager::new(&config)));

    let outcome = client.fetch_external_events(2025, 3).await;
    assert!(matches!(outcome, SourceOutcome::Unavailable { .. }));
}
