use super::models::{ExternalEvent, ExternalTask};
use super::normalize::{normalize_event, normalize_task, response_items};
use super::token::TokenProvider;
use super::{ExternalSource, SourceOutcome};
use crate::config::Config;
use crate::error::{external_error, EngineResult};
use crate::utils::time::month_window;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Read-only client for Google Calendar events and Google Tasks
#[derive(Clone)]
pub struct GoogleCalendarClient {
    client: Client,
    api_url: String,
    calendar_id: String,
    tasklist_id: String,
    months_before: u32,
    tokens: Arc<dyn TokenProvider>,
}

impl GoogleCalendarClient {
    pub fn new(config: &Config, tokens: Arc<dyn TokenProvider>) -> Self {
        Self {
            client: Client::new(),
            api_url: config.google_api_url.trim_end_matches('/').to_string(),
            calendar_id: config.google_calendar_id.clone(),
            tasklist_id: config.google_tasklist_id.clone(),
            months_before: config.external_months_before,
            tokens,
        }
    }

    /// Events from the start of `month - months_before` to the end of `month`
    pub async fn list_events(&self, year: i32, month: u32) -> EngineResult<Vec<ExternalEvent>> {
        let (time_min, time_max) = window_bounds(year, month, self.months_before)?;

        let mut url = self.endpoint(&["calendar", "v3", "calendars", &self.calendar_id, "events"])?;
        url.query_pairs_mut()
            .append_pair("timeMin", &time_min)
            .append_pair("timeMax", &time_max)
            .append_pair("singleEvents", "true")
            .append_pair("orderBy", "startTime");

        let response = self.get_json(url).await?;
        let events: Vec<ExternalEvent> = response_items(&response)
            .iter()
            .filter_map(normalize_event)
            .collect();

        debug!("Fetched {} external events for {}-{:02}", events.len(), year, month);
        Ok(events)
    }

    /// Tasks due in the same window as [`Self::list_events`]
    pub async fn list_tasks(&self, year: i32, month: u32) -> EngineResult<Vec<ExternalTask>> {
        let (due_min, due_max) = window_bounds(year, month, self.months_before)?;

        let mut url = self.endpoint(&["tasks", "v1", "lists", &self.tasklist_id, "tasks"])?;
        url.query_pairs_mut()
            .append_pair("dueMin", &due_min)
            .append_pair("dueMax", &due_max)
            .append_pair("showCompleted", "true");

        let response = self.get_json(url).await?;
        let tasks: Vec<ExternalTask> = response_items(&response)
            .iter()
            .filter_map(normalize_task)
            .collect();

        debug!("Fetched {} external tasks for {}-{:02}", tasks.len(), year, month);
        Ok(tasks)
    }

    fn endpoint(&self, segments: &[&str]) -> EngineResult<Url> {
        let mut url = Url::parse(&self.api_url)
            .map_err(|e| external_error(&format!("Failed to parse URL: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| external_error("API URL cannot be a base"))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// GET with bearer auth; a 401 triggers one token refresh and retry
    async fn get_json(&self, url: Url) -> EngineResult<Value> {
        let token = self.tokens.access_token().await?;
        let mut response = self.send(url.clone(), &token).await?;

        if response.status() == StatusCode::UNAUTHORIZED {
            info!("External API rejected the access token, refreshing");
            let token = self.tokens.refresh().await?;
            response = self.send(url, &token).await?;
        }

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(external_error(&format!(
                "Request failed: HTTP {} - {}",
                status, error_body
            )));
        }

        response
            .json()
            .await
            .map_err(|e| external_error(&format!("Failed to parse response: {}", e)))
    }

    async fn send(&self, url: Url, token: &str) -> EngineResult<reqwest::Response> {
        self.client
            .get(url)
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| external_error(&format!("Request failed: {}", e)))
    }
}

#[async_trait]
impl ExternalSource for GoogleCalendarClient {
    async fn fetch_external_events(&self, year: i32, month: u32) -> SourceOutcome<ExternalEvent> {
        match self.list_events(year, month).await {
            Ok(events) => SourceOutcome::Loaded(events),
            Err(e) => {
                warn!("External events unavailable for {}-{:02}: {}", year, month, e);
                SourceOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn fetch_external_tasks(&self, year: i32, month: u32) -> SourceOutcome<ExternalTask> {
        match self.list_tasks(year, month).await {
            Ok(tasks) => SourceOutcome::Loaded(tasks),
            Err(e) => {
                warn!("External tasks unavailable for {}-{:02}: {}", year, month, e);
                SourceOutcome::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }
}

fn to_rfc3339(value: NaiveDateTime) -> String {
    value
        .and_local_timezone(Local)
        .earliest()
        .map(|dt| dt.to_rfc3339())
        .unwrap_or_else(|| value.and_utc().to_rfc3339())
}

/// RFC 3339 bounds of the external fetch window
fn window_bounds(year: i32, month: u32, months_before: u32) -> EngineResult<(String, String)> {
    let (from, to) = month_window(year, month, months_before, 0)?;
    Ok((to_rfc3339(from), to_rfc3339(to)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_bounds_cover_previous_month() {
        let (from, to) = window_bounds(2025, 3, 1).unwrap();
        assert!(from.starts_with("2025-02-01T00:00:00"), "{}", from);
        assert!(to.starts_with("2025-03-31T23:59:59"), "{}", to);
        assert!(window_bounds(2025, 0, 1).is_err());
    }

    #[test]
    fn test_endpoint_paths() {
        let config = Config {
            google_api_url: "https://example.com/api/".to_string(),
            google_calendar_id: "team@example.com".to_string(),
            ..Config::default()
        };
        let client = GoogleCalendarClient::new(
            &config,
            Arc::new(super::super::token::StaticToken("t".to_string())),
        );

        let url = client
            .endpoint(&["calendar", "v3", "calendars", "team@example.com", "events"])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.com/api/calendar/v3/calendars/team@example.com/events"
        );
    }
}
