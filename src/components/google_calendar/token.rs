use crate::config::Config;
use crate::error::{external_error, EngineResult};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::info;

/// Supplies bearer tokens for the external APIs
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// A token believed to be valid
    async fn access_token(&self) -> EngineResult<String>;

    /// Obtain a new token after the API rejected the current one
    async fn refresh(&self) -> EngineResult<String>;
}

/// A fixed token that cannot be refreshed
#[derive(Debug, Clone)]
pub struct StaticToken(pub String);

#[async_trait]
impl TokenProvider for StaticToken {
    async fn access_token(&self) -> EngineResult<String> {
        Ok(self.0.clone())
    }

    async fn refresh(&self) -> EngineResult<String> {
        Err(external_error("Static access token was rejected"))
    }
}

#[derive(Debug, Clone, Default)]
struct TokenState {
    access_token: Option<String>,
    expires_at: Option<i64>,
}

/// OAuth refresh-token flow against the Google token endpoint
#[derive(Clone)]
pub struct OAuthTokenManager {
    client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    state: Arc<RwLock<TokenState>>,
}

impl OAuthTokenManager {
    pub fn new(config: &Config) -> Self {
        let access_token = Some(config.google_access_token.clone()).filter(|t| !t.is_empty());
        Self {
            client: Client::new(),
            token_url: config.google_token_url.clone(),
            client_id: config.google_client_id.clone(),
            client_secret: config.google_client_secret.clone(),
            refresh_token: config.google_refresh_token.clone(),
            state: Arc::new(RwLock::new(TokenState {
                access_token,
                expires_at: None,
            })),
        }
    }
}

#[async_trait]
impl TokenProvider for OAuthTokenManager {
    async fn access_token(&self) -> EngineResult<String> {
        {
            let state = self.state.read().await;
            if let Some(token) = &state.access_token {
                let expired = state
                    .expires_at
                    .is_some_and(|expiry| expiry <= Utc::now().timestamp());
                if !expired {
                    return Ok(token.clone());
                }
            }
        }
        self.refresh().await
    }

    async fn refresh(&self) -> EngineResult<String> {
        if self.refresh_token.is_empty() {
            return Err(external_error("No refresh token configured"));
        }

        let params = [
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("refresh_token", self.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];

        let response = self
            .client
            .post(&self.token_url)
            .form(&params)
            .send()
            .await
            .map_err(|e| external_error(&format!("Failed to refresh token: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error response".to_string());
            return Err(external_error(&format!(
                "Failed to refresh token: HTTP {} - {}",
                status, error_body
            )));
        }

        let new_token: Value = response
            .json()
            .await
            .map_err(|e| external_error(&format!("Failed to parse token response: {}", e)))?;

        let access_token = new_token
            .get("access_token")
            .and_then(|t| t.as_str())
            .ok_or_else(|| external_error("Token response missing 'access_token' field"))?
            .to_string();

        let expires_in = new_token
            .get("expires_in")
            .and_then(|v| v.as_i64())
            .unwrap_or(3600);

        let mut state = self.state.write().await;
        state.access_token = Some(access_token.clone());
        state.expires_at = Some(Utc::now().timestamp() + expires_in);
        info!("Refreshed external API access token");

        Ok(access_token)
    }
}
