//! Service-account access tokens for the admin API.

use std::time::{Duration, Instant};

use serde::Deserialize;
use tokio::sync::Mutex;
use url::Url;

use crate::keycloak::types::{KeycloakError, KeycloakResult};

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: u64,
}

fn default_expires_in() -> u64 {
    60
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    refresh_at: Instant,
}

/// Client-credentials token source with an in-memory cache.
///
/// The mutex is held across the token request so concurrent callers wait for
/// one refresh instead of each issuing their own.
pub struct ServiceAccountTokens {
    token_url: Url,
    client_id: String,
    client_secret: String,
    refresh_margin: Duration,
    cached: Mutex<Option<CachedToken>>,
}

impl ServiceAccountTokens {
    pub fn new(
        token_url: Url,
        client_id: String,
        client_secret: String,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            token_url,
            client_id,
            client_secret,
            refresh_margin,
            cached: Mutex::new(None),
        }
    }

    /// Return a valid access token, requesting a new one when needed.
    pub async fn access_token(&self, http: &reqwest::Client) -> KeycloakResult<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref() {
            if Instant::now() < token.refresh_at {
                return Ok(token.access_token.clone());
            }
        }

        tracing::debug!(client_id = %self.client_id, "Requesting service-account token");
        let response = http
            .post(self.token_url.clone())
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, "Service-account token request rejected");
            return Err(KeycloakError::Token(format!("{}: {}", status, body)));
        }

        let token: TokenResponse = response.json().await?;
        let lifetime = Duration::from_secs(token.expires_in).saturating_sub(self.refresh_margin);
        *cached = Some(CachedToken {
            access_token: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime,
        });
        Ok(token.access_token)
    }

    /// Drop the cached token so the next call fetches a fresh one.
    pub async fn invalidate(&self) {
        *self.cached.lock().await = None;
    }
}
