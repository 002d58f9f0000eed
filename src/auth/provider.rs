//! GoogleAuthProvider - resolves a user's Google access token
//!
//! Tokens are used as-is while valid. Expired tokens are refreshed through
//! Google's token endpoint and the rotated set is persisted before the token
//! is handed back, so later calls in the same or other requests see it.

use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use super::credentials::Credentials;
use super::store::CredentialStore;
use crate::config::GoogleConfig;
use crate::error::Error;
use crate::Result;

const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// Google OAuth2 token response
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    refresh_token: Option<String>,
    expires_in: Option<i64>,
    #[serde(default)]
    scope: Option<String>,
}

/// Token refresh request
#[derive(Debug, Serialize)]
struct RefreshRequest<'a> {
    client_id: &'a str,
    client_secret: &'a str,
    refresh_token: &'a str,
    grant_type: &'a str,
}

#[derive(Clone)]
pub struct GoogleAuthProvider {
    client: GoogleConfig,
    store: Arc<dyn CredentialStore>,
    http_client: Client,
    token_url: String,
}

impl GoogleAuthProvider {
    pub fn new(client: GoogleConfig, store: Arc<dyn CredentialStore>) -> Self {
        Self {
            client,
            store,
            http_client: Client::new(),
            token_url: GOOGLE_TOKEN_URL.to_string(),
        }
    }

    /// Point refreshes at a different token endpoint.
    pub fn with_token_url(mut self, url: impl Into<String>) -> Self {
        self.token_url = url.into();
        self
    }

    /// Get a usable access token for `user_id`, refreshing it first if it
    /// has expired and a refresh token is available.
    pub async fn access_token(&self, user_id: &str) -> Result<String> {
        let creds = self.connected_credentials(user_id).await?;

        if creds.is_expired() && creds.can_refresh() {
            tracing::info!(user = user_id, "Google access token expired, refreshing");
            match self.refresh(user_id, &creds).await {
                Ok(rotated) => return Ok(rotated.access_token),
                Err(e) => {
                    // The API may still accept it; if not, the 401 path reports.
                    tracing::warn!(user = user_id, "Token refresh failed: {}", e);
                }
            }
        }

        Ok(creds.access_token)
    }

    /// Refresh unconditionally. Used when the API rejected the current token.
    pub async fn force_refresh(&self, user_id: &str) -> Result<String> {
        let creds = self.connected_credentials(user_id).await?;
        if !creds.can_refresh() {
            return Err(Error::Auth(
                "Google access token expired and no refresh token is stored. Reconnect Google Classroom.".to_string(),
            ));
        }
        let rotated = self.refresh(user_id, &creds).await?;
        Ok(rotated.access_token)
    }

    /// Forget the user's stored Google tokens.
    pub async fn disconnect(&self, user_id: &str) -> Result<()> {
        self.store.delete(user_id).await?;
        tracing::info!(user = user_id, "Removed stored Google credentials");
        Ok(())
    }

    async fn connected_credentials(&self, user_id: &str) -> Result<Credentials> {
        let creds = self
            .store
            .load(user_id)
            .await?
            .filter(|c| c.classroom_connected)
            .ok_or_else(|| Error::NotConnected("Google Classroom not connected".to_string()))?;

        if creds.access_token.is_empty() {
            return Err(Error::Auth("No access token available".to_string()));
        }
        Ok(creds)
    }

    async fn refresh(&self, user_id: &str, creds: &Credentials) -> Result<Credentials> {
        let refresh_token = creds
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Auth("No refresh token available".to_string()))?;

        let request = RefreshRequest {
            client_id: &self.client.client_id,
            client_secret: &self.client.client_secret,
            refresh_token,
            grant_type: "refresh_token",
        };

        let response = self.http_client
            .post(&self.token_url)
            .form(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let error_text = response.text().await?;
            return Err(Error::Auth(format!("Token refresh failed: {}", error_text)));
        }

        let token_response: TokenResponse = response.json().await?;
        let mut fresh = Credentials::new(
            token_response.access_token,
            token_response.refresh_token,
            token_response.expires_in,
        );
        fresh.scope = token_response.scope;

        let rotated = creds.rotate(fresh);
        self.store.save(user_id, &rotated).await?;
        tracing::debug!(user = user_id, "Persisted refreshed Google token");
        Ok(rotated)
    }
}
