// courier-core/src/auth.rs

//! Bearer-token acquisition for the productivity API.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

use crate::config::{Credentials, GraphConfig};
use crate::errors::AuthError;

/// Tokens are renewed this long before the issuer says they expire.
const EXPIRY_SKEW: Duration = Duration::from_secs(60);

/// Anything that can hand out a currently valid bearer token.
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, AuthError>;

    /// Headers every productivity API request carries.
    async fn auth_headers(&self) -> Result<HeaderMap, AuthError> {
        let token = self.access_token().await?;
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| AuthError::InvalidHeader)?;
        headers.insert(AUTHORIZATION, bearer);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        Ok(headers)
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    access_token: String,
    expires_at: Instant,
}

impl CachedToken {
    fn is_fresh(&self, now: Instant) -> bool {
        now + EXPIRY_SKEW < self.expires_at
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: Option<String>,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

/// OAuth2 client-credentials flow against the Microsoft identity platform.
///
/// Lookups first try the in-memory cache ("silent" acquisition) and only go
/// to the token endpoint when that token is missing or about to expire.
pub struct ClientCredentialProvider {
    http_client: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    scope: String,
    cache: Mutex<Option<CachedToken>>,
}

impl ClientCredentialProvider {
    pub fn new(http_client: Client, credentials: &Credentials, graph: &GraphConfig) -> Self {
        let token_url = format!(
            "{}/{}/oauth2/v2.0/token",
            graph.authority.trim_end_matches('/'),
            credentials.tenant_id
        );
        Self {
            http_client,
            token_url,
            client_id: credentials.client_id.clone(),
            client_secret: credentials.client_secret.clone(),
            scope: graph.scope.clone(),
            cache: Mutex::new(None),
        }
    }

    /// Acquires a token eagerly so a bad registration fails at startup
    /// instead of on the first tool call.
    pub async fn authenticate(&self) -> Result<(), AuthError> {
        self.access_token().await.map(|_| ())
    }

    async fn acquire_for_client(&self) -> Result<CachedToken, AuthError> {
        debug!(token_url = %self.token_url, "Requesting client-credentials token.");
        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        let response = self
            .http_client
            .post(&self.token_url)
            .form(&form)
            .send()
            .await
            .map_err(AuthError::Transport)?;

        let status = response.status();
        let body = response.text().await.map_err(AuthError::Transport)?;
        let parsed: TokenResponse = serde_json::from_str(&body).map_err(|e| {
            AuthError::MalformedResponse(format!("status {}: {}", status.as_u16(), e))
        })?;

        match parsed.access_token {
            Some(access_token) if status.is_success() => {
                let lifetime = Duration::from_secs(parsed.expires_in.unwrap_or(3600));
                info!(expires_in = lifetime.as_secs(), "Acquired access token.");
                Ok(CachedToken {
                    access_token,
                    expires_at: Instant::now() + lifetime,
                })
            }
            _ => {
                let description = parsed
                    .error_description
                    .or(parsed.error)
                    .unwrap_or_else(|| format!("token endpoint returned {}", status.as_u16()));
                warn!(status = status.as_u16(), %description, "Token request rejected.");
                Err(AuthError::Rejected { description })
            }
        }
    }
}

#[async_trait]
impl TokenSource for ClientCredentialProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let mut cache = self.cache.lock().await;
        if let Some(token) = cache.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            return Ok(token.access_token.clone());
        }
        let token = self.acquire_for_client().await?;
        let access_token = token.access_token.clone();
        *cache = Some(token);
        Ok(access_token)
    }
}
