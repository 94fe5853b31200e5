// src/fetch/auth.rs

use anyhow::{anyhow, Context, Result};
use reqwest::Client;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{debug, info};
use url::Url;

use super::types::{TokenRequest, TokenResponse};

const TOKEN_PATH: &str = "auth/v3/tenant_access_token/internal";
const AUTH_TIMEOUT: Duration = Duration::from_secs(10);
/// Tokens are refreshed this long before they would expire.
const EXPIRY_MARGIN: Duration = Duration::from_secs(300);
const DEFAULT_LIFETIME: Duration = Duration::from_secs(2 * 3600);

#[derive(Clone, Debug)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

impl CachedToken {
    fn new(value: String, lifetime: Duration, now: Instant) -> Self {
        Self {
            value,
            refresh_at: now + lifetime.saturating_sub(EXPIRY_MARGIN),
        }
    }

    fn is_fresh(&self, now: Instant) -> bool {
        now < self.refresh_at
    }
}

/// Exchanges app credentials for a tenant bearer token and caches it until
/// shortly before it expires.
pub struct TokenCache {
    http: Client,
    token_url: Url,
    app_id: String,
    app_secret: String,
    cached: Mutex<Option<CachedToken>>,
}

impl TokenCache {
    pub fn new(http: Client, api_base: &Url, app_id: &str, app_secret: &str) -> Result<Self> {
        let token_url = api_base
            .join(TOKEN_PATH)
            .with_context(|| format!("building token url from {}", api_base))?;
        Ok(Self {
            http,
            token_url,
            app_id: app_id.to_string(),
            app_secret: app_secret.to_string(),
            cached: Mutex::new(None),
        })
    }

    /// A valid bearer token, exchanging credentials only when needed.
    pub async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(tok) = cached.as_ref().filter(|t| t.is_fresh(Instant::now())) {
            debug!("reusing cached access token");
            return Ok(tok.value.clone());
        }

        let fresh = self.exchange().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    async fn exchange(&self) -> Result<CachedToken> {
        info!("requesting tenant access token");
        let resp: TokenResponse = self
            .http
            .post(self.token_url.clone())
            .timeout(AUTH_TIMEOUT)
            .json(&TokenRequest {
                app_id: &self.app_id,
                app_secret: &self.app_secret,
            })
            .send()
            .await
            .with_context(|| format!("POST {}", self.token_url))?
            .error_for_status()
            .context("token exchange returned non-success status")?
            .json()
            .await
            .context("decoding token response")?;

        if resp.code != 0 {
            return Err(anyhow!("token exchange rejected: code {}: {}", resp.code, resp.msg));
        }
        let value = resp
            .tenant_access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| anyhow!("token response carried no tenant_access_token"))?;
        let lifetime = resp
            .expire
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_LIFETIME);

        Ok(CachedToken::new(value, lifetime, Instant::now()))
    }
}
