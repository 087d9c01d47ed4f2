use crate::domain::model::AccessToken;
use crate::domain::ports::{Clock, TokenStore};
use crate::utils::error::{AstroError, HttpFailure, Result};
use chrono::Duration;
use reqwest::Client;
use serde::Deserialize;
use std::sync::Arc;

/// 預設的安全邊際：寫入快取時從上游宣告的有效期扣除
pub const DEFAULT_SAFETY_MARGIN_SECS: i64 = 300;

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
}

/// OAuth2 client-credentials 權杖代理。
///
/// 快取命中時不發出任何請求。兩個請求同時遇到冷快取時可能各自向 token 端點取一次，
/// 以後寫入者為準；權杖發放是冪等的，所以不加 single-flight。
pub struct TokenBroker {
    client: Client,
    token_url: String,
    store: Arc<dyn TokenStore>,
    clock: Arc<dyn Clock>,
    safety_margin: Duration,
    timeout: std::time::Duration,
}

impl TokenBroker {
    pub fn new(
        client: Client,
        token_url: impl Into<String>,
        store: Arc<dyn TokenStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            client,
            token_url: token_url.into(),
            store,
            clock,
            safety_margin: Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS),
            timeout: std::time::Duration::from_secs(20),
        }
    }

    pub fn with_safety_margin(mut self, seconds: i64) -> Self {
        self.safety_margin = Duration::try_seconds(seconds.max(0))
            .unwrap_or_else(|| Duration::seconds(DEFAULT_SAFETY_MARGIN_SECS));
        self
    }

    pub fn with_timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn get_access_token(&self, client_id: &str, client_secret: &str) -> Result<String> {
        if client_id.trim().is_empty() || client_secret.trim().is_empty() {
            tracing::error!("❌ CLIENT_ID or CLIENT_SECRET is not configured");
            return Err(AstroError::config("API credentials are not configured."));
        }

        if let Some(token) = self.store.load(self.clock.now()) {
            tracing::debug!("Using cached access token (expires at {})", token.expires_at);
            return Ok(token.value);
        }

        tracing::info!("🔑 Fetching new access token from {}", self.token_url);

        let response = self
            .client
            .post(&self.token_url)
            .timeout(self.timeout)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", client_id),
                ("client_secret", client_secret),
            ])
            .send()
            .await
            .map_err(|e| AstroError::AuthenticationError {
                status: None,
                body: HttpFailure::from_reqwest(&e).message,
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| AstroError::AuthenticationError {
                status: Some(status.as_u16()),
                body: e.to_string(),
            })?;

        if !status.is_success() {
            tracing::error!("❌ Token endpoint responded with status {}", status);
            return Err(AstroError::AuthenticationError {
                status: Some(status.as_u16()),
                body,
            });
        }

        let parsed: TokenResponse =
            serde_json::from_str(&body).map_err(|e| AstroError::AuthenticationError {
                status: Some(status.as_u16()),
                body: format!("invalid token response: {}", e),
            })?;

        // 扣掉安全邊際後存入，讀取時只需比較 expires_at > now
        let expires_at = Duration::try_seconds(parsed.expires_in)
            .and_then(|lifetime| self.clock.now().checked_add_signed(lifetime))
            .and_then(|at| at.checked_sub_signed(self.safety_margin))
            .ok_or_else(|| AstroError::AuthenticationError {
                status: Some(status.as_u16()),
                body: format!("invalid expires_in: {}", parsed.expires_in),
            })?;
        self.store.store(AccessToken {
            value: parsed.access_token.clone(),
            expires_at,
        });

        tracing::info!(
            "✅ Access token cached (lifetime {}s, reusable until {})",
            parsed.expires_in,
            expires_at
        );
        Ok(parsed.access_token)
    }
}
