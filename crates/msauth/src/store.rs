//! In-memory token cache with single-flight refresh
//!
//! `TokenStore` owns the only copy of the current token. The check-and-refresh
//! sequence runs while holding a tokio `Mutex`, so when many callers observe an
//! expired token at once exactly one of them talks to the token endpoint and
//! the rest wait for its result.
//!
//! States: no token (treated as expired) → valid → expired → valid → ...
//! A failed refresh leaves whatever token was stored untouched.

use std::time::{Duration, SystemTime};

use tokio::sync::Mutex;
use tracing::{debug, info};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::metrics;
use crate::token::{self, Token};

/// Token cache for one set of credentials.
pub struct TokenStore {
    credentials: Credentials,
    http_client: reqwest::Client,
    /// Refresh this long before the token actually expires
    refresh_margin: Duration,
    current: Mutex<Option<Token>>,
}

impl TokenStore {
    /// Create an empty store. No token is requested until first use.
    pub fn new(
        credentials: Credentials,
        http_client: reqwest::Client,
        refresh_margin: Duration,
    ) -> Self {
        Self {
            credentials,
            http_client,
            refresh_margin,
            current: Mutex::new(None),
        }
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn refresh_margin(&self) -> Duration {
        self.refresh_margin
    }

    /// Unconditionally request a new token and store it.
    pub async fn refresh(&self) -> Result<()> {
        let mut current = self.current.lock().await;
        self.refresh_locked(&mut current).await
    }

    /// Access token that is valid for at least `refresh_margin`, refreshing
    /// first if needed.
    pub async fn get_valid_token(&self) -> Result<String> {
        self.valid_token()
            .await
            .map(|token| token.access_token().to_owned())
    }

    /// Full token (with token type) for building the `Authorization` header.
    pub(crate) async fn valid_token(&self) -> Result<Token> {
        let mut current = self.current.lock().await;

        let stale = current
            .as_ref()
            .is_none_or(|token| token.needs_refresh(self.refresh_margin));
        if stale {
            debug!(tenant_id = %self.credentials.tenant_id, "token missing or expiring, refreshing");
            self.refresh_locked(&mut current).await?;
        }

        current
            .clone()
            .ok_or_else(|| Error::Transport("no token available after refresh".into()))
    }

    /// Drop the cached token so the next call refreshes, e.g. after a
    /// downstream API rejected it.
    pub async fn invalidate(&self) {
        let mut current = self.current.lock().await;
        if current.take().is_some() {
            debug!(tenant_id = %self.credentials.tenant_id, "cached token invalidated");
        }
    }

    /// Expiry of the cached token, if there is one.
    pub async fn expires_at(&self) -> Option<SystemTime> {
        self.current.lock().await.as_ref().map(Token::expires_on)
    }

    /// Replace `slot` only once a complete token has been decoded.
    async fn refresh_locked(&self, slot: &mut Option<Token>) -> Result<()> {
        let result = token::request_token(&self.http_client, &self.credentials).await;
        metrics::record_refresh(result.as_ref().map(|_| ()));
        let token = result?;

        let expires_in_secs = token
            .expires_on()
            .duration_since(SystemTime::now())
            .map(|d| d.as_secs())
            .unwrap_or(0);
        info!(
            tenant_id = %self.credentials.tenant_id,
            expires_in_secs,
            "token refreshed"
        );

        *slot = Some(token);
        Ok(())
    }
}
