//! Client-credentials token request and response decoding
//!
//! The token endpoint answers either with a token or with an error payload.
//! The error payload is authoritative: a body carrying a non-empty `error`
//! field is a rejection even when the HTTP status says success.

use std::fmt;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::Deserialize;
use tracing::debug;

use crate::credentials::Credentials;
use crate::error::{Error, Result};

/// An access token and its absolute expiry.
///
/// Replaced wholesale on every refresh; never mutated in place.
#[derive(Clone)]
pub struct Token {
    access_token: String,
    token_type: Option<String>,
    expires_on: SystemTime,
    resource: Option<String>,
}

impl Token {
    pub fn new(access_token: impl Into<String>, expires_on: SystemTime) -> Self {
        Self {
            access_token: access_token.into(),
            token_type: None,
            expires_on,
            resource: None,
        }
    }

    pub fn access_token(&self) -> &str {
        &self.access_token
    }

    /// Token type reported by the server, usually `Bearer`.
    pub fn token_type(&self) -> Option<&str> {
        self.token_type.as_deref()
    }

    pub fn expires_on(&self) -> SystemTime {
        self.expires_on
    }

    /// Resource (audience) the server issued the token for.
    pub fn resource(&self) -> Option<&str> {
        self.resource.as_deref()
    }

    /// Whether the token expires within `margin` from now.
    pub fn needs_refresh(&self, margin: Duration) -> bool {
        self.needs_refresh_at(SystemTime::now(), margin)
    }

    /// Whether the token expires within `margin` of `now`.
    pub fn needs_refresh_at(&self, now: SystemTime, margin: Duration) -> bool {
        match now.checked_add(margin) {
            Some(deadline) => self.expires_on <= deadline,
            None => true,
        }
    }

    /// Value for the `Authorization` header.
    ///
    /// `{token_type} {access_token}` when the server named a token type,
    /// otherwise the bare access token.
    pub fn authorization_value(&self) -> String {
        match self.token_type.as_deref() {
            Some(token_type) if !token_type.is_empty() => {
                format!("{token_type} {}", self.access_token)
            }
            _ => self.access_token.clone(),
        }
    }
}

impl fmt::Debug for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Token")
            .field("access_token", &"[REDACTED]")
            .field("token_type", &self.token_type)
            .field("expires_on", &self.expires_on)
            .field("resource", &self.resource)
            .finish()
    }
}

/// Error payload returned by the authorization server.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AuthError {
    pub error: String,
    pub error_description: String,
    pub error_codes: Vec<i64>,
    pub timestamp: String,
    pub trace_id: String,
    pub correlation_id: String,
    pub error_uri: String,
}

/// Seconds value that the v1 endpoint sends as a numeric string and other
/// servers send as a JSON number.
#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Number(u64),
    Text(String),
}

impl Seconds {
    fn value(&self, field: &str) -> Result<u64> {
        match self {
            Seconds::Number(n) => Ok(*n),
            Seconds::Text(s) => s.trim().parse().map_err(|_| {
                Error::Transport(format!("invalid token response: {field} is not a number: {s}"))
            }),
        }
    }
}

/// Success body from the token endpoint. Only the fields the token lifecycle
/// needs are decoded.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    token_type: Option<String>,
    /// Absolute expiry, unix seconds
    #[serde(default)]
    expires_on: Option<Seconds>,
    /// Lifetime in seconds from the response time
    #[serde(default)]
    expires_in: Option<Seconds>,
    #[serde(default)]
    resource: Option<String>,
}

impl TokenResponse {
    fn into_token(self, now: SystemTime) -> Result<Token> {
        if self.access_token.is_empty() {
            return Err(Error::Transport(
                "invalid token response: access_token is empty".into(),
            ));
        }

        let expires_on = match (&self.expires_on, &self.expires_in) {
            (Some(on), _) => UNIX_EPOCH
                .checked_add(Duration::from_secs(on.value("expires_on")?))
                .ok_or_else(|| out_of_range("expires_on"))?,
            (None, Some(delta)) => now
                .checked_add(Duration::from_secs(delta.value("expires_in")?))
                .ok_or_else(|| out_of_range("expires_in"))?,
            (None, None) => {
                return Err(Error::Transport(
                    "invalid token response: neither expires_on nor expires_in present".into(),
                ));
            }
        };

        Ok(Token {
            access_token: self.access_token,
            token_type: self.token_type,
            expires_on,
            resource: self.resource,
        })
    }
}

fn out_of_range(field: &str) -> Error {
    Error::Transport(format!("invalid token response: {field} out of range"))
}

/// Request a fresh token with the client-credentials grant.
///
/// Fails with `Configuration` before touching the network if the credentials
/// are incomplete.
pub async fn request_token(client: &reqwest::Client, credentials: &Credentials) -> Result<Token> {
    credentials.validate()?;

    let url = credentials.token_url();
    debug!(tenant_id = %credentials.tenant_id, %url, "requesting client-credentials token");

    let response = client
        .post(&url)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", credentials.application_id.as_str()),
            ("client_secret", credentials.client_secret.expose().as_str()),
            ("resource", credentials.resource.as_str()),
        ])
        .send()
        .await
        .map_err(|e| Error::Transport(format!("token request failed: {e}")))?;

    let status = response.status();
    let body = response
        .bytes()
        .await
        .map_err(|e| Error::Transport(format!("reading token response failed: {e}")))?;

    decode_token_response(status, &body, SystemTime::now())
}

/// Turn a token endpoint response into a token or the matching error.
fn decode_token_response(
    status: reqwest::StatusCode,
    body: &[u8],
    now: SystemTime,
) -> Result<Token> {
    if let Ok(auth_error) = serde_json::from_slice::<AuthError>(body)
        && !auth_error.error.is_empty()
    {
        return Err(Error::Authentication(Box::new(auth_error)));
    }

    if !status.is_success() {
        return Err(Error::Transport(format!(
            "token endpoint returned {status}: {}",
            String::from_utf8_lossy(body)
        )));
    }

    serde_json::from_slice::<TokenResponse>(body)
        .map_err(|e| Error::Transport(format!("invalid token response: {e}")))?
        .into_token(now)
}
