//! Error types for token acquisition and authenticated calls

use serde::de::DeserializeOwned;

use crate::token::AuthError;

/// Errors from token refresh and authenticated request dispatch.
///
/// Nothing in this crate retries: every variant is returned to the caller of
/// the operation that produced it.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required credential field is missing or invalid. Raised before any
    /// network call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Network failure, timeout or malformed response.
    #[error("transport error: {0}")]
    Transport(String),

    /// The authorization server rejected the credentials.
    #[error("authentication failed: {}: {}", .0.error, .0.error_description)]
    Authentication(Box<AuthError>),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller-built request could not be formed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The downstream API answered with a non-success status.
    #[error("API returned {status}: {body}")]
    Api { status: u16, body: String },
}

impl Error {
    /// Authorization server error code (e.g. `invalid_client`), if this is an
    /// authentication failure.
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::Authentication(auth) => Some(&auth.error),
            _ => None,
        }
    }

    /// Human-readable description from the authorization server.
    pub fn description(&self) -> Option<&str> {
        match self {
            Error::Authentication(auth) => Some(&auth.error_description),
            _ => None,
        }
    }

    /// Decode the body of an [`Error::Api`] into the API's error type.
    pub fn api_body<E: DeserializeOwned>(&self) -> Option<E> {
        match self {
            Error::Api { body, .. } => serde_json::from_str(body).ok(),
            _ => None,
        }
    }
}

/// Result alias for msauth operations.
pub type Result<T> = std::result::Result<T, Error>;
