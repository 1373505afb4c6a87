//! Metrics emitted through the `metrics` facade
//!
//! - `msauth_token_refresh_total` (counter): label `outcome`
//! - `msauth_requests_total` (counter): labels `method`, `status`
//!
//! Installing a recorder is left to the embedding application; without one
//! these calls are no-ops.

use crate::error::Error;

/// Record a token refresh attempt by outcome.
pub(crate) fn record_refresh(result: Result<(), &Error>) {
    let outcome = match result {
        Ok(()) => "success",
        Err(Error::Authentication(_)) => "auth_error",
        Err(Error::Configuration(_)) => "config_error",
        Err(_) => "transport_error",
    };
    metrics::counter!("msauth_token_refresh_total", "outcome" => outcome).increment(1);
}

/// Record a completed authenticated request.
pub(crate) fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "msauth_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
