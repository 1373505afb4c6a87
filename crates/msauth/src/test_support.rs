//! Shared fixtures for tests that talk to a mock token endpoint.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockBuilder, MockServer, ResponseTemplate};

use crate::credentials::Credentials;

pub(crate) const TENANT: &str = "t1";
pub(crate) const TOKEN_PATH: &str = "/t1/oauth2/token";

pub(crate) fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// Token endpoint body expiring `offset_secs` from now (negative = already expired).
pub(crate) fn token_body(access_token: &str, offset_secs: i64) -> serde_json::Value {
    let expires_on = now_secs().saturating_add_signed(offset_secs);
    json!({ "access_token": access_token, "expires_on": expires_on })
}

pub(crate) fn token_response(access_token: &str, offset_secs: i64) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(token_body(access_token, offset_secs))
}

pub(crate) fn slow_token_response(access_token: &str, delay: Duration) -> ResponseTemplate {
    token_response(access_token, 3600).set_delay(delay)
}

/// Matcher for a client-credentials POST to the t1 token endpoint.
pub(crate) fn token_request() -> MockBuilder {
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .and(body_string_contains("grant_type=client_credentials"))
}

pub(crate) fn credentials(server: &MockServer) -> Credentials {
    Credentials::new(TENANT, "a1", "s1", "https://graph.example.com").with_auth_endpoint(server.uri())
}

/// Number of requests the server has seen on `request_path`.
pub(crate) async fn hits(server: &MockServer, request_path: &str) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.path() == request_path)
        .count()
}
