//! Request builder handed out by `Client`
//!
//! Each builder is independent: headers, query parameters and body set on one
//! never leak into another. The URL is resolved at send time, so a default
//! customizer can set a base URL and callers then pass paths relative to it.

use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use reqwest::{Method, StatusCode, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::{Error, Result};
use crate::metrics;

/// Builder for one authenticated request over the shared transport.
#[derive(Debug, Clone)]
pub struct RequestBuilder {
    http_client: reqwest::Client,
    method: Method,
    base: Option<String>,
    path: String,
    headers: HeaderMap,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
}

impl RequestBuilder {
    pub(crate) fn new(http_client: reqwest::Client) -> Self {
        Self {
            http_client,
            method: Method::GET,
            base: None,
            path: String::new(),
            headers: HeaderMap::new(),
            query: Vec::new(),
            body: None,
        }
    }

    /// Base URL that paths are resolved against.
    ///
    /// Follows RFC 3986 reference resolution: with base
    /// `https://graph.microsoft.com/v1.0/`, path `me` resolves to
    /// `https://graph.microsoft.com/v1.0/me` while `/me` resolves to
    /// `https://graph.microsoft.com/me`.
    pub fn base(mut self, base: impl Into<String>) -> Self {
        self.base = Some(base.into());
        self
    }

    /// Path (or absolute URL) of the request.
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn method(mut self, method: Method) -> Self {
        self.method = method;
        self
    }

    /// Set a header, replacing any existing values for that name.
    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    /// Append all of `headers`, keeping values already present.
    pub fn headers(mut self, headers: HeaderMap) -> Self {
        let mut last_name = None;
        for (name, value) in headers {
            // HeaderMap yields None for repeated values of the same name
            if let Some(name) = name {
                last_name = Some(name);
            }
            if let Some(name) = &last_name {
                self.headers.append(name.clone(), value);
            }
        }
        self
    }

    /// Append query parameters.
    pub fn query<K, V>(mut self, params: &[(K, V)]) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        self.query.extend(
            params
                .iter()
                .map(|(k, v)| (k.as_ref().to_owned(), v.as_ref().to_owned())),
        );
        self
    }

    /// Send `body` as JSON.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self> {
        let bytes = serde_json::to_vec(body)
            .map_err(|e| Error::InvalidRequest(format!("body is not serializable: {e}")))?;
        self.body = Some(bytes);
        Ok(self)
    }

    /// Resolved request URL.
    pub fn url(&self) -> Result<Url> {
        let resolved = match &self.base {
            Some(base) => Url::parse(base).and_then(|base| base.join(&self.path)),
            None => Url::parse(&self.path),
        };
        resolved.map_err(|e| {
            Error::InvalidRequest(format!(
                "cannot resolve URL (base {:?}, path {:?}): {e}",
                self.base, self.path
            ))
        })
    }

    /// Send the request. Cancellation aborts with `Error::Cancelled`.
    pub async fn send(self, cancel: &CancellationToken) -> Result<reqwest::Response> {
        let url = self.url()?;
        let method = self.method.clone();

        let mut request = self
            .http_client
            .request(self.method, url)
            .headers(self.headers);
        if !self.query.is_empty() {
            request = request.query(&self.query);
        }
        if let Some(body) = self.body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            sent = request.send() => sent.map_err(|e| Error::Transport(format!("request failed: {e}")))?,
        };

        let status = response.status();
        debug!(%method, url = %response.url(), status = status.as_u16(), "request completed");
        metrics::record_request(method.as_str(), status.as_u16());
        Ok(response)
    }

    /// Send the request and decode the JSON response.
    ///
    /// Non-success statuses become `Error::Api` with the raw body.
    pub async fn receive<T: DeserializeOwned>(self, cancel: &CancellationToken) -> Result<T> {
        let response = self.send(cancel).await?;
        let status = response.status();

        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            body = response.bytes() => body.map_err(|e| Error::Transport(format!("reading response failed: {e}")))?,
        };

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                body: String::from_utf8_lossy(&body).into_owned(),
            });
        }

        decode_body(status, &body)
    }
}

/// Decode a success body. Empty bodies (204, 205) decode from `null`.
fn decode_body<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T> {
    if body.is_empty() {
        return serde_json::from_value(serde_json::Value::Null).map_err(|_| {
            Error::Transport(format!(
                "empty response ({}) cannot be decoded into the requested type",
                status.as_u16()
            ))
        });
    }
    serde_json::from_slice(body)
        .map_err(|e| Error::Transport(format!("invalid response body: {e}")))
}
