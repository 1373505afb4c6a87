//! Authenticated client
//!
//! `Client` pairs a `TokenStore` with the shared HTTP transport. Every request
//! goes through [`Client::request_builder`], which re-checks token validity,
//! refreshes if needed, and only then attaches the `Authorization` header.
//! A failed refresh means no downstream request is sent.

use std::sync::Arc;
use std::time::Duration;

use common::Secret;
use reqwest::Method;
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::credentials::Credentials;
use crate::error::{Error, Result};
use crate::request::RequestBuilder;
use crate::store::TokenStore;

/// Default timeout of the transport built by `Client`
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Customizer applied to every request builder, e.g. to set a base URL.
pub type Defaults = Arc<dyn Fn(RequestBuilder) -> RequestBuilder + Send + Sync>;

/// HTTP client that keeps a client-credentials token valid and attaches it to
/// every request.
///
/// Cheap to clone; clones share the token cache and transport.
#[derive(Clone)]
pub struct Client {
    store: Arc<TokenStore>,
    http_client: reqwest::Client,
    defaults: Option<Defaults>,
}

impl Client {
    /// Connect to the global Azure AD endpoint and acquire the first token.
    pub async fn new(
        tenant_id: impl Into<String>,
        application_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
        resource: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .credentials(Credentials::new(
                tenant_id,
                application_id,
                client_secret,
                resource,
            ))
            .build()
            .await
    }

    /// Like [`Client::new`] against a custom authorization endpoint (see
    /// [`crate::constants`] for the sovereign clouds).
    pub async fn with_endpoint(
        tenant_id: impl Into<String>,
        application_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
        auth_endpoint: impl Into<String>,
        resource: impl Into<String>,
    ) -> Result<Self> {
        Self::builder()
            .credentials(
                Credentials::new(tenant_id, application_id, client_secret, resource)
                    .with_auth_endpoint(auth_endpoint),
            )
            .build()
            .await
    }

    pub fn builder() -> ClientBuilder {
        ClientBuilder::default()
    }

    /// Install the customizer applied to every request builder.
    pub fn set_defaults<F>(&mut self, defaults: F)
    where
        F: Fn(RequestBuilder) -> RequestBuilder + Send + Sync + 'static,
    {
        self.defaults = Some(Arc::new(defaults));
    }

    /// Token cache backing this client.
    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// Fresh request builder with a valid token attached and defaults applied.
    pub async fn request_builder(&self) -> Result<RequestBuilder> {
        let token = self.store.valid_token().await?;

        let mut authorization = HeaderValue::from_str(&token.authorization_value())
            .map_err(|_| Error::Transport("access token is not a valid header value".into()))?;
        authorization.set_sensitive(true);

        let builder = RequestBuilder::new(self.http_client.clone()).header(AUTHORIZATION, authorization);
        Ok(match &self.defaults {
            Some(defaults) => defaults(builder),
            None => builder,
        })
    }

    /// Run one authenticated call and decode its JSON response.
    ///
    /// Token validity is checked on every call. Cancellation at any point,
    /// including while a refresh is in flight, returns `Error::Cancelled`.
    pub async fn execute<B, T>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        headers: HeaderMap,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        debug!(%method, path, "executing authenticated request");

        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Error::Cancelled),
            result = self.dispatch(cancel, method, path, headers, query, body) => result,
        }
    }

    async fn dispatch<B, T>(
        &self,
        cancel: &CancellationToken,
        method: Method,
        path: &str,
        headers: HeaderMap,
        query: &[(&str, &str)],
        body: Option<&B>,
    ) -> Result<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let mut builder = self
            .request_builder()
            .await?
            .method(method)
            .path(path)
            .headers(headers)
            .query(query);
        if let Some(body) = body {
            builder = builder.json(body)?;
        }
        builder.receive(cancel).await
    }

    /// `GET path` with no extra headers, query or body.
    pub async fn get<T: DeserializeOwned>(&self, cancel: &CancellationToken, path: &str) -> Result<T> {
        self.execute::<(), T>(cancel, Method::GET, path, HeaderMap::new(), &[], None)
            .await
    }
}

/// Builder for [`Client`].
#[derive(Default)]
pub struct ClientBuilder {
    credentials: Option<Credentials>,
    refresh_margin: Duration,
    timeout: Option<Duration>,
    http_client: Option<reqwest::Client>,
}

impl ClientBuilder {
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    /// Refresh this long before expiry. Defaults to zero: refresh once the
    /// token has expired.
    pub fn refresh_margin(mut self, margin: Duration) -> Self {
        self.refresh_margin = margin;
        self
    }

    /// Timeout for the built-in transport. Ignored with [`Self::http_client`].
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Use an existing transport instead of building one.
    pub fn http_client(mut self, http_client: reqwest::Client) -> Self {
        self.http_client = Some(http_client);
        self
    }

    /// Build the client and acquire its first token.
    ///
    /// Fails if the first refresh fails, so a returned client always held a
    /// valid token at construction.
    pub async fn build(self) -> Result<Client> {
        let credentials = self
            .credentials
            .ok_or_else(|| Error::Configuration("credentials not set".into()))?;

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder()
                .timeout(self.timeout.unwrap_or(DEFAULT_TIMEOUT))
                .build()
                .map_err(|e| Error::Transport(format!("building HTTP client failed: {e}")))?,
        };

        let store = TokenStore::new(credentials, http_client.clone(), self.refresh_margin);
        store.refresh().await?;
        info!(
            tenant_id = %store.credentials().tenant_id,
            application_id = %store.credentials().application_id,
            "client authenticated"
        );

        Ok(Client {
            store: Arc::new(store),
            http_client,
            defaults: None,
        })
    }
}
