//! Client-credentials grant inputs
//!
//! Immutable for the lifetime of a `TokenStore`. The client secret is held in
//! a `Secret` so it never shows up in logs or `Debug` output.

use common::Secret;

use crate::constants::AZURE_AD_AUTH_ENDPOINT_GLOBAL;
use crate::error::{Error, Result};

/// Everything needed to request a token from the authorization server.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Directory (tenant) the application is registered in
    pub tenant_id: String,
    /// Application (client) ID
    pub application_id: String,
    pub client_secret: Secret<String>,
    /// Audience of the requested token, usually the API's base URL
    pub resource: String,
    /// Authorization server base URL, e.g. `https://login.microsoftonline.com`
    pub auth_endpoint: String,
}

impl Credentials {
    /// Credentials against the global Azure AD endpoint.
    pub fn new(
        tenant_id: impl Into<String>,
        application_id: impl Into<String>,
        client_secret: impl Into<Secret<String>>,
        resource: impl Into<String>,
    ) -> Self {
        Self {
            tenant_id: tenant_id.into(),
            application_id: application_id.into(),
            client_secret: client_secret.into(),
            resource: resource.into(),
            auth_endpoint: AZURE_AD_AUTH_ENDPOINT_GLOBAL.to_string(),
        }
    }

    /// Replace the authorization server base URL.
    pub fn with_auth_endpoint(mut self, auth_endpoint: impl Into<String>) -> Self {
        self.auth_endpoint = auth_endpoint.into();
        self
    }

    /// Check the fields that must be present before a token request is sent.
    pub fn validate(&self) -> Result<()> {
        if self.tenant_id.is_empty() {
            return Err(Error::Configuration("tenant ID is empty".into()));
        }
        Ok(())
    }

    /// Token endpoint for this tenant: `{auth_endpoint}/{tenant_id}/oauth2/token`.
    pub fn token_url(&self) -> String {
        format!(
            "{}/{}/oauth2/token",
            self.auth_endpoint.trim_end_matches('/'),
            self.tenant_id
        )
    }
}
