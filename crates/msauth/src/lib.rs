//! Client-credentials authentication for Microsoft identity platform APIs
//!
//! Produces an HTTP client that acquires a token from the v1 token endpoint
//! (`{endpoint}/{tenant}/oauth2/token`), caches it in memory and refreshes it
//! just-in-time before attaching it to each request. Tokens are never
//! persisted.
//!
//! Request flow:
//! 1. `Client::new()` builds the transport and performs the first refresh
//! 2. Each `Client::execute()` asks the `TokenStore` for a valid token
//! 3. Expired (or inside the refresh margin) → one refresh, shared by all
//!    concurrent callers
//! 4. The token goes into the `Authorization` header, the default customizer
//!    runs, and the request is sent once

pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
mod metrics;
pub mod request;
pub mod store;
pub mod token;

#[cfg(test)]
mod test_support;

pub use client::{Client, ClientBuilder, DEFAULT_TIMEOUT, Defaults};
pub use constants::*;
pub use credentials::Credentials;
pub use error::{Error, Result};
pub use request::RequestBuilder;
pub use store::TokenStore;
pub use token::{AuthError, Token, request_token};
pub use tokio_util::sync::CancellationToken;
