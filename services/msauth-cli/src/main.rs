//! msauth command-line client
//!
//! Loads client-credentials configuration, authenticates against the
//! configured authorization endpoint and performs one authenticated call,
//! printing the JSON response on stdout. Logs go to stderr.
//!
//! Usage: `msauth [--config PATH] [--data JSON] [--query k=v]... [--header k:v]... [METHOD] PATH`

mod config;

use anyhow::{Context, Result, bail};
use clap::Parser;
use msauth::{CancellationToken, Client};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;

/// Perform one authenticated call against an API protected by Microsoft identity
#[derive(Parser, Debug)]
#[command(name = "msauth", version)]
struct Args {
    /// Config file (default: $MSAUTH_CONFIG, then msauth.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<String>,

    /// JSON request body
    #[arg(long, value_name = "JSON")]
    data: Option<String>,

    /// Query parameter, repeatable
    #[arg(long = "query", value_name = "KEY=VALUE", value_parser = parse_query)]
    query: Vec<(String, String)>,

    /// Request header, repeatable
    #[arg(long = "header", value_name = "NAME:VALUE", value_parser = parse_header)]
    headers: Vec<(String, String)>,

    /// HTTP method followed by the path, or just the path for a GET
    #[arg(value_name = "METHOD|PATH")]
    first: String,

    #[arg(value_name = "PATH")]
    second: Option<String>,
}

fn parse_query(pair: &str) -> std::result::Result<(String, String), String> {
    pair.split_once('=')
        .map(|(k, v)| (k.to_owned(), v.to_owned()))
        .ok_or_else(|| format!("expected key=value, got: {pair}"))
}

fn parse_header(pair: &str) -> std::result::Result<(String, String), String> {
    pair.split_once(':')
        .map(|(k, v)| (k.trim().to_owned(), v.trim().to_owned()))
        .ok_or_else(|| format!("expected name:value, got: {pair}"))
}

impl Args {
    /// Method and path from the positional arguments
    fn target(&self) -> Result<(Method, &str)> {
        match &self.second {
            None => Ok((Method::GET, self.first.as_str())),
            Some(path) => {
                let method = Method::from_bytes(self.first.to_ascii_uppercase().as_bytes())
                    .with_context(|| format!("invalid HTTP method: {}", self.first))?;
                Ok((method, path.as_str()))
            }
        }
    }

    fn header_map(&self) -> Result<HeaderMap> {
        let mut map = HeaderMap::new();
        for (name, value) in &self.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .with_context(|| format!("invalid header name: {name}"))?;
            let value = HeaderValue::from_str(value)
                .with_context(|| format!("invalid header value for {name}"))?;
            map.append(name, value);
        }
        Ok(map)
    }

    fn body(&self) -> Result<Option<serde_json::Value>> {
        self.data
            .as_deref()
            .map(serde_json::from_str)
            .transpose()
            .context("--data is not valid JSON")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output on stderr and LOG_LEVEL / RUST_LOG support
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_env("LOG_LEVEL")
                .or_else(|_| EnvFilter::try_from_default_env())
                .unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr),
        )
        .init();

    let args = Args::parse();
    let (method, path) = args.target()?;
    let headers = args.header_map()?;
    let body = args.body()?;

    let config_path = Config::resolve_path(args.config.as_deref());
    info!(path = %config_path.display(), "loading configuration");

    let config = Config::load(&config_path)
        .with_context(|| format!("failed to load config from {}", config_path.display()))?;

    info!(
        tenant_id = %config.auth.tenant_id,
        endpoint = %config.auth.auth_endpoint(),
        resource = %config.auth.resource,
        "configuration loaded"
    );

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, cancelling request");
            on_signal.cancel();
        }
    });

    let build = Client::builder()
        .credentials(config.auth.credentials()?)
        .refresh_margin(config.auth.refresh_margin())
        .timeout(config.auth.timeout())
        .build();
    let mut client = tokio::select! {
        _ = cancel.cancelled() => bail!("cancelled while authenticating"),
        client = build => client.context("authentication failed")?,
    };

    if let Some(base_url) = config.api.base_url.clone() {
        client.set_defaults(move |builder| builder.base(base_url.clone()));
    }

    let query: Vec<(&str, &str)> = args
        .query
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let response: serde_json::Value = client
        .execute(&cancel, method.clone(), path, headers, &query, body.as_ref())
        .await
        .with_context(|| format!("{method} {path} failed"))?;

    println!("{}", serde_json::to_string_pretty(&response)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> std::result::Result<Args, clap::Error> {
        Args::try_parse_from(std::iter::once("msauth").chain(args.iter().copied()))
    }

    #[test]
    fn path_only_defaults_to_get() {
        let args = parse(&["me"]).unwrap();
        let (method, path) = args.target().unwrap();
        assert_eq!(method, Method::GET);
        assert_eq!(path, "me");
        assert!(args.config.is_none());
    }

    #[test]
    fn method_is_case_insensitive() {
        let args = parse(&["patch", "users/u1"]).unwrap();
        let (method, path) = args.target().unwrap();
        assert_eq!(method, Method::PATCH);
        assert_eq!(path, "users/u1");
    }

    #[test]
    fn flags_are_collected() {
        let args = parse(&[
            "--config",
            "/etc/msauth.toml",
            "--query",
            "$select=id,displayName",
            "--query",
            "$top=5",
            "--header",
            "ConsistencyLevel: eventual",
            "--data",
            r#"{"a":1}"#,
            "POST",
            "users",
        ])
        .unwrap();
        assert_eq!(args.config.as_deref(), Some("/etc/msauth.toml"));
        assert_eq!(
            args.query,
            vec![
                ("$select".to_string(), "id,displayName".to_string()),
                ("$top".to_string(), "5".to_string()),
            ]
        );
        assert_eq!(args.target().unwrap(), (Method::POST, "users"));

        let headers = args.header_map().unwrap();
        assert_eq!(headers.get("consistencylevel").unwrap(), "eventual");
        assert_eq!(args.body().unwrap(), Some(serde_json::json!({"a": 1})));
    }

    #[test]
    fn config_flag_feeds_path_resolution() {
        let args = parse(&["--config", "/etc/msauth.toml", "me"]).unwrap();
        assert_eq!(
            Config::resolve_path(args.config.as_deref()),
            std::path::PathBuf::from("/etc/msauth.toml")
        );
    }

    #[test]
    fn rejects_bad_input() {
        assert!(parse(&[]).is_err(), "path is required");
        assert!(parse(&["--bogus", "me"]).is_err());
        assert!(parse(&["--query", "novalue", "me"]).is_err());
        assert!(parse(&["--header", "novalue", "me"]).is_err());
        assert!(parse(&["GET", "me", "extra"]).is_err());
        assert!(parse(&["--config"]).is_err());

        let args = parse(&["GE T", "me"]).unwrap();
        assert!(args.target().is_err());

        let args = parse(&["--data", "{not json", "me"]).unwrap();
        assert!(args.body().is_err());
    }

    #[test]
    fn command_definition_is_consistent() {
        use clap::CommandFactory;
        Args::command().debug_assert();
    }
}
