//! # Client Factory
//!
//! Picks connection parameters from [`CacheSettings`] and builds a
//! [`KVClient`]. The decision is re-evaluated on every call.
//!
//! - URL branch: host, port and password come from the URL; the session runs
//!   over TLS with certificate verification disabled, whatever the scheme.
//! - Fallback branch: `host`/`port`, plain TCP, database 0, no password.

use pkv_client::{ClientConfig, Endpoint, KVClient, Security};
use tracing::debug;
use url::{Host, Url};

use crate::settings::{CacheSettings, DEFAULT_HOST, DEFAULT_PORT};

/// Builds a client handle for the configured cache.
///
/// Never fails and never dials: a malformed URL or an unreachable host is
/// reported by the handle's first command.
pub fn redis_instance(settings: &CacheSettings) -> KVClient {
    KVClient::new(client_config(settings))
}

/// Resolves the client configuration [`redis_instance`] would use.
pub fn client_config(settings: &CacheSettings) -> ClientConfig {
    match settings.connection_url() {
        Some(url) => from_url(url),
        None => from_host_port(&settings.host, settings.port),
    }
}

fn from_url(raw: &str) -> ClientConfig {
    let (endpoint, password) = match Url::parse(raw) {
        Ok(url) => {
            let host = match url.host() {
                Some(Host::Domain(domain)) => domain.to_ascii_lowercase(),
                Some(Host::Ipv4(addr)) => addr.to_string(),
                Some(Host::Ipv6(addr)) => addr.to_string(),
                None => DEFAULT_HOST.to_string(),
            };
            let port = url.port().unwrap_or(DEFAULT_PORT);
            (Endpoint::tcp(host, port), url.password().map(str::to_string))
        }
        // The raw URL may hold a password, so it is kept out of the endpoint.
        Err(err) => (
            Endpoint::Unparsable {
                input: "connection url".to_string(),
                reason: err.to_string(),
            },
            None,
        ),
    };

    debug!(
        branch = "url",
        endpoint = %endpoint,
        auth = password.is_some(),
        "building cache client over tls without certificate verification"
    );

    ClientConfig {
        endpoint,
        password,
        db: 0,
        security: Security::Tls {
            verify_certificates: false,
        },
        ..ClientConfig::default()
    }
}

fn from_host_port(host: &str, port: u16) -> ClientConfig {
    let endpoint = Endpoint::tcp(host, port);
    debug!(branch = "host_port", endpoint = %endpoint, "building cache client");

    ClientConfig {
        endpoint,
        password: None,
        db: 0,
        security: Security::Plain,
        ..ClientConfig::default()
    }
}
