//! # Synchronous Client API
//!
//! Purpose: Expose a compact, blocking API for issuing Redis-compatible
//! commands over RESP2, on plain TCP or TLS.
//!
//! ## Design Principles
//! 1. **Facade Pattern**: `KVClient` hides pooling, transport and protocol details.
//! 2. **Construction Is Free**: building a handle records configuration only;
//!    bad endpoints and unreachable hosts surface on the first command.
//! 3. **Borrow-Friendly API**: Accept `&[u8]` to avoid unnecessary copies.
//! 4. **Fail Fast**: Protocol violations surface immediately as errors.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::pool::ConnectionPool;
use crate::resp::RespValue;

/// Result type for the sync client.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors surfaced by the sync client.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Network or IO failure while reading/writing.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    /// RESP2 framing or parse error.
    #[error("protocol error: {0}")]
    Protocol(&'static str),
    /// Server returned an error reply.
    #[error("server error: {}", String::from_utf8_lossy(.message))]
    Server { message: Vec<u8> },
    /// Response type did not match the expected command response.
    #[error("unexpected response")]
    UnexpectedResponse,
    /// Pool is at capacity and no idle connections are available.
    #[error("connection pool exhausted")]
    PoolExhausted,
    /// Endpoint could not be parsed or resolved.
    #[error("invalid endpoint: {0}")]
    InvalidEndpoint(String),
    /// Host is not usable as a TLS server name.
    #[error("invalid tls server name")]
    InvalidServerName,
    /// TLS configuration or session setup failed.
    #[error("tls error: {0}")]
    Tls(#[from] rustls::Error),
}

/// TTL state returned by the server, mirroring Redis semantics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientTtl {
    /// Key is missing or already expired.
    Missing,
    /// Key exists without expiration.
    NoExpiry,
    /// Key expires after the provided duration.
    ExpiresIn(Duration),
}

/// Where the pool dials.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Endpoint {
    /// Host name or IP literal plus port. Resolution happens at connect time.
    Tcp { host: String, port: u16 },
    /// Input that could not be turned into a host and port.
    ///
    /// Every connection attempt fails with [`ClientError::InvalidEndpoint`].
    Unparsable { input: String, reason: String },
}

impl Endpoint {
    /// Builds a TCP endpoint.
    pub fn tcp(host: impl Into<String>, port: u16) -> Self {
        Endpoint::Tcp {
            host: host.into(),
            port,
        }
    }

    /// Splits a `host:port` string. IPv6 hosts may be bracketed.
    ///
    /// Never fails: bad input becomes [`Endpoint::Unparsable`].
    pub fn parse(addr: &str) -> Self {
        let unparsable = |reason: &str| Endpoint::Unparsable {
            input: addr.to_string(),
            reason: reason.to_string(),
        };

        let Some((host, port)) = addr.rsplit_once(':') else {
            return unparsable("missing port");
        };
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);
        if host.is_empty() {
            return unparsable("missing host");
        }
        match port.parse::<u16>() {
            Ok(port) => Endpoint::tcp(host, port),
            Err(_) => unparsable("port is not a number in 0..=65535"),
        }
    }

    /// Host part, if the endpoint parsed.
    pub fn host(&self) -> Option<&str> {
        match self {
            Endpoint::Tcp { host, .. } => Some(host),
            Endpoint::Unparsable { .. } => None,
        }
    }

    /// Port part, if the endpoint parsed.
    pub fn port(&self) -> Option<u16> {
        match self {
            Endpoint::Tcp { port, .. } => Some(*port),
            Endpoint::Unparsable { .. } => None,
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Endpoint::Tcp { host, port } if host.contains(':') => write!(f, "[{}]:{}", host, port),
            Endpoint::Tcp { host, port } => write!(f, "{}:{}", host, port),
            Endpoint::Unparsable { input, reason } => write!(f, "{} ({})", input, reason),
        }
    }
}

/// Transport security for new connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Security {
    /// Unencrypted TCP.
    Plain,
    /// TLS over TCP.
    ///
    /// With `verify_certificates: false` any server certificate is accepted.
    /// Handshake signatures are still checked, but the peer is not authenticated.
    Tls { verify_certificates: bool },
}

impl Security {
    /// Returns true for either TLS mode.
    pub fn is_tls(&self) -> bool {
        matches!(self, Security::Tls { .. })
    }
}

/// Configuration for the synchronous client and its pool.
#[derive(Clone)]
pub struct ClientConfig {
    /// Server endpoint, e.g. `127.0.0.1:6379`.
    pub endpoint: Endpoint,
    /// Password sent with AUTH on every new connection.
    pub password: Option<String>,
    /// Logical database selected on every new connection.
    pub db: u32,
    /// Plain TCP or TLS.
    pub security: Security,
    /// Maximum idle connections kept in the pool.
    pub max_idle: usize,
    /// Maximum total connections (idle + in-use).
    pub max_total: usize,
    /// Optional TCP read timeout.
    pub read_timeout: Option<Duration>,
    /// Optional TCP write timeout.
    pub write_timeout: Option<Duration>,
    /// Optional TCP connect timeout.
    pub connect_timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            endpoint: Endpoint::tcp("127.0.0.1", 6379),
            password: None,
            db: 0,
            security: Security::Plain,
            max_idle: 8,
            max_total: 16,
            read_timeout: None,
            write_timeout: None,
            connect_timeout: None,
        }
    }
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientConfig")
            .field("endpoint", &self.endpoint)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("db", &self.db)
            .field("security", &self.security)
            .field("max_idle", &self.max_idle)
            .field("max_total", &self.max_total)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

/// Synchronous client with connection pooling.
///
/// This is a facade over the pool and RESP encoder/decoder. Each call acquires
/// a connection, executes one command, and returns the connection to the pool.
/// No connection exists until the first command runs.
#[derive(Debug)]
pub struct KVClient {
    pool: ConnectionPool,
}

impl KVClient {
    /// Creates a handle for a `host:port` address with default settings.
    pub fn connect(addr: &str) -> Self {
        Self::new(ClientConfig {
            endpoint: Endpoint::parse(addr),
            ..ClientConfig::default()
        })
    }

    /// Creates a handle with a custom configuration. Performs no I/O.
    pub fn new(config: ClientConfig) -> Self {
        KVClient {
            pool: ConnectionPool::new(config),
        }
    }

    /// Configuration this handle was built with.
    pub fn config(&self) -> &ClientConfig {
        self.pool.config()
    }

    /// Fetches a value by key.
    ///
    /// Returns `Ok(None)` when the key is missing.
    pub fn get(&self, key: &[u8]) -> ClientResult<Option<Vec<u8>>> {
        match self.call(&[b"GET", key])? {
            RespValue::Bulk(data) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a value for a key without expiration.
    pub fn set(&self, key: &[u8], value: &[u8]) -> ClientResult<()> {
        self.call(&[b"SET", key, value])?.into_ok()
    }

    /// Sets a value and attaches an expiration in seconds.
    pub fn set_with_ttl(&self, key: &[u8], value: &[u8], ttl: Duration) -> ClientResult<()> {
        let seconds = ttl.as_secs().to_string();
        self.call(&[b"SET", key, value, b"EX", seconds.as_bytes()])?
            .into_ok()
    }

    /// Deletes a key. Returns true when a key was removed.
    pub fn delete(&self, key: &[u8]) -> ClientResult<bool> {
        match self.call(&[b"DEL", key])? {
            RespValue::Integer(count) => Ok(count > 0),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Sets a time-to-live on a key. Returns true when the TTL was set.
    pub fn expire(&self, key: &[u8], ttl: Duration) -> ClientResult<bool> {
        let seconds = ttl.as_secs().to_string();
        match self.call(&[b"EXPIRE", key, seconds.as_bytes()])? {
            RespValue::Integer(value) => Ok(value == 1),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Returns TTL status for a key.
    pub fn ttl(&self, key: &[u8]) -> ClientResult<ClientTtl> {
        match self.call(&[b"TTL", key])? {
            RespValue::Integer(-2) => Ok(ClientTtl::Missing),
            RespValue::Integer(-1) => Ok(ClientTtl::NoExpiry),
            RespValue::Integer(value) if value >= 0 => {
                Ok(ClientTtl::ExpiresIn(Duration::from_secs(value as u64)))
            }
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Pings the server. Returns the raw response payload.
    pub fn ping(&self, payload: Option<&[u8]>) -> ClientResult<Vec<u8>> {
        let response = match payload {
            Some(data) => self.call(&[b"PING", data])?,
            None => self.call(&[b"PING"])?,
        };
        match response {
            RespValue::Simple(text) => Ok(text),
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    /// Fetches server INFO output.
    pub fn info(&self) -> ClientResult<Vec<u8>> {
        match self.call(&[b"INFO"])? {
            RespValue::Bulk(Some(data)) => Ok(data),
            _ => Err(ClientError::UnexpectedResponse),
        }
    }

    // Server error replies are turned into `ClientError::Server` here so the
    // command methods only match on success shapes.
    fn call(&self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let mut conn = self.pool.acquire()?;
        conn.exec(args)?.into_reply()
    }
}
