//! # Connection Pool
//!
//! Purpose: Reuse established (and already authenticated) connections for
//! the sync client so the TCP, TLS and AUTH round trips are paid once.
//!
//! ## Design Principles
//! 1. **Object Pool Pattern**: Keep a bounded set of reusable connections.
//! 2. **Minimal Locking**: Hold the mutex only while moving idle connections.
//! 3. **Lazy Dialing**: The pool starts empty; `new` never opens sockets.
//! 4. **Fail Fast**: Exceeding the pool limit returns an error immediately.

use std::collections::VecDeque;
use std::fmt;
use std::io::{BufReader, Write};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::client::{ClientConfig, ClientError, ClientResult, Endpoint};
use crate::resp::{encode_command, read_response, RespValue};
use crate::transport::{dial, secure, Stream};

struct PoolState {
    idle: VecDeque<Connection>,
    total: usize,
}

struct PoolInner {
    config: ClientConfig,
    state: Mutex<PoolState>,
}

impl PoolInner {
    fn state(&self) -> MutexGuard<'_, PoolState> {
        // Every update under this lock is a single step, so a poisoned guard is still consistent.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn release_slot(&self) {
        let mut state = self.state();
        state.total = state.total.saturating_sub(1);
    }

    fn return_connection(&self, conn: Connection) {
        let mut state = self.state();
        if state.idle.len() < self.config.max_idle {
            state.idle.push_back(conn);
        } else {
            state.total = state.total.saturating_sub(1);
        }
    }
}

/// Connection pool handle.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

impl fmt::Debug for ConnectionPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state();
        f.debug_struct("ConnectionPool")
            .field("config", &self.inner.config)
            .field("idle", &state.idle.len())
            .field("total", &state.total)
            .finish()
    }
}

impl ConnectionPool {
    /// Creates an empty pool. No connections are opened.
    pub fn new(config: ClientConfig) -> Self {
        let state = PoolState {
            idle: VecDeque::with_capacity(config.max_idle),
            total: 0,
        };
        ConnectionPool {
            inner: Arc::new(PoolInner {
                config,
                state: Mutex::new(state),
            }),
        }
    }

    /// Configuration the pool dials with.
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Acquires a connection from the pool, dialing a new one if none is idle.
    pub fn acquire(&self) -> ClientResult<PooledConnection> {
        if let Some(conn) = self.pop_idle() {
            return Ok(PooledConnection::new(self.inner.clone(), conn));
        }

        if !self.try_reserve() {
            return Err(ClientError::PoolExhausted);
        }

        match Connection::open(&self.inner.config) {
            Ok(conn) => Ok(PooledConnection::new(self.inner.clone(), conn)),
            Err(err) => {
                self.inner.release_slot();
                Err(err)
            }
        }
    }

    fn pop_idle(&self) -> Option<Connection> {
        self.inner.state().idle.pop_front()
    }

    fn try_reserve(&self) -> bool {
        let mut state = self.inner.state();
        if state.total >= self.inner.config.max_total {
            return false;
        }
        state.total += 1;
        true
    }
}

/// RAII wrapper returning a connection to the pool on drop.
pub struct PooledConnection {
    pool: Arc<PoolInner>,
    conn: Option<Connection>,
    valid: bool,
}

impl PooledConnection {
    fn new(pool: Arc<PoolInner>, conn: Connection) -> Self {
        PooledConnection {
            pool,
            conn: Some(conn),
            valid: true,
        }
    }

    /// Executes a RESP command and returns the parsed reply.
    pub fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        let conn = self
            .conn
            .as_mut()
            .ok_or(ClientError::Protocol("connection already released"))?;
        let response = conn.exec(args);
        if response.is_err() {
            // If IO/protocol fails, do not return this connection to the pool.
            self.valid = false;
        }
        response
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        let Some(conn) = self.conn.take() else {
            return;
        };

        if self.valid {
            self.pool.return_connection(conn);
        } else {
            warn!(endpoint = %self.pool.config.endpoint, "discarding broken connection");
            self.pool.release_slot();
        }
    }
}

/// Single session (plain or TLS) with reusable buffers.
struct Connection {
    // Buffered reader reduces syscalls while still allowing direct writes.
    reader: BufReader<Stream>,
    line_buf: Vec<u8>,
    write_buf: Vec<u8>,
}

impl Connection {
    /// Dials, applies socket options, wraps TLS and runs AUTH/SELECT.
    fn open(config: &ClientConfig) -> ClientResult<Self> {
        let (host, port) = match &config.endpoint {
            Endpoint::Tcp { host, port } => (host.as_str(), *port),
            Endpoint::Unparsable { input, reason } => {
                return Err(ClientError::InvalidEndpoint(format!("{}: {}", input, reason)));
            }
        };

        let stream = dial(host, port, config.connect_timeout)?;
        stream.set_read_timeout(config.read_timeout)?;
        stream.set_write_timeout(config.write_timeout)?;
        // Disable Nagle to keep request latency low for small payloads.
        stream.set_nodelay(true)?;

        let mut conn = Connection {
            reader: BufReader::new(secure(stream, host, config.security)?),
            line_buf: Vec::with_capacity(128),
            write_buf: Vec::with_capacity(256),
        };
        debug!(
            endpoint = %config.endpoint,
            tls = config.security.is_tls(),
            db = config.db,
            "opened connection"
        );

        if let Err(err) = conn.handshake(config) {
            warn!(endpoint = %config.endpoint, error = %err, "connection setup failed");
            return Err(err);
        }
        Ok(conn)
    }

    fn handshake(&mut self, config: &ClientConfig) -> ClientResult<()> {
        if let Some(password) = &config.password {
            self.exec(&[b"AUTH", password.as_bytes()])?.into_ok()?;
        }
        if config.db != 0 {
            let db = config.db.to_string();
            self.exec(&[b"SELECT", db.as_bytes()])?.into_ok()?;
        }
        Ok(())
    }

    fn exec(&mut self, args: &[&[u8]]) -> ClientResult<RespValue> {
        self.write_buf.clear();
        encode_command(args, &mut self.write_buf);

        let stream = self.reader.get_mut();
        stream.write_all(&self.write_buf)?;
        stream.flush()?;

        read_response(&mut self.reader, &mut self.line_buf)
    }
}
