//! # PKV Sync Client
//!
//! Purpose: Provide a lightweight, synchronous Redis-compatible client whose
//! handles are cheap to build and only touch the network on first use.
//!
//! ## Design Principles
//! 1. **Lazy Connections**: `KVClient::new` never dials; the pool connects on demand.
//! 2. **Object Pool Pattern**: Reuse TCP/TLS connections to avoid repeated handshakes.
//! 3. **Session Setup in One Place**: AUTH and SELECT run once per new connection.
//! 4. **Protocol Clarity**: Encode/parse RESP2 explicitly for correctness.

mod client;
mod pool;
mod resp;
mod transport;

pub use client::{ClientConfig, ClientError, ClientResult, ClientTtl, Endpoint, KVClient, Security};
