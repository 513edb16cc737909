//! Builds the cache client from `REDIS_URL` / `REDIS_HOST` / `REDIS_PORT`
//! and sends a single PING.

use anyhow::Context;
use pkv_settings::{redis_instance, CacheSettings};
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = CacheSettings::from_env().context("loading cache settings")?;
    let client = redis_instance(&settings);
    info!(endpoint = %client.config().endpoint, "pinging cache");

    let reply = client.ping(None).context("PING failed")?;
    println!("{}", String::from_utf8_lossy(&reply));
    Ok(())
}
