//! # PKV Settings
//!
//! Purpose: Turn process configuration into a ready-to-use cache client handle.
//!
//! ## Design Principles
//! 1. **Injected Configuration**: the factory takes `&CacheSettings`; only
//!    `CacheSettings::from_env` looks at the process environment.
//! 2. **Two Branches, No Validation**: a connection URL wins; otherwise host/port.
//! 3. **No I/O at Construction**: failures surface on the handle's first command.

mod factory;
mod settings;

pub use factory::{client_config, redis_instance};
pub use settings::{
    CacheSettings, SettingsError, DEFAULT_HOST, DEFAULT_PORT, ENV_REDIS_HOST, ENV_REDIS_PORT,
    ENV_REDIS_URL,
};
