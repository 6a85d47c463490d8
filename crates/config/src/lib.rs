//! Layered configuration.
//!
//! Values are merged from, lowest precedence first:
//!
//! 1. built-in defaults ([`Config::default`]),
//! 2. the config file: an explicit path, or `config.{toml,yaml,yml,json}` in
//!    the platform config directory (see [`config_dir`]),
//! 3. `BILICACHE_*` environment variables, with `__` separating nested keys
//!    (`BILICACHE_TRANSCODER__TIMEOUT=30`),
//! 4. command-line [`Overrides`].

pub mod error;
mod load;
mod models;

pub use crate::load::config_dir;
pub use crate::models::{
    Config, Existing, InputMode, NamingConfig, NamingOverrides, Overrides, PatchConfig, TranscoderConfig,
    TranscoderOverrides,
};

/// Prefix of environment variables read by [`Config::load`].
pub const ENV_PREFIX: &str = "BILICACHE_";
