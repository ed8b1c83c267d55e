//! Configuration loading and env substitution.
//!
//! Config files: `crosspost.toml` or `crosspost.json`, searched in `./` then
//! the user config directory (`~/.config/crosspost/` on Linux).
//!
//! Supports `${ENV_VAR}` and `${ENV_VAR:-fallback}` substitution.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, load_config},
    schema::{CrosspostConfig, DiscordSection, RelaySection},
};
