//! Configuration loading and env substitution.
//!
//! Config files: `stubwire.toml`, `stubwire.yaml`, `stubwire.yml` or
//! `stubwire.json`, searched in `./` then the user config directory.
//!
//! Supports `${ENV_VAR}` substitution in all string values.

pub mod env_subst;
pub mod error;
pub mod loader;
pub mod schema;

pub use {
    error::{Error, Result},
    loader::{config_dir, discover_and_load, find_config_file, load_config, parse_config},
    schema::{
        EntityConfig, FilesConfig, JournalConfig, MetricsConfig, ServerConfig, StubsConfig,
        StubwireConfig,
    },
};
