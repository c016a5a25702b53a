use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::{Error, Result, env_subst::substitute_env, schema::StubwireConfig};

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &[
    "stubwire.toml",
    "stubwire.yaml",
    "stubwire.yml",
    "stubwire.json",
];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> Result<StubwireConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| Error::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");
    parse_config(&substitute_env(&raw), extension)
}

/// Parse config text in the format named by `extension`.
pub fn parse_config(raw: &str, extension: &str) -> Result<StubwireConfig> {
    match extension {
        "toml" => toml::from_str(raw).map_err(|e| Error::parse("toml", e)),
        "yaml" | "yml" => serde_yaml::from_str(raw).map_err(|e| Error::parse("yaml", e)),
        "json" => serde_json::from_str(raw).map_err(|e| Error::parse("json", e)),
        other => Err(Error::UnsupportedFormat {
            extension: other.to_string(),
        }),
    }
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./stubwire.{toml,yaml,yml,json}` (project-local)
/// 2. `<user config dir>/stubwire/stubwire.{toml,yaml,yml,json}`
///
/// Returns `StubwireConfig::default()` if no file is found or it fails to load.
pub fn discover_and_load() -> StubwireConfig {
    let Some(path) = find_config_file() else {
        debug!("no config file found, using defaults");
        return StubwireConfig::default();
    };
    debug!(path = %path.display(), "loading config");
    load_config(&path).unwrap_or_else(|e| {
        warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
        StubwireConfig::default()
    })
}

/// The first config file found in the standard locations.
pub fn find_config_file() -> Option<PathBuf> {
    let local = CONFIG_FILENAMES.iter().map(PathBuf::from);
    let global = config_dir()
        .into_iter()
        .flat_map(|dir| CONFIG_FILENAMES.iter().map(move |name| dir.join(name)));
    local.chain(global).find(|p| p.exists())
}

/// The user-global config directory.
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "stubwire").map(|d| d.config_dir().to_path_buf())
}
