//! Config schema types.

use std::{collections::BTreeMap, path::PathBuf};

use {
    serde::{Deserialize, Serialize},
    stubwire_entity::{Compression, EntityDefaults, Format},
};

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubwireConfig {
    pub server: ServerConfig,
    pub journal: JournalConfig,
    pub stubs: StubsConfig,
    pub files: FilesConfig,
    pub entity: EntityConfig,
    pub metrics: MetricsConfig,
}

/// Listener address for the channel gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".into(),
            port: 8080,
        }
    }
}

impl ServerConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JournalConfig {
    pub enabled: bool,
    /// Oldest events are evicted past this many. Absent means unbounded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_entries: Option<usize>,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_entries: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StubsConfig {
    /// Priority for stubs that declare none. Lower numbers win.
    pub default_priority: i32,
    /// JSON file of message stub mappings loaded at startup.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mappings: Option<PathBuf>,
}

impl Default for StubsConfig {
    fn default() -> Self {
        Self {
            default_priority: 5,
            mappings: None,
        }
    }
}

/// Directory backing `filePath` message bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilesConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub root: Option<PathBuf>,
}

/// Defaults for message bodies that leave format, compression or charset unset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EntityConfig {
    pub default_format: Format,
    pub default_compression: Compression,
    pub default_charset: String,
}

impl Default for EntityConfig {
    fn default() -> Self {
        let defaults = EntityDefaults::default();
        Self {
            default_format: defaults.format,
            default_compression: defaults.compression,
            default_charset: defaults.charset,
        }
    }
}

impl From<&EntityConfig> for EntityDefaults {
    fn from(config: &EntityConfig) -> Self {
        Self {
            format: config.default_format,
            compression: config.default_compression,
            charset: config.default_charset.clone(),
        }
    }
}

/// Prometheus export. Only takes effect in builds with the `prometheus` feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    pub enabled: bool,
    /// Labels added to every exported series.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            labels: BTreeMap::new(),
        }
    }
}
