use crate::error::ConfigError;
use connectors::adapter::ConnectionDescriptor;
use serde::Deserialize;
use std::{collections::BTreeMap, fs, path::Path};
use tracing::info;

/// One entry of the connection file: `{ "str": "<url>" }`.
#[derive(Debug, Clone, Deserialize)]
struct ConnectionEntry {
    #[serde(rename = "str")]
    url: String,
}

/// Logical connection names mapped to connection strings. Loaded once at
/// startup and shared read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ConnectionRegistry {
    entries: BTreeMap<String, String>,
}

impl ConnectionRegistry {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let registry = Self::from_json(&content).map_err(|source| ConfigError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        info!(path = %path.display(), connections = registry.len(), "Loaded connection registry");
        Ok(registry)
    }

    pub fn from_json(content: &str) -> Result<Self, serde_json::Error> {
        let raw: BTreeMap<String, ConnectionEntry> = serde_json::from_str(content)?;
        let entries = raw
            .into_iter()
            .map(|(name, entry)| (name, entry.url))
            .collect();
        Ok(ConnectionRegistry { entries })
    }

    pub fn insert(&mut self, name: impl Into<String>, url: impl Into<String>) {
        self.entries.insert(name.into(), url.into());
    }

    pub fn url(&self, name: &str) -> Result<&str, ConfigError> {
        self.entries
            .get(name)
            .map(String::as_str)
            .ok_or_else(|| ConfigError::UnknownConnection(name.to_string()))
    }

    pub fn descriptor(&self, name: &str) -> Result<ConnectionDescriptor, ConfigError> {
        self.url(name).map(|url| ConnectionDescriptor::new(name, url))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
