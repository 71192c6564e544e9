//! Endpoint configuration storage

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

use super::kind::EndpointKind;
use super::types::{EndpointConfig, EndpointError};

/// Read-only access to configured endpoints
pub trait EndpointStore: Send + Sync {
    /// Get an endpoint by ID
    fn get(&self, id: &str) -> Option<EndpointConfig>;

    /// All endpoints ordered by weight, ties broken by configuration order
    fn list_all(&self) -> Vec<EndpointConfig>;
}

struct StoredEndpoint {
    position: u64,
    config: EndpointConfig,
}

/// In-memory endpoint storage
pub struct InMemoryEndpointStore {
    endpoints: DashMap<String, StoredEndpoint>,
    next_position: AtomicU64,
}

impl Default for InMemoryEndpointStore {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEndpointStore {
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            next_position: AtomicU64::new(0),
        }
    }

    /// Build a store from raw configuration entries.
    ///
    /// Entries whose plugin is not among `enabled_kinds` are skipped. Invalid
    /// URLs are dropped and entries without an id are skipped, both with a
    /// warning. An entry naming an enabled plugin that does not exist is a
    /// hard error, as are duplicate ids.
    pub fn from_configs(
        configs: Vec<EndpointConfig>,
        enabled_kinds: &[String],
    ) -> Result<Self, EndpointError> {
        let store = Self::new();

        for config in configs {
            if !enabled_kinds.iter().any(|k| k == &config.plugin_id) {
                tracing::warn!(
                    endpoint_id = %config.id,
                    plugin_id = %config.plugin_id,
                    "Endpoint kind not enabled, skipping endpoint"
                );
                continue;
            }

            let mut config = config.sanitize();
            if let Err(e) = config.validate() {
                tracing::warn!(endpoint_id = %config.id, error = %e, "Skipping invalid endpoint");
                continue;
            }

            let kind = config.kind()?;
            if store.contains(&config.id) {
                return Err(EndpointError::DuplicateId(config.id));
            }

            config.plugin_settings = kind.normalize_settings(config.plugin_settings);
            store.insert(config);
        }

        tracing::info!(endpoints = store.len(), "Endpoint catalog loaded");
        Ok(store)
    }

    /// Load a JSON array of endpoint configurations from disk
    pub fn load_file(path: impl AsRef<Path>, enabled_kinds: &[String]) -> Result<Self, EndpointError> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        let configs: Vec<EndpointConfig> = serde_json::from_str(&raw)?;
        Self::from_configs(configs, enabled_kinds)
    }

    /// Insert or replace an endpoint. Replacing keeps the original position.
    pub fn insert(&self, config: EndpointConfig) {
        let position = self
            .endpoints
            .get(&config.id)
            .map(|existing| existing.position)
            .unwrap_or_else(|| self.next_position.fetch_add(1, Ordering::Relaxed));

        self.endpoints
            .insert(config.id.clone(), StoredEndpoint { position, config });
    }

    pub fn remove(&self, id: &str) -> Option<EndpointConfig> {
        self.endpoints.remove(id).map(|(_, stored)| stored.config)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.endpoints.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl EndpointStore for InMemoryEndpointStore {
    fn get(&self, id: &str) -> Option<EndpointConfig> {
        self.endpoints.get(id).map(|stored| stored.config.clone())
    }

    fn list_all(&self) -> Vec<EndpointConfig> {
        let mut entries: Vec<(i32, u64, EndpointConfig)> = self
            .endpoints
            .iter()
            .map(|entry| {
                let stored = entry.value();
                (stored.config.weight, stored.position, stored.config.clone())
            })
            .collect();

        entries.sort_by_key(|(weight, position, _)| (*weight, *position));
        entries.into_iter().map(|(_, _, config)| config).collect()
    }
}

/// Kinds enabled by default
pub fn default_enabled_kinds() -> Vec<String> {
    EndpointKind::ALL.iter().map(|k| k.id().to_string()).collect()
}
