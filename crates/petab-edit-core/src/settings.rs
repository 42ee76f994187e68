//! Persisted editor settings
//!
//! The core stores settings as JSON values behind a small trait so the
//! shell can back them with whatever it likes (a config file, the
//! platform's settings facility). Only default-value configurations live
//! here today.

use ahash::AHashMap;
use serde_json::Value;

use crate::defaults::DefaultConfig;
use crate::schema::TableKind;

/// Key/value settings backend
pub trait SettingsStore {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&mut self, key: &str, value: Value);
}

/// In-memory settings, for tests and headless use
#[derive(Debug, Default)]
pub struct MemorySettings {
    values: AHashMap<String, Value>,
}

impl MemorySettings {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettings {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: Value) {
        self.values.insert(key.to_string(), value);
    }
}

fn default_config_key(kind: TableKind) -> String {
    format!("defaults/{}", kind)
}

/// Load a table's default-value configuration, falling back to the
/// built-in one when the setting is absent or fails to parse. A parse
/// failure is logged, never fatal; the stored payload is left in place
/// for the user to inspect.
pub fn load_default_config(settings: &dyn SettingsStore, kind: TableKind) -> DefaultConfig {
    match settings.get(&default_config_key(kind)) {
        None => DefaultConfig::builtin(kind),
        Some(payload) => match DefaultConfig::from_json(payload) {
            Ok(config) => config,
            Err(e) => {
                log::warn!("ignoring stored defaults for {} table: {}", kind, e);
                DefaultConfig::builtin(kind)
            }
        },
    }
}

/// Load configurations for every editable table kind
pub fn load_default_configs(settings: &dyn SettingsStore) -> AHashMap<TableKind, DefaultConfig> {
    TableKind::ALL
        .iter()
        .filter(|k| **k != TableKind::Simulation)
        .map(|&kind| (kind, load_default_config(settings, kind)))
        .collect()
}

/// Persist a table's default-value configuration
pub fn save_default_config(
    settings: &mut dyn SettingsStore,
    kind: TableKind,
    config: &DefaultConfig,
) {
    // DefaultConfig is a plain map of serde-serializable values
    let payload = serde_json::to_value(config).unwrap_or(Value::Null);
    settings.set(&default_config_key(kind), payload);
}
